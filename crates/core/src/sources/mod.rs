//! Source normalizers turn one input file into an ordered list of content records.
//!
//! Each normalizer reports units it could not extract (a page's text layer, an
//! embedded image) in [`Extraction::skipped`] instead of failing the whole file.

pub mod image;
pub mod pdf;
pub mod text;

pub use self::image::ImageSource;
pub use self::pdf::PdfSource;
pub use self::text::TextSource;

use crate::chunking::{BoundaryRule, Chunker, ChunkingConfig};
use crate::error::IngestError;
use crate::extractor::PdfExtractor;
use crate::models::{DocumentKind, Extraction};
use crate::ocr::OcrEngine;
use std::path::Path;
use std::sync::Arc;

pub trait SourceNormalizer: Send + Sync {
    fn normalize(&self, path: &Path, filename: &str) -> Result<Extraction, IngestError>;
}

/// Holds one normalizer per [`DocumentKind`] and picks the right one for a file.
pub struct SourceRouter {
    text: TextSource,
    pdf: PdfSource,
    image: ImageSource,
}

impl SourceRouter {
    pub fn new(
        chunking: ChunkingConfig,
        extractor: Arc<dyn PdfExtractor>,
        ocr: Arc<dyn OcrEngine>,
    ) -> Self {
        Self {
            text: TextSource::new(Chunker::new(chunking, BoundaryRule::Sentence)),
            pdf: PdfSource::new(
                Chunker::new(chunking, BoundaryRule::Paragraph),
                extractor,
                Arc::clone(&ocr),
            ),
            image: ImageSource::new(ocr),
        }
    }

    pub fn normalizer(&self, kind: DocumentKind) -> &dyn SourceNormalizer {
        match kind {
            DocumentKind::Text => &self.text,
            DocumentKind::Pdf => &self.pdf,
            DocumentKind::Image => &self.image,
        }
    }

    pub fn normalize(&self, kind: DocumentKind, path: &Path) -> Result<Extraction, IngestError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?;

        self.normalizer(kind).normalize(path, filename)
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use crate::error::IngestError;
    use crate::extractor::{PdfExtractor, PdfPage};
    use crate::ocr::OcrEngine;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers every OCR call with the same text and counts the calls.
    pub struct FixedOcr {
        text: String,
        calls: AtomicUsize,
    }

    impl FixedOcr {
        pub fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl OcrEngine for FixedOcr {
        fn extract_text(&self, _png: &[u8]) -> Result<String, IngestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    pub struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn extract_text(&self, _png: &[u8]) -> Result<String, IngestError> {
            Err(IngestError::OcrFailed("engine unavailable".to_string()))
        }
    }

    /// Hands out a prepared page list once.
    pub struct ScriptedPdf {
        pages: Mutex<Option<Vec<PdfPage>>>,
    }

    impl ScriptedPdf {
        pub fn new(pages: Vec<PdfPage>) -> Self {
            Self {
                pages: Mutex::new(Some(pages)),
            }
        }
    }

    impl PdfExtractor for ScriptedPdf {
        fn pages(&self, _path: &Path) -> Result<Vec<PdfPage>, IngestError> {
            let mut pages = self
                .pages
                .lock()
                .map_err(|_| IngestError::PdfParse("poisoned".to_string()))?;
            Ok(pages.take().unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::{FixedOcr, ScriptedPdf};
    use super::*;
    use crate::models::FileType;
    use tempfile::tempdir;

    fn router() -> Result<SourceRouter, IngestError> {
        Ok(SourceRouter::new(
            ChunkingConfig::new(1000, 200)?,
            Arc::new(ScriptedPdf::new(Vec::new())),
            Arc::new(FixedOcr::new("")),
        ))
    }

    #[test]
    fn routes_text_files_to_the_text_normalizer() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "A. B. C.")?;

        let extraction = router()?.normalize(DocumentKind::Text, &path)?;
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].content, "A. B. C.");
        assert_eq!(extraction.records[0].metadata.file_type, FileType::Text);
        assert_eq!(extraction.records[0].metadata.filename, "notes.txt");
        Ok(())
    }

    #[test]
    fn missing_file_is_an_io_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let result = router()?.normalize(DocumentKind::Text, &dir.path().join("gone.txt"));
        assert!(matches!(result, Err(IngestError::Io(_))));
        Ok(())
    }
}
