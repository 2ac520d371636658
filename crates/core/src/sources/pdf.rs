use super::SourceNormalizer;
use crate::chunking::Chunker;
use crate::error::IngestError;
use crate::extractor::{EmbeddedImage, PdfExtractor};
use crate::models::{record_id, ContentRecord, Extraction, RecordMetadata, SkippedUnit};
use crate::ocr::{prepare_for_ocr, OcrEngine};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// PDF text layers chunked on paragraph boundaries, plus OCR over embedded images.
pub struct PdfSource {
    chunker: Chunker,
    extractor: Arc<dyn PdfExtractor>,
    ocr: Arc<dyn OcrEngine>,
}

impl PdfSource {
    pub fn new(
        chunker: Chunker,
        extractor: Arc<dyn PdfExtractor>,
        ocr: Arc<dyn OcrEngine>,
    ) -> Self {
        Self {
            chunker,
            extractor,
            ocr,
        }
    }

    /// `Ok(None)` when the image is skipped on purpose or OCR found nothing.
    fn image_text(&self, image: EmbeddedImage) -> Result<Option<String>, IngestError> {
        if !image.is_gray_or_rgb() {
            debug!(
                colorants = image.colorants,
                has_alpha = image.has_alpha,
                "skipping image outside gray/rgb"
            );
            return Ok(None);
        }

        let png = prepare_for_ocr(image.to_image()?)?;
        let text = self.ocr.extract_text(&png)?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

impl SourceNormalizer for PdfSource {
    fn normalize(&self, path: &Path, filename: &str) -> Result<Extraction, IngestError> {
        let pages = self.extractor.pages(path)?;
        let mut extraction = Extraction::default();

        for page in pages {
            let number = page.number;

            match page.text {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        for (index, chunk) in self.chunker.chunk(text).into_iter().enumerate() {
                            extraction.records.push(ContentRecord {
                                id: record_id(&format!("{filename}_page{number}_text{index}")),
                                content: chunk,
                                metadata: RecordMetadata::pdf_text(filename, number, index),
                            });
                        }
                    }
                }
                Err(error) => {
                    warn!(file = filename, page = number, error = %error, "skipping page text");
                    extraction.skipped.push(SkippedUnit {
                        unit: format!("page {number} text"),
                        reason: error.to_string(),
                    });
                }
            }

            for (image_index, image) in page.images.into_iter().enumerate() {
                match image.and_then(|image| self.image_text(image)) {
                    Ok(Some(text)) => extraction.records.push(ContentRecord {
                        id: record_id(&format!("{filename}_page{number}_img{image_index}")),
                        content: format!("Image content: {text}"),
                        metadata: RecordMetadata::pdf_image(filename, number, image_index),
                    }),
                    Ok(None) => {}
                    Err(error) => {
                        warn!(
                            file = filename,
                            page = number,
                            image = image_index,
                            error = %error,
                            "skipping embedded image"
                        );
                        extraction.skipped.push(SkippedUnit {
                            unit: format!("page {number} image {image_index}"),
                            reason: error.to_string(),
                        });
                    }
                }
            }
        }

        Ok(extraction)
    }
}
