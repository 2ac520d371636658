use super::SourceNormalizer;
use crate::error::IngestError;
use crate::models::{record_id, ContentRecord, Extraction, RecordMetadata};
use crate::ocr::{load_image, prepare_for_ocr, OcrEngine};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Standalone raster images. One record per image holding the raw OCR text.
pub struct ImageSource {
    ocr: Arc<dyn OcrEngine>,
}

impl ImageSource {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }
}

impl SourceNormalizer for ImageSource {
    fn normalize(&self, path: &Path, filename: &str) -> Result<Extraction, IngestError> {
        let png = prepare_for_ocr(load_image(path)?)?;
        let text = self.ocr.extract_text(&png)?;
        let text = text.trim();

        if text.is_empty() {
            debug!(file = %path.display(), "ocr found no text");
            return Ok(Extraction::default());
        }

        Ok(Extraction::from_records(vec![ContentRecord {
            id: record_id(filename),
            content: text.to_string(),
            metadata: RecordMetadata::image(filename),
        }]))
    }
}
