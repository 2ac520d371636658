use super::SourceNormalizer;
use crate::chunking::Chunker;
use crate::error::IngestError;
use crate::models::{record_id, ContentRecord, Extraction, RecordMetadata};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Plain UTF-8 text, chunked on sentence boundaries.
pub struct TextSource {
    chunker: Chunker,
}

impl TextSource {
    pub fn new(chunker: Chunker) -> Self {
        Self { chunker }
    }
}

impl SourceNormalizer for TextSource {
    fn normalize(&self, path: &Path, filename: &str) -> Result<Extraction, IngestError> {
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            debug!(file = %path.display(), "text file has no content");
            return Ok(Extraction::default());
        }

        let chunks = self.chunker.chunk(&content);
        let total = chunks.len();
        let records = chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| ContentRecord {
                id: record_id(&format!("{filename}_{index}")),
                content: chunk,
                metadata: RecordMetadata::text(filename, index, total),
            })
            .collect();

        Ok(Extraction::from_records(records))
    }
}
