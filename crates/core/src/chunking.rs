use crate::config::ProcessingConfig;
use crate::error::IngestError;

/// Where a chunk is allowed to end when it has to be cut before the window end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryRule {
    /// Any of `.`, `!`, `?` or a newline, inclusive.
    Sentence,
    /// A blank line (`\n\n`), or a sentence end followed by whitespace.
    Paragraph,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {overlap} must be smaller than chunk_size {chunk_size}"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }
}

impl TryFrom<&ProcessingConfig> for ChunkingConfig {
    type Error = IngestError;

    fn try_from(value: &ProcessingConfig) -> Result<Self, Self::Error> {
        Self::new(value.chunk_size, value.chunk_overlap)
    }
}

/// Splits text into overlapping, boundary-aware chunks. Positions are counted in
/// characters, not bytes.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    config: ChunkingConfig,
    rule: BoundaryRule,
}

impl Chunker {
    pub fn new(config: ChunkingConfig, rule: BoundaryRule) -> Self {
        Self { config, rule }
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let size = self.config.chunk_size;

        if chars.len() <= size {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < chars.len() {
            let mut end = (start + size).min(chars.len());

            if end < chars.len() {
                if let Some(cut) = self.find_boundary(&chars, start, end) {
                    end = cut;
                }
            }

            let piece: String = chars[start..end].iter().collect();
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }

            if end == chars.len() {
                break;
            }

            let next = end.saturating_sub(self.config.overlap);
            // a cut close to the window start plus a large overlap would not advance
            start = if next > start { next } else { end };
        }

        chunks
    }

    /// Scans from `end` back towards the middle of the window and returns the
    /// exclusive end of the nearest boundary.
    fn find_boundary(&self, chars: &[char], start: usize, end: usize) -> Option<usize> {
        let floor = start + self.config.chunk_size / 2;

        for position in (floor + 1..=end).rev() {
            let current = chars[position];
            match self.rule {
                BoundaryRule::Sentence => {
                    if matches!(current, '.' | '!' | '?' | '\n') {
                        return Some(position + 1);
                    }
                }
                BoundaryRule::Paragraph => {
                    let next = chars.get(position + 1).copied();
                    if current == '\n' && next == Some('\n') {
                        return Some(position + 2);
                    }
                    if matches!(current, '.' | '!' | '?') && matches!(next, Some(' ' | '\n')) {
                        return Some(position + 1);
                    }
                }
            }
        }

        None
    }
}
