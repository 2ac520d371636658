use crate::{ContentRecord, RecordMetadata, SearchError};
use async_trait::async_trait;

/// A raw nearest-neighbour hit. `distance` is a cosine distance: 0 is identical.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: String,
    pub document: String,
    pub metadata: RecordMetadata,
    pub distance: f64,
}

/// Persistent vector index. Owns the mapping from record id to vector, text and metadata.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Inserts all records in one call. `embeddings[i]` belongs to `records[i]`.
    async fn upsert(
        &self,
        records: &[ContentRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<(), SearchError>;

    /// Returns at most `k` hits, best match first.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>, SearchError>;

    async fn count(&self) -> Result<usize, SearchError>;
}
