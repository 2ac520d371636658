//! File-backed [`VectorIndex`] with brute-force cosine search.
//!
//! The whole collection lives in memory and is rewritten to
//! `<path>/<collection>.json` after every upsert.

use crate::embeddings::cosine_similarity;
use crate::traits::{IndexHit, VectorIndex};
use crate::{ContentRecord, RecordMetadata, SearchError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    id: String,
    vector: Vec<f32>,
    document: String,
    metadata: RecordMetadata,
}

/// Assumes a single writer. The snapshot is taken under the lock but written after
/// it is released, so concurrent upserts may persist an older snapshot last.
pub struct LocalIndex {
    file: Option<PathBuf>,
    entries: RwLock<Vec<StoredEntry>>,
}

impl LocalIndex {
    /// Opens (or starts) the collection stored under `directory`.
    pub fn open(directory: &Path, collection: &str) -> Result<Self, SearchError> {
        std::fs::create_dir_all(directory)?;
        let file = directory.join(format!("{collection}.json"));

        let entries = if file.exists() {
            let raw = std::fs::read(&file)?;
            serde_json::from_slice::<Vec<StoredEntry>>(&raw)?
        } else {
            Vec::new()
        };

        debug!(path = %file.display(), entries = entries.len(), "opened local index");

        Ok(Self {
            file: Some(file),
            entries: RwLock::new(entries),
        })
    }

    /// An index that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            file: None,
            entries: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<StoredEntry>>, SearchError> {
        self.entries
            .read()
            .map_err(|_| SearchError::Request("local index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<StoredEntry>>, SearchError> {
        self.entries
            .write()
            .map_err(|_| SearchError::Request("local index lock poisoned".to_string()))
    }

    async fn persist(&self, snapshot: Vec<u8>) -> Result<(), SearchError> {
        let Some(file) = &self.file else {
            return Ok(());
        };

        let staging = file.with_extension("json.tmp");
        tokio::fs::write(&staging, snapshot).await?;
        tokio::fs::rename(&staging, file).await?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for LocalIndex {
    async fn upsert(
        &self,
        records: &[ContentRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<(), SearchError> {
        if records.len() != embeddings.len() {
            return Err(SearchError::Request(format!(
                "embedding count {} doesn't match record count {}",
                embeddings.len(),
                records.len()
            )));
        }

        let snapshot = {
            let mut entries = self.write()?;
            for (record, embedding) in records.iter().zip(embeddings) {
                let entry = StoredEntry {
                    id: record.id.clone(),
                    vector: embedding.clone(),
                    document: record.content.clone(),
                    metadata: record.metadata.clone(),
                };
                match entries.iter_mut().find(|existing| existing.id == record.id) {
                    Some(existing) => *existing = entry,
                    None => entries.push(entry),
                }
            }
            serde_json::to_vec(&*entries)?
        };

        self.persist(snapshot).await
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>, SearchError> {
        let entries = self.read()?;
        let mut hits: Vec<IndexHit> = entries
            .iter()
            .map(|entry| IndexHit {
                id: entry.id.clone(),
                document: entry.document.clone(),
                metadata: entry.metadata.clone(),
                distance: 1.0 - f64::from(cosine_similarity(vector, &entry.vector)),
            })
            .collect();

        hits.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize, SearchError> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str, content: &str) -> ContentRecord {
        ContentRecord {
            id: id.to_string(),
            content: content.to_string(),
            metadata: RecordMetadata::text("notes.txt", 0, 1),
        }
    }

    #[tokio::test]
    async fn query_orders_by_distance() -> Result<(), SearchError> {
        let index = LocalIndex::in_memory();
        index
            .upsert(
                &[record("a", "first"), record("b", "second")],
                &[vec![1.0, 0.0], vec![0.6, 0.8]],
            )
            .await?;

        let hits = index.query(&[0.0, 1.0], 5).await?;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "b");
        assert!((hits[0].distance - 0.2).abs() < 1e-6);
        assert!((hits[1].distance - 1.0).abs() < 1e-6);

        assert_eq!(index.query(&[0.0, 1.0], 1).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn upsert_replaces_existing_id() -> Result<(), SearchError> {
        let index = LocalIndex::in_memory();
        index.upsert(&[record("a", "old")], &[vec![1.0]]).await?;
        index.upsert(&[record("a", "new")], &[vec![1.0]]).await?;

        assert_eq!(index.count().await?, 1);
        let hits = index.query(&[1.0], 1).await?;
        assert_eq!(hits[0].document, "new");
        Ok(())
    }

    #[tokio::test]
    async fn mismatched_batches_are_rejected() {
        let index = LocalIndex::in_memory();
        let result = index.upsert(&[record("a", "text")], &[]).await;
        assert!(matches!(result, Err(SearchError::Request(_))));
    }

    #[tokio::test]
    async fn collection_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        {
            let index = LocalIndex::open(dir.path(), "docs")?;
            index
                .upsert(&[record("a", "persisted text")], &[vec![0.5, 0.5]])
                .await?;
        }

        let reopened = LocalIndex::open(dir.path(), "docs")?;
        assert_eq!(reopened.count().await?, 1);
        let hits = reopened.query(&[0.5, 0.5], 1).await?;
        assert_eq!(hits[0].document, "persisted text");
        assert_eq!(hits[0].metadata.filename, "notes.txt");
        assert!(dir.path().join("docs.json").exists());
        Ok(())
    }
}
