use crate::embeddings::Embedder;
use crate::models::{ContentRecord, SearchResult};
use crate::traits::{IndexHit, VectorIndex};
use crate::SearchError;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

impl IndexHit {
    pub fn into_result(self) -> SearchResult {
        let score = 1.0 - self.distance;
        SearchResult {
            id: self.id,
            content: self.document,
            document_type: self.metadata.file_type,
            metadata: self.metadata,
            score,
        }
    }
}

/// Sits between the pipeline and the vector index: embeds in batches on the way in,
/// turns distances into thresholded scores on the way out.
#[derive(Clone)]
pub struct DocumentStore {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl DocumentStore {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self { index, embedder }
    }

    /// Embeds every record in a single batch and inserts them in a single call.
    /// Returns the number of records written.
    pub async fn add(&self, records: &[ContentRecord]) -> Result<usize, SearchError> {
        if records.is_empty() {
            warn!("no records to add");
            return Ok(0);
        }

        let storable: Vec<ContentRecord> = records
            .iter()
            .filter(|record| record.is_storable())
            .cloned()
            .collect();

        if storable.len() != records.len() {
            debug!(
                dropped = records.len() - storable.len(),
                "dropped records without id or content"
            );
        }
        if storable.is_empty() {
            warn!("no storable records to add");
            return Ok(0);
        }

        let contents: Vec<String> = storable.iter().map(|record| record.content.clone()).collect();
        info!(count = contents.len(), "generating embeddings");
        let embeddings = self.embedder.embed_batch(&contents)?;

        if embeddings.len() != storable.len() {
            return Err(SearchError::Embedding(format!(
                "embedder returned {} vectors for {} texts",
                embeddings.len(),
                storable.len()
            )));
        }

        self.index.upsert(&storable, &embeddings).await?;
        info!(count = storable.len(), "added records to vector index");
        Ok(storable.len())
    }

    /// Nearest-neighbour search. Results keep the index order and only those with
    /// `score >= threshold` survive.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        threshold: f64,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed_batch(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::Embedding("embedder returned no vector".to_string()))?;

        let hits = self.index.query(&query_vector, top_k).await?;

        let mut seen = HashSet::new();
        let results: Vec<SearchResult> = hits
            .into_iter()
            .filter(|hit| seen.insert(hit.id.clone()))
            .map(IndexHit::into_result)
            .filter(|result| result.score >= threshold)
            .take(top_k)
            .collect();

        info!(count = results.len(), query = %query, "search finished");
        Ok(results)
    }

    pub async fn stats(&self) -> Result<usize, SearchError> {
        self.index.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::models::RecordMetadata;
    use crate::stores::LocalIndex;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(id: &str, content: &str) -> ContentRecord {
        ContentRecord {
            id: id.to_string(),
            content: content.to_string(),
            metadata: RecordMetadata::text("notes.txt", 0, 1),
        }
    }

    fn store() -> DocumentStore {
        DocumentStore::new(
            Arc::new(LocalIndex::in_memory()),
            Arc::new(CharacterNgramEmbedder::default()),
        )
    }

    struct DuplicatingIndex;

    #[async_trait]
    impl VectorIndex for DuplicatingIndex {
        async fn upsert(&self, _: &[ContentRecord], _: &[Vec<f32>]) -> Result<(), SearchError> {
            Ok(())
        }

        async fn query(&self, _: &[f32], _: usize) -> Result<Vec<IndexHit>, SearchError> {
            let hit = IndexHit {
                id: "same".to_string(),
                document: "repeated".to_string(),
                metadata: RecordMetadata::image("scan.png"),
                distance: 0.1,
            };
            Ok(vec![hit.clone(), hit])
        }

        async fn count(&self) -> Result<usize, SearchError> {
            Ok(1)
        }
    }

    #[derive(Default)]
    struct CountingEmbedder {
        inner: CharacterNgramEmbedder,
        batches: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        fn embed(&self, text: &str) -> Vec<f32> {
            self.inner.embed(text)
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|text| self.inner.embed(text)).collect())
        }
    }

    #[tokio::test]
    async fn each_add_embeds_in_one_batch() -> Result<(), SearchError> {
        let embedder = Arc::new(CountingEmbedder::default());
        let store = DocumentStore::new(Arc::new(LocalIndex::in_memory()), embedder.clone());

        store.add(&[]).await?;
        assert_eq!(embedder.batches.load(Ordering::SeqCst), 0);

        let written = store
            .add(&[
                record("a", "first chunk"),
                record("b", "second chunk"),
                record("c", "third chunk"),
            ])
            .await?;
        assert_eq!(written, 3);
        assert_eq!(embedder.batches.load(Ordering::SeqCst), 1);
        assert_eq!(store.stats().await?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() -> Result<(), SearchError> {
        let store = store();
        assert_eq!(store.add(&[]).await?, 0);
        assert_eq!(store.stats().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn records_without_content_never_reach_the_index() -> Result<(), SearchError> {
        let store = store();
        let written = store
            .add(&[record("a", "machine learning"), record("b", "   ")])
            .await?;
        assert_eq!(written, 1);
        assert_eq!(store.stats().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn search_applies_threshold_and_limit() -> Result<(), SearchError> {
        let store = store();
        store
            .add(&[
                record("ml", "machine learning models learn patterns from data"),
                record("ml2", "machine learning models need training data"),
                record("bake", "sourdough bread needs a long fermentation"),
            ])
            .await?;

        let all = store.search("machine learning models", 3, 0.0).await?;
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|pair| pair[0].score >= pair[1].score));
        assert_eq!(all[0].document_type, crate::FileType::Text);

        let limited = store.search("machine learning models", 1, 0.0).await?;
        assert_eq!(limited.len(), 1);

        let threshold = all[1].score;
        let strict = store.search("machine learning models", 3, threshold).await?;
        assert!(strict.iter().all(|result| result.score >= threshold));
        assert!(strict.iter().all(|result| result.id != "bake"));
        Ok(())
    }

    #[tokio::test]
    async fn search_on_empty_index_returns_nothing() -> Result<(), SearchError> {
        assert!(store().search("anything", 5, 0.0).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_hits_are_collapsed() -> Result<(), SearchError> {
        let store = DocumentStore::new(
            Arc::new(DuplicatingIndex),
            Arc::new(CharacterNgramEmbedder::default()),
        );
        let results = store.search("repeated", 5, 0.5).await?;
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 0.9).abs() < 1e-9);
        assert_eq!(results[0].document_type, crate::FileType::Image);
        Ok(())
    }
}
