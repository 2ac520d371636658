use crate::chunking::ChunkingConfig;
use crate::config::{RagConfig, VectorBackend};
use crate::embeddings::{CharacterNgramEmbedder, Embedder};
use crate::extractor::LopdfExtractor;
use crate::ingest::discover_files;
use crate::models::{DocumentKind, FileOutcome, ProcessingStats, SearchResult, SystemStats};
use crate::ocr::engine_from_config;
use crate::retrieval::{classify, rerank};
use crate::sources::SourceRouter;
use crate::store::DocumentStore;
use crate::stores::{LocalIndex, QdrantStore};
use crate::traits::VectorIndex;
use crate::{IngestError, SearchError};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Entry point for ingestion and search. Files are processed one at a time and a
/// failing file never stops the rest of a folder run.
pub struct RagSystem {
    config: RagConfig,
    router: SourceRouter,
    store: DocumentStore,
}

impl RagSystem {
    pub fn new(config: RagConfig, router: SourceRouter, store: DocumentStore) -> Self {
        Self {
            config,
            router,
            store,
        }
    }

    /// Wires the default collaborators: lopdf, the configured OCR engine, the
    /// trigram embedder and the configured vector backend.
    pub async fn from_config(config: RagConfig) -> Result<Self, IngestError> {
        let embedder = CharacterNgramEmbedder {
            dimensions: config.embedding.dimensions,
        };
        let vector_db = &config.vector_db;

        let index: Arc<dyn VectorIndex> = match vector_db.backend {
            VectorBackend::Local => {
                Arc::new(LocalIndex::open(&vector_db.path, &vector_db.collection_name)?)
            }
            VectorBackend::Qdrant => {
                let store = QdrantStore::new(
                    vector_db.qdrant_url.as_str(),
                    vector_db.collection_name.as_str(),
                    embedder.dimensions(),
                );
                store.ensure_collection().await?;
                Arc::new(store)
            }
        };

        let router = SourceRouter::new(
            ChunkingConfig::try_from(&config.processing)?,
            Arc::new(LopdfExtractor),
            engine_from_config(&config.ocr)?,
        );
        let store = DocumentStore::new(index, Arc::new(embedder));

        info!(
            backend = ?vector_db.backend,
            collection = %vector_db.collection_name,
            model = %config.embedding.model,
            "rag system ready"
        );

        Ok(Self::new(config, router, store))
    }

    /// Never fails: every problem becomes a [`FileOutcome::Failed`].
    pub async fn process_file(&self, path: &Path) -> FileOutcome {
        match self.ingest_file(path).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(file = %path.display(), error = %error, "file failed");
                FileOutcome::failed(path, error.to_string())
            }
        }
    }

    async fn ingest_file(&self, path: &Path) -> Result<FileOutcome, IngestError> {
        let kind = DocumentKind::from_path(path)?;

        let limit = self.config.processing.max_file_size_bytes();
        let size = tokio::fs::metadata(path).await?.len();
        if size > limit {
            return Err(IngestError::FileTooLarge {
                size_mb: size as f64 / (1024.0 * 1024.0),
                limit_mb: self.config.processing.max_file_size_mb,
            });
        }

        let extraction = self.router.normalize(kind, path)?;
        if extraction.records.is_empty() {
            warn!(file = %path.display(), "no content extracted");
            return Ok(FileOutcome::failed(path, "No content extracted"));
        }

        let chunks_created = self.store.add(&extraction.records).await?;
        info!(
            file = %path.display(),
            kind = %kind,
            chunks = chunks_created,
            skipped = extraction.skipped.len(),
            "file ingested"
        );

        Ok(FileOutcome::Ingested {
            file_path: path.to_path_buf(),
            chunks_created,
            file_type: kind,
            skipped_units: extraction.skipped.len(),
        })
    }

    /// Walks `folder` once per configured extension and ingests every match.
    pub async fn process_folder(&self, folder: &Path) -> Result<ProcessingStats, IngestError> {
        if !folder.is_dir() {
            return Err(IngestError::InvalidArgument(format!(
                "{} is not a directory",
                folder.display()
            )));
        }

        let mut stats = ProcessingStats::default();
        let mut seen = HashSet::new();

        for extension in &self.config.processing.supported_extensions {
            for path in discover_files(folder, extension) {
                if !seen.insert(path.clone()) {
                    continue;
                }
                let outcome = self.process_file(&path).await;
                stats.record(&outcome);
            }
        }

        info!(
            folder = %folder.display(),
            files = stats.total_files,
            chunks = stats.total_chunks,
            failed = stats.failed_files.len(),
            "folder processed"
        );
        Ok(stats)
    }

    /// Classify, retrieve, re-rank. Omitted arguments fall back to the retrieval config.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
        threshold: Option<f64>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::Request("query is empty".to_string()));
        }

        let retrieval = &self.config.retrieval;
        let top_k = top_k.unwrap_or(retrieval.default_top_k);
        let threshold = threshold.unwrap_or(retrieval.similarity_threshold);

        let query_type = classify(query);
        let results = self.store.search(query, top_k, threshold).await?;
        info!(query_type = %query_type, hits = results.len(), "reranking results");

        Ok(rerank(query_type, results))
    }

    pub async fn get_stats(&self) -> Result<SystemStats, SearchError> {
        Ok(SystemStats {
            total_documents: self.store.stats().await?,
            document_types: DocumentKind::ALL.to_vec(),
            collection_name: self.config.vector_db.collection_name.clone(),
            embedding_model: self.config.embedding.model.clone(),
        })
    }
}
