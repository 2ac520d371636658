pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod ocr;
pub mod orchestrator;
pub mod retrieval;
pub mod sources;
pub mod store;
pub mod stores;
pub mod traits;

pub use chunking::{BoundaryRule, Chunker, ChunkingConfig};
pub use config::{OcrBackend, RagConfig, VectorBackend};
pub use embeddings::{
    cosine_similarity, CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{ConfigError, IngestError, SearchError};
pub use extractor::{EmbeddedImage, ImageData, LopdfExtractor, PdfExtractor, PdfPage};
pub use ingest::discover_files;
pub use models::{
    ContentRecord, ContentType, DocumentKind, Extraction, FileOutcome, FileType, ProcessingStats,
    RecordMetadata, SearchResult, SkippedUnit, SystemStats,
};
pub use ocr::{HttpOcr, OcrEngine, TesseractOcr};
pub use orchestrator::RagSystem;
pub use retrieval::{classify, rerank, QueryType};
pub use sources::{SourceNormalizer, SourceRouter};
pub use store::DocumentStore;
pub use stores::{LocalIndex, QdrantStore};
pub use traits::{IndexHit, VectorIndex};
