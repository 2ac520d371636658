//! Runtime configuration.
//!
//! A single [`RagConfig`] is loaded from TOML at startup and handed to each component
//! constructor. Every key has a default, so a partial file (or no file) is valid.

use crate::embeddings::DEFAULT_EMBEDDING_DIMENSIONS;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub vector_db: VectorDbConfig,
    pub embedding: EmbeddingConfig,
    pub processing: ProcessingConfig,
    pub retrieval: RetrievalConfig,
    pub ocr: OcrConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Local,
    Qdrant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    pub backend: VectorBackend,
    pub path: PathBuf,
    pub collection_name: String,
    pub qdrant_url: String,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Local,
            path: PathBuf::from("./data/vector_db"),
            collection_name: "multimodal_docs".to_string(),
            qdrant_url: "http://localhost:6333".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "char-trigram".to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_file_size_mb: u64,
    pub supported_extensions: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            max_file_size_mb: 10,
            supported_extensions: [".txt", ".pdf", ".png", ".jpg", ".jpeg"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl ProcessingConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    pub similarity_threshold: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            similarity_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackend {
    #[default]
    Tesseract,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub engine: OcrBackend,
    pub tesseract_cmd: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrBackend::Tesseract,
            tesseract_cmd: "tesseract".to_string(),
            language: "eng".to_string(),
            endpoint: None,
            api_key: None,
        }
    }
}

impl OcrConfig {
    /// The configured key, or `OCR_API_KEY` from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OCR_API_KEY").ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl RagConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: RagConfig = toml::from_str(content)?;
        config.processing.supported_extensions = config
            .processing
            .supported_extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .collect();
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Loads `path`, writing the defaults there first when the file does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load(path);
        }

        let config = Self::default();
        config.write(path)?;
        info!(path = %path.display(), "wrote default configuration");
        Ok(config)
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        std::fs::write(path, rendered).map_err(io_error)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let processing = &self.processing;
        if processing.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "processing.chunk_size must be > 0".to_string(),
            ));
        }
        if processing.chunk_overlap >= processing.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "processing.chunk_overlap ({}) must be smaller than processing.chunk_size ({})",
                processing.chunk_overlap, processing.chunk_size
            )));
        }
        if self.retrieval.default_top_k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.default_top_k must be >= 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.similarity_threshold) {
            return Err(ConfigError::Invalid(
                "retrieval.similarity_threshold must be in [0.0, 1.0]".to_string(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(ConfigError::Invalid(
                "embedding.dimensions must be > 0".to_string(),
            ));
        }
        if self.vector_db.collection_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "vector_db.collection_name must not be empty".to_string(),
            ));
        }
        if self.ocr.engine == OcrBackend::Http
            && self.ocr.endpoint.as_deref().map_or(true, |url| url.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "ocr.endpoint is required when ocr.engine = \"http\"".to_string(),
            ));
        }
        Ok(())
    }
}

fn normalize_extension(extension: &str) -> String {
    let lowered = extension.trim().to_ascii_lowercase();
    if lowered.starts_with('.') {
        lowered
    } else {
        format!(".{lowered}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_yields_documented_defaults() -> Result<(), ConfigError> {
        let config = RagConfig::from_toml_str("")?;
        assert_eq!(config.processing.chunk_size, 1000);
        assert_eq!(config.processing.chunk_overlap, 200);
        assert_eq!(config.retrieval.default_top_k, 5);
        assert_eq!(config.retrieval.similarity_threshold, 0.5);
        assert_eq!(config.vector_db.collection_name, "multimodal_docs");
        assert_eq!(
            config.processing.supported_extensions,
            vec![".txt", ".pdf", ".png", ".jpg", ".jpeg"]
        );
        Ok(())
    }

    #[test]
    fn partial_sections_keep_other_defaults() -> Result<(), ConfigError> {
        let config = RagConfig::from_toml_str(
            r#"
            [processing]
            chunk_size = 400
            chunk_overlap = 50
            supported_extensions = ["TXT", ".Pdf"]

            [vector_db]
            backend = "qdrant"
            "#,
        )?;
        assert_eq!(config.processing.chunk_size, 400);
        assert_eq!(config.processing.max_file_size_mb, 10);
        assert_eq!(config.processing.supported_extensions, vec![".txt", ".pdf"]);
        assert_eq!(config.vector_db.backend, VectorBackend::Qdrant);
        assert_eq!(config.vector_db.path, PathBuf::from("./data/vector_db"));
        Ok(())
    }

    #[test]
    fn overlap_not_smaller_than_chunk_size_is_rejected() {
        let result = RagConfig::from_toml_str(
            r#"
            [processing]
            chunk_size = 100
            chunk_overlap = 100
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn http_ocr_requires_endpoint() {
        let result = RagConfig::from_toml_str("[ocr]\nengine = \"http\"\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_or_init_writes_defaults_once() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("conf").join("config.toml");

        let first = RagConfig::load_or_init(&path)?;
        assert!(path.exists());
        let reloaded = RagConfig::load(&path)?;
        assert_eq!(
            first.processing.supported_extensions,
            reloaded.processing.supported_extensions
        );
        assert_eq!(reloaded.embedding.model, "char-trigram");
        Ok(())
    }
}
