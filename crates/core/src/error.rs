use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("image decode error: {0}")]
    ImageDecode(String),

    #[error("ocr failed: {0}")]
    OcrFailed(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("file is {size_mb:.1} MB, above the {limit_mb} MB limit")]
    FileTooLarge { size_mb: f64, limit_mb: u64 },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("index error: {0}")]
    Index(#[from] SearchError),
}

impl From<image::ImageError> for IngestError {
    fn from(value: image::ImageError) -> Self {
        Self::ImageDecode(value.to_string())
    }
}

impl From<lopdf::Error> for IngestError {
    fn from(value: lopdf::Error) -> Self {
        Self::PdfParse(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("search request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
