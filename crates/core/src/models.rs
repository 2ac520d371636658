use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Origin of a stored record. Every record carries exactly one of these tags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Text,
    PdfText,
    PdfImage,
    Image,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Text => "text",
            FileType::PdfText => "pdf_text",
            FileType::PdfImage => "pdf_image",
            FileType::Image => "image",
        }
    }

    /// Records whose content came from a text layer.
    pub fn is_textual(self) -> bool {
        match self {
            FileType::Text | FileType::PdfText => true,
            FileType::PdfImage | FileType::Image => false,
        }
    }

    /// Records whose content came from OCR over pixels.
    pub fn is_visual(self) -> bool {
        match self {
            FileType::PdfImage | FileType::Image => true,
            FileType::Text | FileType::PdfText => false,
        }
    }

    pub fn document_kind(self) -> DocumentKind {
        match self {
            FileType::Text => DocumentKind::Text,
            FileType::PdfText | FileType::PdfImage => DocumentKind::Pdf,
            FileType::Image => DocumentKind::Image,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of input file, detected from its extension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Text,
    Pdf,
    Image,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Text, DocumentKind::Image, DocumentKind::Pdf];

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "txt" => Some(DocumentKind::Text),
            "pdf" => Some(DocumentKind::Pdf),
            "png" | "jpg" | "jpeg" => Some(DocumentKind::Image),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();

        Self::from_extension(&extension).ok_or(IngestError::UnsupportedFileType(extension))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Text => "text",
            DocumentKind::Pdf => "pdf",
            DocumentKind::Image => "image",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    ImageOcr,
    OcrText,
}

/// Metadata attached to every record. Source-specific fields are only set for the
/// `file_type` that produces them; use the constructors to keep them consistent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordMetadata {
    pub filename: String,
    pub file_type: FileType,
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_index: Option<usize>,
}

impl RecordMetadata {
    pub fn text(filename: &str, chunk_index: usize, total_chunks: usize) -> Self {
        Self {
            filename: filename.to_string(),
            file_type: FileType::Text,
            content_type: ContentType::Text,
            page_number: None,
            chunk_index: Some(chunk_index),
            total_chunks: Some(total_chunks),
            image_index: None,
        }
    }

    pub fn pdf_text(filename: &str, page_number: u32, chunk_index: usize) -> Self {
        Self {
            filename: filename.to_string(),
            file_type: FileType::PdfText,
            content_type: ContentType::Text,
            page_number: Some(page_number),
            chunk_index: Some(chunk_index),
            total_chunks: None,
            image_index: None,
        }
    }

    pub fn pdf_image(filename: &str, page_number: u32, image_index: usize) -> Self {
        Self {
            filename: filename.to_string(),
            file_type: FileType::PdfImage,
            content_type: ContentType::ImageOcr,
            page_number: Some(page_number),
            chunk_index: None,
            total_chunks: None,
            image_index: Some(image_index),
        }
    }

    pub fn image(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            file_type: FileType::Image,
            content_type: ContentType::OcrText,
            page_number: None,
            chunk_index: None,
            total_chunks: None,
            image_index: None,
        }
    }
}

/// The atomic unit that is embedded, stored and retrieved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentRecord {
    pub id: String,
    pub content: String,
    pub metadata: RecordMetadata,
}

impl ContentRecord {
    pub fn is_storable(&self) -> bool {
        !self.id.is_empty() && !self.content.trim().is_empty()
    }
}

/// Builds a record id from a readable prefix and a random suffix.
pub fn record_id(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &suffix[..8])
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub metadata: RecordMetadata,
    pub score: f64,
    pub document_type: FileType,
}

/// A unit of work inside a file (one page's text layer or one embedded image)
/// that could not be extracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedUnit {
    pub unit: String,
    pub reason: String,
}

/// What a normalizer produced for one file.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<ContentRecord>,
    pub skipped: Vec<SkippedUnit>,
}

impl Extraction {
    pub fn from_records(records: Vec<ContentRecord>) -> Self {
        Self {
            records,
            skipped: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Ingested {
        file_path: PathBuf,
        chunks_created: usize,
        file_type: DocumentKind,
        skipped_units: usize,
    },
    Failed {
        file_path: PathBuf,
        error: String,
    },
}

impl FileOutcome {
    pub fn failed(file_path: &Path, error: impl Into<String>) -> Self {
        FileOutcome::Failed {
            file_path: file_path.to_path_buf(),
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Ingested { .. })
    }

    pub fn file_path(&self) -> &Path {
        match self {
            FileOutcome::Ingested { file_path, .. } | FileOutcome::Failed { file_path, .. } => {
                file_path
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypeCounters {
    pub files_processed: usize,
    pub chunks_created: usize,
}

impl TypeCounters {
    fn add(&mut self, other: TypeCounters) {
        self.files_processed += other.files_processed;
        self.chunks_created += other.chunks_created;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Per-type counters for one folder run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub text: TypeCounters,
    pub image: TypeCounters,
    pub pdf: TypeCounters,
    pub total_files: usize,
    pub total_chunks: usize,
    pub failed_files: Vec<FailedFile>,
}

impl ProcessingStats {
    /// Folds one file outcome into the counters. Files without a detected kind only
    /// count towards the totals.
    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Ingested {
                chunks_created,
                file_type,
                ..
            } => self.record_success(Some(*file_type), *chunks_created),
            FileOutcome::Failed { file_path, error } => self.failed_files.push(FailedFile {
                path: file_path.clone(),
                reason: error.clone(),
            }),
        }
    }

    pub fn record_success(&mut self, kind: Option<DocumentKind>, chunks_created: usize) {
        if let Some(kind) = kind {
            self.bucket_mut(kind).add(TypeCounters {
                files_processed: 1,
                chunks_created,
            });
        }
        self.total_files += 1;
        self.total_chunks += chunks_created;
    }

    pub fn merge(&mut self, other: ProcessingStats) {
        self.text.add(other.text);
        self.image.add(other.image);
        self.pdf.add(other.pdf);
        self.total_files += other.total_files;
        self.total_chunks += other.total_chunks;
        self.failed_files.extend(other.failed_files);
    }

    fn bucket_mut(&mut self, kind: DocumentKind) -> &mut TypeCounters {
        match kind {
            DocumentKind::Text => &mut self.text,
            DocumentKind::Pdf => &mut self.pdf,
            DocumentKind::Image => &mut self.image,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_documents: usize,
    pub document_types: Vec<DocumentKind>,
    pub collection_name: String,
    pub embedding_model: String,
}
