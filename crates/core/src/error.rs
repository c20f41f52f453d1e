use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported file format (use PDF or TXT): {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("missing credential: {0} is not set")]
    MissingCredential(String),

    #[error("upstream failure from {backend}: {details}")]
    Upstream { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid response from {backend}: {details}")]
    InvalidResponse { backend: String, details: String },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please upload a document first.")]
    NoDocuments,

    #[error("Please enter a question.")]
    EmptyQuestion,

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl SessionError {
    /// Warnings are user mistakes the front end should show and move past.
    pub fn is_warning(&self) -> bool {
        matches!(self, SessionError::NoDocuments | SessionError::EmptyQuestion)
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
