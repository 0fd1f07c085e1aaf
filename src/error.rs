use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the ingestion and query pipelines
#[derive(Debug, Error)]
pub enum RagError {
    /// Missing or invalid endpoint/credential configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The ingestion input could not be read or parsed
    #[error("Source unavailable ({}): {reason}", .path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    /// Rejected before any I/O happened
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The embedding service failed or returned an unusable vector
    #[error("Embedding failed: {0}")]
    EmbeddingFailure(String),

    /// The similarity query against the vector store failed
    #[error("Retrieval failed: {0}")]
    RetrievalFailure(String),

    /// The language model call failed
    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    /// Uploading passages to the vector store failed
    #[error("Storage write failed: {0}")]
    StorageWriteFailure(String),
}

impl RagError {
    pub(crate) fn source_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        RagError::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
