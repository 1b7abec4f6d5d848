//! Error types for LexSearch

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for LexSearch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in LexSearch operations
///
/// A missing section is not an error: lookups return `Option`.
#[derive(Error, Debug)]
pub enum Error {
    /// Corpus file missing, malformed or holding duplicate ids
    #[error("failed to load corpus {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// Persisted index disagrees with the corpus it is paired with
    #[error("index mismatch: {0}")]
    IndexMismatch(String),

    /// Failed to load or run the embedding model
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Generative backend failed or timed out
    #[error("llm error: {0}")]
    Llm(String),

    /// Invalid input provided
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
