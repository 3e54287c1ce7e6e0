//! Error types for virtualpaper.

use thiserror::Error;

/// Result type alias using virtualpaper's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for virtualpaper operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(uuid::Uuid),

    /// A record with the same unique key (content hash) already exists
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Storage backend failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Job bookkeeping failed
    #[error("Job error: {0}")]
    Job(String),

    /// Thumbnail / image conversion failed
    #[error("Thumbnail error: {0}")]
    Thumbnail(String),

    /// Filesystem watch could not be registered or failed
    #[error("Watch error: {0}")]
    Watch(String),

    /// A rule action failed. Carries the id of the failing action.
    #[error("action ({action_id}): {source}")]
    Action {
        action_id: i64,
        #[source]
        source: Box<Error>,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an error raised by the rule action with the given id.
    pub fn action(action_id: i64, source: Error) -> Self {
        Error::Action {
            action_id,
            source: Box::new(source),
        }
    }

    /// True for lookups that missed rather than failed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::DocumentNotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
