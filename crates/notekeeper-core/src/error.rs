//! Error types for notekeeper-core

use thiserror::Error;

/// Result type alias using notekeeper-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in notekeeper-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote API answered with an error status or an unusable payload
    #[error("Remote API error: {0}")]
    Api(String),

    /// Remote API refused a mutation
    #[error("Remote rejected {operation} for note {note_id}")]
    Rejected {
        operation: &'static str,
        note_id: String,
    },

    /// Realtime channel error
    #[error("Channel error: {0}")]
    Channel(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
