//! Error types for the composition layer.

use thiserror::Error;

/// Errors surfaced by high-level Engram operations.
#[derive(Debug, Error)]
pub enum EngramError {
    /// Record store failure.
    #[error(transparent)]
    Memory(#[from] engram_memory::MemoryError),

    /// Embedding gateway failure.
    #[error(transparent)]
    Embed(#[from] engram_embed::EmbedError),

    /// Extractor setup failure.
    #[error(transparent)]
    Index(#[from] engram_index::IndexError),

    /// Configuration file could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// A referenced path does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request is missing a required field.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Engram operations.
pub type Result<T> = std::result::Result<T, EngramError>;
