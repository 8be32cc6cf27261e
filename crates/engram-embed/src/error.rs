//! Error types for the embedding gateway.

use thiserror::Error;

/// Errors that can occur while building or invoking an embedder.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Invalid or incomplete embedder configuration.
    #[error("Embedder config error: {0}")]
    Config(String),

    /// Model loading or inference failed.
    #[error("Embedding inference error: {0}")]
    Inference(String),
}

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;
