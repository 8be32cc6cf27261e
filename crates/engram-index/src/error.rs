//! Error types for the index crate.

use thiserror::Error;

/// Errors that can occur while setting up extraction.
///
/// Extraction itself never fails a caller: unparsable or unreadable input
/// degrades to an empty symbol map (see `SymbolExtractor`).
#[derive(Debug, Error)]
pub enum IndexError {
    /// The grammar could not be loaded into the parser.
    #[error("Parser setup error: {0}")]
    Language(String),
}

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
