//! Validation for records and embeddings.
//!
//! Every check here runs before any write reaches the backing store, so a
//! rejected record never leaves a partial row behind.

use crate::error::{MemoryError, Result};
use crate::types::{CodeIndexEntry, Episode, Fact};

// ─────────────────────────────────────────────────────────────────────────────
// Validation Error
// ─────────────────────────────────────────────────────────────────────────────

/// Specific validation error types for record data.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    /// Fact content is empty.
    #[error("fact content is empty")]
    EmptyContent,

    /// A required episode field is empty.
    #[error("episode field '{0}' is empty")]
    EmptyEpisodeField(&'static str),

    /// Code index entry has an empty file path.
    #[error("code index entry has an empty file path")]
    EmptyPath,

    /// Embedding dimension mismatch.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Embedding contains invalid values (NaN or Inf).
    #[error("embedding contains {count} invalid values (NaN or Inf)")]
    InvalidEmbeddingValues {
        /// Number of invalid values found.
        count: usize,
    },
}

impl From<ValidationError> for MemoryError {
    fn from(err: ValidationError) -> Self {
        MemoryError::InvalidData(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedding Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Validate an embedding vector: dimension must match and all values must
/// be finite.
pub fn validate_embedding(
    embedding: &[f32],
    expected_dim: usize,
) -> std::result::Result<(), ValidationError> {
    if embedding.len() != expected_dim {
        return Err(ValidationError::DimensionMismatch {
            expected: expected_dim,
            actual: embedding.len(),
        });
    }

    let invalid_count = embedding.iter().filter(|v| !v.is_finite()).count();
    if invalid_count > 0 {
        return Err(ValidationError::InvalidEmbeddingValues {
            count: invalid_count,
        });
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Record Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Validate a fact before insert.
pub fn validate_fact(fact: &Fact) -> std::result::Result<(), ValidationError> {
    if fact.content.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(())
}

/// Validate an episode before insert. All four text fields are required.
pub fn validate_episode(episode: &Episode) -> std::result::Result<(), ValidationError> {
    if episode.goal.is_empty() {
        return Err(ValidationError::EmptyEpisodeField("goal"));
    }
    if episode.summary.is_empty() {
        return Err(ValidationError::EmptyEpisodeField("summary"));
    }
    if episode.category.is_empty() {
        return Err(ValidationError::EmptyEpisodeField("category"));
    }
    Ok(())
}

/// Validate a code index entry before upsert.
pub fn validate_code_entry(entry: &CodeIndexEntry) -> std::result::Result<(), ValidationError> {
    if entry.file_path.is_empty() {
        return Err(ValidationError::EmptyPath);
    }
    Ok(())
}

/// Validate an embedding, converting the error for `?` use in store ops.
pub fn validate_embedding_result(embedding: &[f32], expected_dim: usize) -> Result<()> {
    validate_embedding(embedding, expected_dim).map_err(MemoryError::from)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EpisodeResult;

    #[test]
    fn test_validate_embedding_valid() {
        let embedding = vec![0.1, 0.2, 0.3, 0.4];
        assert!(validate_embedding(&embedding, 4).is_ok());
    }

    #[test]
    fn test_validate_embedding_wrong_dimension() {
        let embedding = vec![0.1, 0.2, 0.3];
        let result = validate_embedding(&embedding, 4);
        assert!(matches!(
            result,
            Err(ValidationError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_validate_embedding_nan_and_inf() {
        let embedding = vec![0.1, f32::NAN, f32::INFINITY, 0.4];
        let result = validate_embedding(&embedding, 4);
        assert!(matches!(
            result,
            Err(ValidationError::InvalidEmbeddingValues { count: 2 })
        ));
    }

    #[test]
    fn test_validate_fact_empty() {
        let mut fact = Fact::new("x");
        fact.content = String::new();
        assert!(matches!(
            validate_fact(&fact),
            Err(ValidationError::EmptyContent)
        ));
    }

    #[test]
    fn test_validate_episode_missing_field() {
        let episode = Episode::new("", "summary", EpisodeResult::Success, "test");
        assert!(matches!(
            validate_episode(&episode),
            Err(ValidationError::EmptyEpisodeField("goal"))
        ));
    }

    #[test]
    fn test_validate_episode_ok() {
        let episode = Episode::new("goal", "summary", EpisodeResult::Partial, "test");
        assert!(validate_episode(&episode).is_ok());
    }

    #[test]
    fn test_validate_code_entry_empty_path() {
        let mut entry = CodeIndexEntry::new("/tmp/a.py", "summary", 0.0);
        entry.file_path = String::new();
        assert!(matches!(
            validate_code_entry(&entry),
            Err(ValidationError::EmptyPath)
        ));
    }
}
