//! Embedding gateway for Engram.
//!
//! Converts text into fixed-dimension vectors for the memory store. The
//! gateway is process-wide state: built once at startup from an
//! [`EmbedderSpec`], shared by handle, and released when the last handle
//! drops at shutdown.
//!
//! # Implementations
//!
//! - [`MockEmbedder`]: deterministic hash-seeded vectors, for tests and
//!   as the offline fallback
//! - `LocalEmbedder`: ONNX Runtime inference (requires the
//!   `local-embeddings` feature and model files on disk)

use std::sync::Arc;

use async_trait::async_trait;

pub mod error;
mod mock;

#[cfg(feature = "local-embeddings")]
pub mod local;

pub use error::{EmbedError, Result};
pub use mock::MockEmbedder;

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for generating text embeddings.
///
/// Calls are synchronous from the caller's point of view: no timeout and
/// no cancellation. A caller wanting either must wrap the future itself.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimensionality of the embeddings this embedder produces.
    fn dimensions(&self) -> usize;

    /// Name of this embedder.
    fn name(&self) -> &str;
}

/// A shared, process-wide embedder handle.
pub type SharedEmbedder = Arc<dyn Embedder>;

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Factory
// ─────────────────────────────────────────────────────────────────────────────

/// Provider-agnostic description of the embedder to build.
///
/// Populated from application configuration; keeps this crate free of a
/// dependency on the config layer.
#[derive(Debug, Clone)]
pub struct EmbedderSpec {
    /// Provider name: "local" or "mock".
    pub provider: String,
    /// Local ONNX model path.
    pub model_path: Option<std::path::PathBuf>,
    /// Local tokenizer.json path.
    pub tokenizer_path: Option<std::path::PathBuf>,
    /// Requested dimensions.
    pub dimensions: Option<usize>,
}

impl Default for EmbedderSpec {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model_path: None,
            tokenizer_path: None,
            dimensions: None,
        }
    }
}

/// Build the process-wide embedder from a spec.
///
/// Falls back to [`MockEmbedder`] with a warning if a local model is
/// requested but unavailable, so recall still works end to end (with
/// degraded ranking) on machines without model files.
pub fn build_embedder(spec: &EmbedderSpec) -> Result<SharedEmbedder> {
    let dims = spec.dimensions.unwrap_or(384);

    match spec.provider.as_str() {
        #[cfg(feature = "local-embeddings")]
        "local" => {
            let located = match (&spec.model_path, &spec.tokenizer_path) {
                (Some(model), Some(tokenizer)) => Some((model.clone(), tokenizer.clone())),
                _ => default_local_model_dir().and_then(|dir| {
                    let model = dir.join("model.onnx");
                    let tokenizer = dir.join("tokenizer.json");
                    (model.exists() && tokenizer.exists()).then_some((model, tokenizer))
                }),
            };

            match located {
                Some((model, tokenizer)) => {
                    let embedder = local::LocalEmbedder::load(&model, &tokenizer, dims)?;
                    Ok(Arc::new(embedder))
                }
                None => {
                    tracing::warn!(
                        "Local embedding model not found. Falling back to mock embedder. \
                         Download a MiniLM-class ONNX model to ~/.local/share/engram/models/"
                    );
                    Ok(Arc::new(MockEmbedder::new(dims)))
                }
            }
        }
        #[cfg(not(feature = "local-embeddings"))]
        "local" => {
            tracing::warn!(
                "Local embeddings requested but the 'local-embeddings' feature is not enabled. \
                 Falling back to mock embedder."
            );
            Ok(Arc::new(MockEmbedder::new(dims)))
        }
        "mock" => Ok(Arc::new(MockEmbedder::new(dims))),
        other => Err(EmbedError::Config(format!(
            "Unknown embedding provider '{}'. Valid: local, mock",
            other
        ))),
    }
}

/// Default directory for local embedding model files.
#[cfg(feature = "local-embeddings")]
fn default_local_model_dir() -> Option<std::path::PathBuf> {
    dirs::data_dir().map(|d| d.join("engram").join("models"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_mock_embedder() {
        let spec = EmbedderSpec {
            provider: "mock".to_string(),
            dimensions: Some(64),
            ..Default::default()
        };
        let embedder = build_embedder(&spec).unwrap();
        assert_eq!(embedder.dimensions(), 64);
        assert_eq!(embedder.name(), "mock");
    }

    #[test]
    fn test_build_unknown_provider() {
        let spec = EmbedderSpec {
            provider: "cloud".to_string(),
            ..Default::default()
        };
        assert!(matches!(build_embedder(&spec), Err(EmbedError::Config(_))));
    }

    #[tokio::test]
    async fn test_shared_handle_embeds() {
        let spec = EmbedderSpec {
            provider: "mock".to_string(),
            dimensions: Some(8),
            ..Default::default()
        };
        let embedder = build_embedder(&spec).unwrap();
        let vector = embedder.embed("some text").await.unwrap();
        assert_eq!(vector.len(), 8);
    }
}
