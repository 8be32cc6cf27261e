//! Configuration for the Engram process.
//!
//! # Configuration
//!
//! ```toml
//! data_dir = "~/.engram"
//!
//! [embedding]
//! provider = "local"
//! dimensions = 384
//!
//! [crawl]
//! skip_dirs = [".git", ".venv", "node_modules", "data"]
//! extensions = ["py", "md", "ts", "js", "json"]
//! ```
//!
//! # Environment Variables
//!
//! - `ENGRAM_DATA_DIR` - Override the data directory
//! - `ENGRAM_EMBEDDING_PROVIDER` - Override the embedding provider

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use engram_embed::EmbedderSpec;
use engram_index::CrawlOptions;

use crate::error::{EngramError, Result};

/// Top-level Engram configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngramConfig {
    /// Base directory for the store's data.
    /// Default: `~/.engram`
    ///
    /// Can be overridden by the `ENGRAM_DATA_DIR` environment variable.
    pub data_dir: Option<PathBuf>,

    /// Embedding gateway configuration.
    pub embedding: EmbeddingConfig,

    /// Crawl configuration.
    pub crawl: CrawlConfig,
}

/// Embedding gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider name: "local" or "mock".
    pub provider: String,
    /// Embedding dimensions for this deployment.
    pub dimensions: usize,
    /// Local ONNX model path (optional; a default location is probed).
    pub model_path: Option<PathBuf>,
    /// Local tokenizer.json path.
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            dimensions: 384,
            model_path: None,
            tokenizer_path: None,
        }
    }
}

/// Crawl configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Directory names pruned from crawls.
    pub skip_dirs: Vec<String>,
    /// File extensions (without dot) recognized as indexable.
    pub extensions: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        let options = CrawlOptions::default();
        Self {
            skip_dirs: options.skip_dirs,
            extensions: options.extensions,
        }
    }
}

impl EngramConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngramError::Config(format!("Cannot read {:?}: {}", path, e)))?;
        toml::from_str(&text)
            .map_err(|e| EngramError::Config(format!("Cannot parse {:?}: {}", path, e)))
    }

    /// Get the effective data directory.
    ///
    /// Resolution order:
    /// 1. `ENGRAM_DATA_DIR` environment variable
    /// 2. Configured `data_dir` value
    /// 3. Default: `~/.engram`
    pub fn effective_data_dir(&self) -> PathBuf {
        if let Ok(env_path) = std::env::var("ENGRAM_DATA_DIR") {
            return PathBuf::from(env_path);
        }

        self.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".engram")
        })
    }

    /// Path of the store's database file.
    pub fn database_path(&self) -> PathBuf {
        self.effective_data_dir().join("memory.db")
    }

    /// Effective embedding provider (respects env var).
    pub fn effective_provider(&self) -> String {
        std::env::var("ENGRAM_EMBEDDING_PROVIDER").unwrap_or_else(|_| self.embedding.provider.clone())
    }

    /// Spec handed to the embedder factory.
    pub fn embedder_spec(&self) -> EmbedderSpec {
        EmbedderSpec {
            provider: self.effective_provider(),
            model_path: self.embedding.model_path.clone(),
            tokenizer_path: self.embedding.tokenizer_path.clone(),
            dimensions: Some(self.embedding.dimensions),
        }
    }

    /// Options handed to the crawl.
    pub fn crawl_options(&self) -> CrawlOptions {
        CrawlOptions {
            skip_dirs: self.crawl.skip_dirs.clone(),
            extensions: self.crawl.extensions.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
