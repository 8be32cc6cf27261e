//! Process-scoped context: store, embedder, and extractor built once.
//!
//! Explicit, injected process state over lazily-initialized globals:
//! everything a request needs is constructed here at startup, passed by
//! reference, and released exactly once at teardown.

use std::sync::Mutex;

use tracing::info;

use engram_embed::{SharedEmbedder, build_embedder};
use engram_index::SymbolExtractor;
use engram_memory::MemoryStore;

use crate::config::EngramConfig;
use crate::error::Result;

/// The Engram process context.
///
/// Owns the record store, the embedding gateway handle, and the symbol
/// extractor for the lifetime of the process.
pub struct Engram {
    pub(crate) config: EngramConfig,
    pub(crate) store: MemoryStore,
    pub(crate) embedder: SharedEmbedder,
    pub(crate) extractor: Mutex<SymbolExtractor>,
}

impl Engram {
    /// Initialize the context from configuration.
    ///
    /// Opens (or creates) the on-disk store, builds the embedder, and
    /// loads the extractor grammar. The store's embedding dimension is
    /// taken from the embedder actually built, so the two can never
    /// disagree.
    pub fn initialize(config: EngramConfig) -> Result<Self> {
        let embedder = build_embedder(&config.embedder_spec())?;
        let store = MemoryStore::open(config.database_path(), embedder.dimensions())?;
        let extractor = Mutex::new(SymbolExtractor::new()?);

        info!(
            "Engram initialized (provider: {}, dimensions: {})",
            embedder.name(),
            embedder.dimensions()
        );

        Ok(Self {
            config,
            store,
            embedder,
            extractor,
        })
    }

    /// Initialize an in-memory context with a caller-provided embedder.
    ///
    /// Nothing touches disk except what the caller indexes; intended for
    /// tests and short-lived tooling.
    pub fn ephemeral(embedder: SharedEmbedder) -> Result<Self> {
        let store = MemoryStore::open_in_memory(embedder.dimensions())?;
        let extractor = Mutex::new(SymbolExtractor::new()?);

        Ok(Self {
            config: EngramConfig::default(),
            store,
            embedder,
            extractor,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &EngramConfig {
        &self.config
    }

    /// The record store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// The embedding gateway handle.
    pub fn embedder(&self) -> &SharedEmbedder {
        &self.embedder
    }

    /// Tear the context down.
    ///
    /// Consumes the context so nothing can use it afterwards; the store
    /// connection and the embedder release with it.
    pub fn close(self) {
        info!("Engram context closed");
    }
}
