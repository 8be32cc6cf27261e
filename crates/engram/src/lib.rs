//! Engram: persistent semantic memory with vector recall.
//!
//! Engram records three kinds of knowledge units — standalone facts,
//! episodic task summaries, and per-file code index entries — as
//! embeddings plus structured metadata, and answers nearest-neighbor
//! queries against them. This crate is the composition layer: it wires
//! the record store, the embedding gateway, and the symbol extractor into
//! a process-scoped [`Engram`] context and exposes the high-level
//! operations.
//!
//! # Usage
//!
//! ```no_run
//! use engram::{Engram, EngramConfig};
//!
//! # async fn run() -> engram::Result<()> {
//! let ctx = Engram::initialize(EngramConfig::default())?;
//!
//! ctx.store_fact("User prefers dark mode").await?;
//!
//! for hit in ctx.recall_facts("theme preference", 5).await {
//!     println!("{}", hit.record.content);
//! }
//!
//! ctx.delete_fact("dark mode")?;
//! ctx.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod ops;

pub use config::{CrawlConfig, EmbeddingConfig, EngramConfig};
pub use context::Engram;
pub use error::{EngramError, Result};
pub use ops::{CrawlReport, EpisodeDeleteRequest, EpisodeDraft};

// Re-export the pieces callers routinely touch.
pub use engram_embed::{Embedder, EmbedderSpec, MockEmbedder, SharedEmbedder, build_embedder};
pub use engram_index::{CrawlOptions, SymbolExtractor, SymbolMap};
pub use engram_memory::{
    CodeIndexEntry, CollectionKind, Episode, EpisodeResult, Fact, MemoryStore, SearchHit,
    StoreStats,
};
