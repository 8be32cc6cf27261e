//! Persistent semantic memory store for Engram.
//!
//! This crate is the record/query engine: it persists three kinds of
//! knowledge units — standalone facts, episodic task summaries, and
//! per-file code index entries — as embeddings plus structured metadata
//! in SQLite, using sqlite-vec for nearest-neighbor recall.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MemoryStore                                                            │
//! │  - Single SQLite file with WAL mode                                     │
//! │  - One metadata table + one vec0 table per collection                   │
//! │  - Destructive drop+recreate migration on shape mismatch                │
//! │  - Central predicate builder for every filter the store issues          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use engram_memory::{Fact, MemoryStore};
//!
//! let store = MemoryStore::open("~/.engram/memory.db", 384)?;
//!
//! let fact = Fact::new("User prefers dark mode");
//! let embedding = vec![0.0; 384]; // from the embedding gateway
//! store.insert_fact(&fact, &embedding)?;
//!
//! let hits = store.search_facts(&embedding, 5);
//! for hit in hits {
//!     println!("{} (distance {})", hit.record.content, hit.distance);
//! }
//! # Ok::<(), engram_memory::MemoryError>(())
//! ```
//!
//! Embeddings are produced outside this crate; callers hand in vectors of
//! the dimension the store was opened with, and a mismatch is rejected
//! before anything is written.

pub mod error;
pub mod paths;
pub mod predicate;
pub mod schema;
pub mod store;
pub mod types;
pub mod validation;
pub mod vector;

// Re-export error types
pub use error::{MemoryError, Result};

// Re-export schema registry
pub use schema::{CollectionKind, CollectionSchema, FieldDef, expected_shape};

// Re-export store
pub use store::{EpisodeDeleteKey, MemoryStore, SearchHit, StoreStats};

// Re-export record types
pub use types::{CodeIndexEntry, Episode, EpisodeResult, Fact, RecordId, current_mtime, now_epoch};

// Re-export vector search
pub use vector::{DEFAULT_EMBEDDING_DIMS, SimilarityResult};

// Re-export validation
pub use validation::{ValidationError, validate_embedding};
