//! Source symbol extraction and directory crawl for Engram.
//!
//! Two concerns live here:
//! - [`SymbolExtractor`]: parse a Python file's syntax tree into a
//!   hierarchical symbol map (top-level functions, classes with their
//!   immediate methods). Other file types pass through empty.
//! - [`discover_files`]: walk a directory tree and yield the files worth
//!   indexing, pruning version-control and environment directories.

pub mod crawl;
pub mod error;
pub mod extract;

pub use crawl::{CrawlOptions, discover_files};
pub use error::{IndexError, Result};
pub use extract::{SymbolExtractor, SymbolMap};
