//! Directory crawl: discover indexable files below a root.
//!
//! The crawl is sequential, one file at a time. It only discovers paths;
//! per-file indexing (and per-file failure isolation) belongs to the
//! caller.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// What a crawl visits.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Directory names pruned from the walk wherever they appear.
    pub skip_dirs: Vec<String>,
    /// File extensions (without dot) recognized as indexable.
    pub extensions: Vec<String>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            // Version-control metadata, local environments/dependencies,
            // and the store's own data directory.
            skip_dirs: vec![
                ".git".to_string(),
                ".venv".to_string(),
                "node_modules".to_string(),
                "data".to_string(),
            ],
            extensions: vec![
                "py".to_string(),
                "md".to_string(),
                "ts".to_string(),
                "js".to_string(),
                "json".to_string(),
            ],
        }
    }
}

impl CrawlOptions {
    fn skips(&self, entry: &walkdir::DirEntry) -> bool {
        entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.skip_dirs.iter().any(|d| d == name))
    }

    fn recognizes(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

/// Walk below `root` and return every recognized file, in a stable order.
///
/// Unreadable directory entries are logged and skipped; the walk
/// continues.
pub fn discover_files(root: &Path, options: &CrawlOptions) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !options.skips(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {:?}: {}", root, e);
                continue;
            }
        };

        if entry.file_type().is_file() && options.recognizes(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
