//! High-level store, recall, index, and crawl operations.
//!
//! Each operation is a single run-to-completion request: embed what needs
//! embedding, then one round trip against the store. Write paths validate
//! first and propagate failures; recall paths are best-effort and degrade
//! to empty results.

use std::path::Path;

use tracing::{info, warn};

use engram_index::{SymbolMap, discover_files};
use engram_memory::{
    CodeIndexEntry, Episode, EpisodeDeleteKey, EpisodeResult, Fact, SearchHit, current_mtime,
    paths::absolute_path,
};

use crate::context::Engram;
use crate::error::{EngramError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Request/Report Types
// ─────────────────────────────────────────────────────────────────────────────

/// Fields of an episode to store.
#[derive(Debug, Clone)]
pub struct EpisodeDraft {
    /// What the task set out to do.
    pub goal: String,
    /// What happened.
    pub summary: String,
    /// Task outcome.
    pub result: EpisodeResult,
    /// Free-form category label.
    pub category: String,
}

/// An episode deletion request.
///
/// Matches against the goal when one is given, otherwise against the
/// summary.
#[derive(Debug, Clone, Default)]
pub struct EpisodeDeleteRequest {
    /// Substring to match against goals.
    pub goal: Option<String>,
    /// Substring to match against summaries, used when `goal` is absent.
    pub summary: Option<String>,
}

/// Outcome of a directory crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Files indexed successfully.
    pub indexed: usize,
    /// Files that failed and were skipped.
    pub failed: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Facts
// ─────────────────────────────────────────────────────────────────────────────

impl Engram {
    /// Store a fact.
    pub async fn store_fact(&self, content: &str) -> Result<Fact> {
        if content.is_empty() {
            return Err(EngramError::InvalidRequest(
                "content is required for a fact".to_string(),
            ));
        }

        let fact = Fact::new(content);
        let embedding = self.embedder.embed(fact.embedding_text()).await?;
        self.store.insert_fact(&fact, &embedding)?;

        info!("Stored fact: {}", fact.content);
        Ok(fact)
    }

    /// Delete the first fact whose content contains `needle`.
    ///
    /// Returns the deleted content, or `None` when nothing matched.
    pub fn delete_fact(&self, needle: &str) -> Result<Option<String>> {
        let deleted = self.store.delete_fact_matching(needle)?;
        match &deleted {
            Some(content) => info!("Deleted fact: {}", content),
            None => info!("No fact matched {:?}; nothing to delete", needle),
        }
        Ok(deleted)
    }

    /// Nearest facts to a query. Best-effort: failures yield no results.
    pub async fn recall_facts(&self, query: &str, limit: usize) -> Vec<SearchHit<Fact>> {
        match self.embedder.embed(query).await {
            Ok(embedding) => self.store.search_facts(&embedding, limit),
            Err(e) => {
                warn!("Fact recall degraded to empty: {}", e);
                Vec::new()
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Episodes
// ─────────────────────────────────────────────────────────────────────────────

impl Engram {
    /// Store an episode.
    pub async fn store_episode(&self, draft: EpisodeDraft) -> Result<Episode> {
        let episode = Episode::new(draft.goal, draft.summary, draft.result, draft.category);
        let embedding = self.embedder.embed(&episode.embedding_text()).await?;
        self.store.insert_episode(&episode, &embedding)?;

        info!("Stored episode: {} -> {}", episode.goal, episode.result);
        Ok(episode)
    }

    /// Delete the first episode matching the request.
    ///
    /// Returns the matched field value, or `None` when nothing matched.
    pub fn delete_episode(&self, request: &EpisodeDeleteRequest) -> Result<Option<String>> {
        let key = if let Some(goal) = &request.goal {
            EpisodeDeleteKey::Goal(goal.clone())
        } else if let Some(summary) = &request.summary {
            EpisodeDeleteKey::Summary(summary.clone())
        } else {
            return Err(EngramError::InvalidRequest(
                "episode deletion needs a goal or summary substring".to_string(),
            ));
        };

        let deleted = self.store.delete_episode_matching(&key)?;
        match &deleted {
            Some(matched) => info!("Deleted episode matching: {}", matched),
            None => info!("No episode matched; nothing to delete"),
        }
        Ok(deleted)
    }

    /// Nearest episodes to a query. Best-effort.
    pub async fn recall_episodes(&self, query: &str, limit: usize) -> Vec<SearchHit<Episode>> {
        match self.embedder.embed(query).await {
            Ok(embedding) => self.store.search_episodes(&embedding, limit),
            Err(e) => {
                warn!("Episode recall degraded to empty: {}", e);
                Vec::new()
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Code Index
// ─────────────────────────────────────────────────────────────────────────────

impl Engram {
    /// Index a file: extract symbols, embed, and upsert by path.
    ///
    /// `summary` defaults to a placeholder derived from the path. When
    /// `symbols` is supplied it overrides extraction; otherwise Python
    /// files are parsed and everything else indexes with an empty symbol
    /// map.
    pub async fn index_file(
        &self,
        path: impl AsRef<Path>,
        summary: Option<&str>,
        symbols: Option<SymbolMap>,
    ) -> Result<CodeIndexEntry> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EngramError::NotFound(format!("{}", path.display())));
        }

        let file_path = absolute_path(path)?;
        let last_modified = current_mtime(path).ok_or_else(|| {
            EngramError::NotFound(format!("{}: modification time unavailable", path.display()))
        })?;

        let summary = match summary {
            Some(summary) => summary.to_string(),
            None => format!("Summary for {}", file_path),
        };

        let symbols = match symbols {
            Some(symbols) => symbols,
            None => self.extractor.lock().unwrap().extract_file(path),
        };

        let entry = CodeIndexEntry::new(file_path, summary, last_modified)
            .with_symbols(symbols.classes, symbols.top_level_functions);

        let embedding = self.embedder.embed(&entry.embedding_text()).await?;
        self.store.upsert_code_entry(&entry, &embedding)?;

        info!("Indexed: {}", entry.file_path);
        Ok(entry)
    }

    /// Remove a file's index entry. Returns whether one existed.
    pub fn remove_index(&self, path: impl AsRef<Path>) -> Result<bool> {
        let file_path = absolute_path(path)?;
        let removed = self.store.delete_code_entry(&file_path)?;
        match removed {
            true => info!("Removed index entry: {}", file_path),
            false => info!("No index entry for {}; nothing to delete", file_path),
        }
        Ok(removed)
    }

    /// Index every recognized file below `root`, sequentially.
    ///
    /// A failure on one file is logged and skipped; the crawl continues.
    pub async fn crawl(&self, root: impl AsRef<Path>) -> Result<CrawlReport> {
        let root = root.as_ref();
        let options = self.config.crawl_options();
        let files = discover_files(root, &options);

        info!("Crawling {} ({} candidate files)", root.display(), files.len());

        let mut report = CrawlReport::default();
        for file in files {
            match self.index_file(&file, None, None).await {
                Ok(_) => report.indexed += 1,
                Err(e) => {
                    warn!("Skipping {}: {}", file.display(), e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Crawl finished: {} indexed, {} skipped",
            report.indexed, report.failed
        );
        Ok(report)
    }

    /// Nearest code index entries to a query. Best-effort.
    pub async fn recall_code(&self, query: &str, limit: usize) -> Vec<SearchHit<CodeIndexEntry>> {
        match self.embedder.embed(query).await {
            Ok(embedding) => self.store.search_code(&embedding, limit),
            Err(e) => {
                warn!("Code recall degraded to empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Exact-match lookup of a file's index entries by path.
    ///
    /// Unlike recall this is a diagnostic: errors propagate.
    pub fn lookup_path(&self, path: impl AsRef<Path>) -> Result<Vec<CodeIndexEntry>> {
        Ok(self.store.lookup_by_path(path)?)
    }
}
