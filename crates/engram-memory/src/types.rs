//! Record types persisted by the memory store.
//!
//! Three kinds of knowledge units are stored, one collection each:
//! - [`Fact`]: a standalone piece of free text.
//! - [`Episode`]: a task summary with goal, outcome, and category.
//! - [`CodeIndexEntry`]: per-file index metadata with a hierarchical
//!   symbol map (classes with their methods, plus top-level functions).
//!
//! Each record carries a [`RecordId`] pairing its metadata row with its
//! embedding row in the backing store. Embedding *text* composition lives
//! here too, so every caller embeds the same rendition of a record.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Record Id
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier for a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generate a new random record ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a record ID from its string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Current wall-clock time as fractional seconds since the epoch.
///
/// Microsecond granularity, so the value survives a round trip through a
/// REAL column and a rendered filter literal unchanged.
pub fn now_epoch() -> f64 {
    let micros = chrono::Utc::now().timestamp_micros();
    micros as f64 / 1_000_000.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Fact
// ─────────────────────────────────────────────────────────────────────────────

/// A standalone fact. Duplicates are permitted; deletion disambiguates by
/// the matched row's exact `(content, timestamp)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Record ID.
    pub id: RecordId,
    /// Free text content; also the embedding input.
    pub content: String,
    /// Seconds since epoch, captured at write time.
    pub timestamp: f64,
}

impl Fact {
    /// Create a fact stamped with the current time.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            content: content.into(),
            timestamp: now_epoch(),
        }
    }

    /// The text that gets embedded for this record.
    pub fn embedding_text(&self) -> &str {
        &self.content
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Episode
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of an episodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeResult {
    /// The task completed successfully.
    Success,
    /// The task failed.
    Failure,
    /// The task partially completed.
    Partial,
}

impl EpisodeResult {
    /// String form stored in the collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Partial => "partial",
        }
    }

    /// Parse from the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}

impl std::fmt::Display for EpisodeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An episodic task summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Record ID.
    pub id: RecordId,
    /// What the task set out to do.
    pub goal: String,
    /// What happened.
    pub summary: String,
    /// Task outcome.
    pub result: EpisodeResult,
    /// Free-form category label.
    pub category: String,
    /// Seconds since epoch, captured at write time.
    pub timestamp: f64,
}

impl Episode {
    /// Create an episode stamped with the current time.
    pub fn new(
        goal: impl Into<String>,
        summary: impl Into<String>,
        result: EpisodeResult,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            goal: goal.into(),
            summary: summary.into(),
            result,
            category: category.into(),
            timestamp: now_epoch(),
        }
    }

    /// The text that gets embedded for this record.
    pub fn embedding_text(&self) -> String {
        format!("Goal: {}\nSummary: {}", self.goal, self.summary)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Code Index Entry
// ─────────────────────────────────────────────────────────────────────────────

/// Per-file code index entry. `file_path` is the de facto unique key: the
/// upsert protocol guarantees at most one live row per path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeIndexEntry {
    /// Record ID.
    pub id: RecordId,
    /// Absolute, canonical path of the indexed file.
    pub file_path: String,
    /// Human- or LLM-provided description of the file.
    pub summary: String,
    /// Class name → ascending-sorted method names.
    pub classes: BTreeMap<String, Vec<String>>,
    /// Ascending-sorted functions not nested in any class.
    pub top_level_functions: Vec<String>,
    /// The file's modification time (seconds since epoch) at indexing.
    pub last_modified: f64,
}

impl CodeIndexEntry {
    /// Create an entry with no symbols.
    pub fn new(file_path: impl Into<String>, summary: impl Into<String>, last_modified: f64) -> Self {
        Self {
            id: RecordId::new(),
            file_path: file_path.into(),
            summary: summary.into(),
            classes: BTreeMap::new(),
            top_level_functions: Vec::new(),
            last_modified,
        }
    }

    /// Attach a symbol map. Method and function lists are sorted here so
    /// stored entries are deterministic regardless of extraction order.
    pub fn with_symbols(
        mut self,
        classes: BTreeMap<String, Vec<String>>,
        top_level_functions: Vec<String>,
    ) -> Self {
        self.classes = classes;
        for methods in self.classes.values_mut() {
            methods.sort();
        }
        self.top_level_functions = top_level_functions;
        self.top_level_functions.sort();
        self
    }

    /// The text that gets embedded for this record.
    ///
    /// Symbol names are folded into the embedding input so a query like
    /// "Greeter class" can reach the file through vector similarity
    /// rather than substring match.
    pub fn embedding_text(&self) -> String {
        let mut text = format!("Summary: {}", self.summary);

        if !self.classes.is_empty() {
            let class_names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
            text.push_str(&format!(" Classes: {}", class_names.join(", ")));

            let methods: Vec<&str> = self
                .classes
                .values()
                .flatten()
                .map(String::as_str)
                .collect();
            if !methods.is_empty() {
                text.push_str(&format!(" Methods: {}", methods.join(", ")));
            }
        }

        if !self.top_level_functions.is_empty() {
            let functions: Vec<&str> = self
                .top_level_functions
                .iter()
                .map(String::as_str)
                .collect();
            text.push_str(&format!(" Functions: {}", functions.join(", ")));
        }

        text
    }

    /// Whether the indexed file has been modified since indexing.
    ///
    /// Stale iff the file currently exists and its on-disk mtime is
    /// strictly greater than the stored `last_modified`. A vanished file
    /// is not stale (see [`is_missing`](Self::is_missing)).
    pub fn is_stale(&self) -> bool {
        match current_mtime(Path::new(&self.file_path)) {
            Some(mtime) => mtime > self.last_modified,
            None => false,
        }
    }

    /// Whether the indexed file no longer exists on disk.
    pub fn is_missing(&self) -> bool {
        !Path::new(&self.file_path).exists()
    }

    /// Render the symbol map as indented text: top-level functions first,
    /// then each class with its methods one level deeper. A class with no
    /// methods gets an explicit marker instead of an empty line.
    pub fn render_symbols(&self, indent: &str) -> String {
        let mut lines = Vec::new();

        if !self.top_level_functions.is_empty() {
            lines.push(format!(
                "{}Functions: {}",
                indent,
                self.top_level_functions.join(", ")
            ));
        }

        for (class, methods) in &self.classes {
            lines.push(format!("{}Class {}:", indent, class));
            if methods.is_empty() {
                lines.push(format!("{}  (no methods)", indent));
            } else {
                lines.push(format!("{}  Methods: {}", indent, methods.join(", ")));
            }
        }

        lines.join("\n")
    }
}

/// Modification time of a file as fractional seconds since the epoch, or
/// `None` if the file is gone or its mtime is unreadable.
pub fn current_mtime(path: &Path) -> Option<f64> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    let duration = modified.duration_since(UNIX_EPOCH).ok()?;
    Some(duration.as_secs_f64())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
