//! Store engine: collection lifecycle, upsert/delete protocol, migration.
//!
//! One SQLite file holds every collection: a metadata table plus a paired
//! vec0 virtual table per collection kind, and a `meta` key/value table
//! recording structural encoding tags and embedding dimensions. The store
//! exclusively owns collection lifecycle (create, open, drop, recreate).
//!
//! # Migration
//!
//! Schema version is implicit in column presence plus the recorded
//! encoding tag. When the live shape of a collection no longer matches
//! what this build expects, [`MemoryStore::migrate_if_needed`] drops and
//! recreates the collection empty. This discards prior data by design —
//! there is no field backfill — and is logged loudly when it happens.

mod code_ops;
mod episode_ops;
mod fact_ops;
mod search_ops;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags, params};
use tracing::{debug, info, warn};

use crate::error::{MemoryError, Result};
use crate::predicate::Predicate;
use crate::schema::{CollectionKind, expected_shape};
use crate::vector;

pub use episode_ops::EpisodeDeleteKey;
pub use search_ops::SearchHit;

// ─────────────────────────────────────────────────────────────────────────────
// Memory Store
// ─────────────────────────────────────────────────────────────────────────────

/// Persistent record store backed by SQLite with sqlite-vec.
///
/// Uses WAL mode for better concurrent read performance; all connection
/// access is serialized through a mutex.
pub struct MemoryStore {
    /// The SQLite connection (wrapped in Mutex for thread safety).
    pub(crate) conn: Mutex<Connection>,
    /// Embedding dimension every stored vector must match.
    dims: usize,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("dims", &self.dims)
            .finish_non_exhaustive()
    }
}

/// Collection row counts and deployment parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of stored facts.
    pub fact_count: usize,
    /// Number of stored episodes.
    pub episode_count: usize,
    /// Number of stored code index entries.
    pub code_entry_count: usize,
    /// Embedding dimension for this deployment.
    pub dimensions: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Initialization
// ─────────────────────────────────────────────────────────────────────────────

impl MemoryStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the database file, every collection, and runs migration
    /// where the live shape no longer matches this build.
    pub fn open(path: impl AsRef<Path>, dims: usize) -> Result<Self> {
        vector::init_vector_extension();

        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let store = Self {
            conn: Mutex::new(conn),
            dims,
        };
        store.initialize()?;

        info!("Memory store opened at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory(dims: usize) -> Result<Self> {
        vector::init_vector_extension();

        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            dims,
        };
        store.initialize()?;

        debug!("In-memory store created");
        Ok(store)
    }

    /// Embedding dimension every stored vector must match.
    pub fn dimensions(&self) -> usize {
        self.dims
    }

    /// Initialize pragmas, the meta table, and every collection.
    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        // WAL for better concurrent reads; the substring-deletion protocol
        // requires LIKE to be case-sensitive.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "case_sensitive_like", true)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        drop(conn);

        self.check_dimensions()?;
        for kind in CollectionKind::all() {
            self.migrate_if_needed(kind)?;
        }

        Ok(())
    }

    /// Verify the recorded embedding dimension matches this deployment.
    ///
    /// A dimension change makes every stored vector unusable, so it is
    /// treated like a shape mismatch: all vector tables are dropped and
    /// recreated at the new dimension.
    fn check_dimensions(&self) -> Result<()> {
        let recorded = self.get_meta("embedding.dimensions")?;
        let current = self.dims.to_string();

        if let Some(ref old) = recorded
            && *old != current
        {
            warn!(
                "Embedding dimensions changed ({} -> {}); dropping all vector tables",
                old, current
            );
            let conn = self.conn.lock().unwrap();
            for kind in CollectionKind::all() {
                vector::drop_vector_table(&conn, kind)?;
                conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", kind.table()))?;
            }
            drop(conn);
        }

        if recorded.as_deref() != Some(current.as_str()) {
            self.set_meta("embedding.dimensions", &current)?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Collection Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

impl MemoryStore {
    /// Idempotently create a collection from its registry shape.
    ///
    /// If the collection already exists its rows are left untouched.
    pub fn open_or_create(&self, kind: CollectionKind) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        if !Self::collection_exists(&conn, kind)? {
            self.create_collection(&conn, kind)?;
        }
        Ok(())
    }

    /// Compare the live collection against this build's expected shape and
    /// destructively recreate it on mismatch. Returns whether a migration
    /// happened.
    ///
    /// A missing collection is simply created (not a migration). A shape
    /// mismatch — any expected column absent, or a different structural
    /// encoding tag — drops the collection and its vectors and recreates
    /// both empty. Prior rows in that collection are discarded.
    pub fn migrate_if_needed(&self, kind: CollectionKind) -> Result<bool> {
        let conn = self.conn.lock().unwrap();

        if !Self::collection_exists(&conn, kind)? {
            self.create_collection(&conn, kind)?;
            return Ok(false);
        }

        let live = Self::live_columns(&conn, kind)?;
        let shape = expected_shape(kind);

        let missing: Vec<&str> = shape
            .fields
            .iter()
            .map(|f| f.name)
            .filter(|name| !live.iter().any(|c| c == name))
            .collect();

        let recorded_encoding = Self::meta_value(&conn, &Self::encoding_key(kind))?;
        let encoding_matches = recorded_encoding.as_deref() == Some(shape.encoding);

        if missing.is_empty() && encoding_matches {
            debug!("Collection {} is up to date", kind);
            return Ok(false);
        }

        let discarded: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table()),
            [],
            |row| row.get(0),
        )?;

        warn!(
            "Schema mismatch for {} (missing columns: {:?}, encoding: {:?} -> {:?}); \
             dropping and recreating, discarding {} rows",
            kind, missing, recorded_encoding, shape.encoding, discarded
        );

        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", kind.table()))?;
        vector::drop_vector_table(&conn, kind)?;
        self.create_collection(&conn, kind)?;

        Ok(true)
    }

    /// Create a collection's metadata and vector tables and record its
    /// encoding tag. Caller holds the connection lock.
    fn create_collection(&self, conn: &Connection, kind: CollectionKind) -> Result<()> {
        let shape = expected_shape(kind);

        let columns: Vec<String> = shape
            .fields
            .iter()
            .map(|f| format!("{} {}", f.name, f.sql_type))
            .collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            kind.table(),
            columns.join(", ")
        );
        conn.execute_batch(&sql)?;

        vector::create_vector_table(conn, kind, self.dims)?;

        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![Self::encoding_key(kind), shape.encoding],
        )?;

        info!("Created collection {} ({})", kind, shape.encoding);
        Ok(())
    }

    fn encoding_key(kind: CollectionKind) -> String {
        format!("schema.{}.encoding", kind)
    }

    /// Whether a collection's metadata table exists.
    fn collection_exists(conn: &Connection, kind: CollectionKind) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![kind.table()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Column names of the live metadata table.
    fn live_columns(conn: &Connection, kind: CollectionKind) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", kind.table()))?;
        let mut rows = stmt.query([])?;

        let mut columns = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(1)?;
            columns.push(name);
        }
        Ok(columns)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Deletion Protocol
// ─────────────────────────────────────────────────────────────────────────────

impl MemoryStore {
    /// Delete the first row whose `field` contains `needle`, re-keyed on
    /// the matched row's own exact field values.
    ///
    /// Two steps: a case-sensitive substring probe limited to one row,
    /// then an exact-match delete on `(field, disambiguator)` taken from
    /// the matched row — never from the caller's substring — so deleting
    /// by "Selective Match" when two near-duplicate rows exist removes
    /// only the one actually matched. Which of several matching rows is
    /// "first" is whatever order the backing engine returns.
    ///
    /// Returns the matched field value, or `None` when nothing matched
    /// (not an error).
    pub fn delete_first_match(
        &self,
        kind: CollectionKind,
        field: &'static str,
        needle: &str,
        disambiguator: &'static str,
    ) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();

        // Collection absent on read is recoverable: nothing to delete.
        if !Self::collection_exists(&conn, kind)? {
            return Ok(None);
        }

        let probe = Predicate::contains(field, needle);
        let sql = format!(
            "SELECT {}, {} FROM {} WHERE {} LIMIT 1",
            field,
            disambiguator,
            kind.table(),
            probe.to_sql()
        );

        let matched: Option<(String, f64)> = {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query([])?;
            match rows.next()? {
                Some(row) => Some((row.get(0)?, row.get(1)?)),
                None => None,
            }
        };

        let Some((value, disamb)) = matched else {
            debug!("No {} row matches substring {:?}", kind, needle);
            return Ok(None);
        };

        let exact = Predicate::eq(field, value.as_str()).and_eq(disambiguator, disamb);
        let removed = Self::delete_where(&conn, kind, &exact)?;

        debug!("Deleted {} {} row(s) matching {:?}", removed, kind, value);
        Ok(Some(value))
    }

    /// Delete every row whose `field` exactly equals `value`.
    ///
    /// Used for code index deletion by canonical path. Errors surface;
    /// zero matched rows is reported as 0, not an error.
    pub fn delete_by_exact_key(
        &self,
        kind: CollectionKind,
        field: &'static str,
        value: &str,
    ) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        Self::delete_where(&conn, kind, &Predicate::eq(field, value))
    }

    /// Delete rows matching a predicate from both the metadata table and
    /// the vector table. Returns the number of rows removed.
    pub(crate) fn delete_where(
        conn: &Connection,
        kind: CollectionKind,
        predicate: &Predicate,
    ) -> Result<usize> {
        let where_sql = predicate.to_sql();

        let ids: Vec<String> = {
            let mut stmt = conn.prepare(&format!(
                "SELECT id FROM {} WHERE {}",
                kind.table(),
                where_sql
            ))?;
            let mut rows = stmt.query([])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row.get(0)?);
            }
            ids
        };

        if ids.is_empty() {
            return Ok(0);
        }

        conn.execute(
            &format!("DELETE FROM {} WHERE {}", kind.table(), where_sql),
            [],
        )?;
        for id in &ids {
            conn.execute(
                &format!("DELETE FROM {} WHERE record_id = ?1", kind.vector_table()),
                params![id],
            )?;
        }

        Ok(ids.len())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Utility Operations
// ─────────────────────────────────────────────────────────────────────────────

impl MemoryStore {
    /// Get a metadata value.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        Self::meta_value(&conn, key)
    }

    /// Set a metadata value.
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn meta_value(conn: &Connection, key: &str) -> Result<Option<String>> {
        let mut stmt = conn.prepare("SELECT value FROM meta WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;

        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    /// Number of rows in a collection.
    pub fn count(&self, kind: CollectionKind) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Row counts and deployment parameters.
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            fact_count: self.count(CollectionKind::Facts)?,
            episode_count: self.count(CollectionKind::Episodes)?,
            code_entry_count: self.count(CollectionKind::CodeIndex)?,
            dimensions: self.dims,
        })
    }

    /// Map a rusqlite "no such table" failure to an empty-read recovery.
    ///
    /// Read paths treat a missing collection as an empty result set;
    /// every other error still propagates.
    pub(crate) fn recover_missing_collection<T: Default>(
        result: Result<T>,
    ) -> Result<T> {
        match result {
            Err(MemoryError::Database(rusqlite::Error::SqliteFailure(_, Some(ref msg))))
                if msg.contains("no such table") =>
            {
                Ok(T::default())
            }
            other => other,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Fact;

    fn create_test_store() -> MemoryStore {
        MemoryStore::open_in_memory(4).unwrap()
    }

    fn embedding() -> Vec<f32> {
        vec![0.1, 0.2, 0.3, 0.4]
    }

    #[test]
    fn test_open_creates_all_collections() {
        let store = create_test_store();
        let stats = store.stats().unwrap();
        assert_eq!(stats.fact_count, 0);
        assert_eq!(stats.episode_count, 0);
        assert_eq!(stats.code_entry_count, 0);
        assert_eq!(stats.dimensions, 4);
    }

    #[test]
    fn test_open_or_create_is_idempotent() {
        let store = create_test_store();

        store
            .insert_fact(&Fact::new("kept across reopens"), &embedding())
            .unwrap();

        store.open_or_create(CollectionKind::Facts).unwrap();
        assert_eq!(store.count(CollectionKind::Facts).unwrap(), 1);
    }

    #[test]
    fn test_migrate_if_needed_noop_when_current() {
        let store = create_test_store();
        assert!(!store.migrate_if_needed(CollectionKind::Facts).unwrap());
        assert!(!store.migrate_if_needed(CollectionKind::CodeIndex).unwrap());
    }

    #[test]
    fn test_migrate_drops_old_shape() {
        let store = create_test_store();

        // Simulate a database written by an older build: code_index with a
        // flat symbols list and no top_level_functions column.
        {
            let conn = store.conn.lock().unwrap();
            conn.execute_batch(
                r#"
                DROP TABLE code_index;
                CREATE TABLE code_index (
                    id TEXT PRIMARY KEY,
                    file_path TEXT NOT NULL,
                    summary TEXT NOT NULL,
                    symbols TEXT NOT NULL DEFAULT '[]',
                    last_modified REAL NOT NULL
                );
                INSERT INTO code_index VALUES ('old-id', '/tmp/x.py', 'old row', '[]', 1.0);
                "#,
            )
            .unwrap();
            conn.execute(
                "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema.code_index.encoding', 'code-index-v1')",
                [],
            )
            .unwrap();
        }

        assert!(store.migrate_if_needed(CollectionKind::CodeIndex).unwrap());

        // Old rows are gone; the new shape is in place.
        assert_eq!(store.count(CollectionKind::CodeIndex).unwrap(), 0);
        assert!(!store.migrate_if_needed(CollectionKind::CodeIndex).unwrap());

        // A write against the new shape leaves exactly the new row, never
        // a mix of old- and new-shape rows.
        let entry = crate::types::CodeIndexEntry::new("/tmp/y.py", "new row", 2.0);
        store
            .upsert_code_entry(&entry, &[0.1, 0.2, 0.3, 0.4])
            .unwrap();
        assert_eq!(store.count(CollectionKind::CodeIndex).unwrap(), 1);
        assert_eq!(store.lookup_by_path("/tmp/y.py").unwrap().len(), 1);
    }

    #[test]
    fn test_migrate_on_encoding_tag_change() {
        let store = create_test_store();

        store
            .set_meta("schema.facts.encoding", "fact-v0")
            .unwrap();

        assert!(store.migrate_if_needed(CollectionKind::Facts).unwrap());
        assert_eq!(
            store.get_meta("schema.facts.encoding").unwrap().as_deref(),
            Some("fact-v1")
        );
    }

    #[test]
    fn test_meta_operations() {
        let store = create_test_store();

        assert!(store.get_meta("test_key").unwrap().is_none());

        store.set_meta("test_key", "test_value").unwrap();
        assert_eq!(
            store.get_meta("test_key").unwrap(),
            Some("test_value".to_string())
        );

        store.set_meta("test_key", "new_value").unwrap();
        assert_eq!(
            store.get_meta("test_key").unwrap(),
            Some("new_value".to_string())
        );
    }

    #[test]
    fn test_delete_first_match_nothing_found() {
        let store = create_test_store();
        let deleted = store
            .delete_first_match(CollectionKind::Facts, "content", "absent", "timestamp")
            .unwrap();
        assert!(deleted.is_none());
    }

    #[test]
    fn test_delete_first_match_is_case_sensitive() {
        let store = create_test_store();
        store
            .insert_fact(&Fact::new("Dark Mode preferred"), &embedding())
            .unwrap();

        let deleted = store
            .delete_first_match(CollectionKind::Facts, "content", "dark mode", "timestamp")
            .unwrap();
        assert!(deleted.is_none());
        assert_eq!(store.count(CollectionKind::Facts).unwrap(), 1);
    }
}
