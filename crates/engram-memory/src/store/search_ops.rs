//! Nearest-neighbor recall and exact path lookup.
//!
//! Vector searches are best-effort: any underlying engine failure
//! (including a missing collection) degrades to an empty result with a
//! warning. Path lookup is a user-facing diagnostic and propagates
//! everything except a missing collection, which reads as empty.

use rusqlite::params;
use tracing::{debug, warn};

use crate::error::Result;
use crate::paths::absolute_path;
use crate::schema::CollectionKind;
use crate::types::{CodeIndexEntry, Episode, Fact, RecordId};
use crate::vector;

use super::MemoryStore;

/// A recalled record with its distance from the query vector.
///
/// Hits arrive in the engine's own ascending-distance order; no local
/// re-ranking is applied.
#[derive(Debug, Clone)]
pub struct SearchHit<T> {
    /// The matched record.
    pub record: T,
    /// Distance from the query vector (lower = more similar).
    pub distance: f32,
}

impl MemoryStore {
    /// Nearest facts to a query embedding. Best-effort.
    pub fn search_facts(&self, query_embedding: &[f32], limit: usize) -> Vec<SearchHit<Fact>> {
        match self.try_search(CollectionKind::Facts, query_embedding, limit, |conn, id| {
            Self::get_fact_locked(conn, id)
        }) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Fact search degraded to empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Nearest episodes to a query embedding. Best-effort.
    pub fn search_episodes(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Vec<SearchHit<Episode>> {
        match self.try_search(CollectionKind::Episodes, query_embedding, limit, |conn, id| {
            Self::get_episode_locked(conn, id)
        }) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Episode search degraded to empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Nearest code index entries to a query embedding. Best-effort.
    pub fn search_code(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Vec<SearchHit<CodeIndexEntry>> {
        match self.try_search(CollectionKind::CodeIndex, query_embedding, limit, |conn, id| {
            Self::get_code_entry_locked(conn, id)
        }) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Code search degraded to empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Exact-match lookup of code index entries by file path.
    ///
    /// The path is absolutized and escaped identically to the upsert key,
    /// so a round trip always finds its own row. Normally returns zero or
    /// one row, given the upsert invariant.
    pub fn lookup_by_path(&self, path: impl AsRef<std::path::Path>) -> Result<Vec<CodeIndexEntry>> {
        let key = absolute_path(path)?;
        let predicate = crate::predicate::Predicate::eq("file_path", key.as_str());

        let result = (|| {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare(&format!(
                "SELECT id, file_path, summary, classes, top_level_functions, last_modified \
                 FROM code_index WHERE {}",
                predicate.to_sql()
            ))?;
            let mut rows = stmt.query([])?;

            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(Self::row_to_code_entry(row)?);
            }
            Ok(entries)
        })();

        let entries = Self::recover_missing_collection(result)?;
        debug!("Path lookup {:?} matched {} row(s)", key, entries.len());
        Ok(entries)
    }

    /// Two-step recall: nearest record IDs from the vector table, then a
    /// row fetch per ID. A row deleted between the two steps is skipped.
    fn try_search<T>(
        &self,
        kind: CollectionKind,
        query_embedding: &[f32],
        limit: usize,
        fetch: impl Fn(&rusqlite::Connection, RecordId) -> Result<Option<T>>,
    ) -> Result<Vec<SearchHit<T>>> {
        let conn = self.conn.lock().unwrap();
        let nearest = vector::search_nearest(&conn, kind, query_embedding, limit)?;

        let mut hits = Vec::with_capacity(nearest.len());
        for result in nearest {
            if let Some(record) = fetch(&conn, result.record_id)? {
                hits.push(SearchHit {
                    record,
                    distance: result.distance,
                });
            }
        }
        Ok(hits)
    }

    fn get_fact_locked(conn: &rusqlite::Connection, id: RecordId) -> Result<Option<Fact>> {
        let mut stmt = conn.prepare("SELECT id, content, timestamp FROM facts WHERE id = ?1")?;
        let mut rows = stmt.query(params![id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_fact(row)?)),
            None => Ok(None),
        }
    }

    fn get_episode_locked(conn: &rusqlite::Connection, id: RecordId) -> Result<Option<Episode>> {
        let mut stmt = conn.prepare(
            "SELECT id, goal, summary, result, category, timestamp FROM episodes WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_episode(row)?)),
            None => Ok(None),
        }
    }

    fn get_code_entry_locked(
        conn: &rusqlite::Connection,
        id: RecordId,
    ) -> Result<Option<CodeIndexEntry>> {
        let mut stmt = conn.prepare(
            "SELECT id, file_path, summary, classes, top_level_functions, last_modified \
             FROM code_index WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_code_entry(row)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EpisodeResult;

    fn create_test_store() -> MemoryStore {
        MemoryStore::open_in_memory(4).unwrap()
    }

    #[test]
    fn test_search_orders_by_distance() {
        let store = create_test_store();

        let near = Fact::new("near");
        let far = Fact::new("far");
        store.insert_fact(&near, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        store.insert_fact(&far, &[0.0, 0.0, 1.0, 0.0]).unwrap();

        let hits = store.search_facts(&[0.9, 0.1, 0.0, 0.0], 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.content, "near");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn test_search_respects_limit() {
        let store = create_test_store();

        for i in 0..5 {
            store
                .insert_fact(&Fact::new(format!("fact {}", i)), &[i as f32, 0.0, 0.0, 0.0])
                .unwrap();
        }

        let hits = store.search_facts(&[0.0, 0.0, 0.0, 0.0], 3);
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_search_missing_collection_is_empty() {
        let store = create_test_store();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute_batch("DROP TABLE facts; DROP TABLE facts_vec;")
                .unwrap();
        }

        let hits = store.search_facts(&[0.0, 0.0, 0.0, 0.0], 5);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_search_episodes_roundtrip() {
        let store = create_test_store();

        let episode = Episode::new("Ship release", "Tagged and pushed", EpisodeResult::Success, "ops");
        store.insert_episode(&episode, &[0.5, 0.5, 0.0, 0.0]).unwrap();

        let hits = store.search_episodes(&[0.5, 0.5, 0.0, 0.0], 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record, episode);
    }

    #[test]
    fn test_lookup_by_path_exact_only() {
        let store = create_test_store();

        let entry = CodeIndexEntry::new("/tmp/app/main.py", "entry point", 1.0);
        store.upsert_code_entry(&entry, &[0.1, 0.2, 0.3, 0.4]).unwrap();

        assert_eq!(store.lookup_by_path("/tmp/app/main.py").unwrap().len(), 1);
        // Substrings and other paths do not match.
        assert!(store.lookup_by_path("/tmp/app").unwrap().is_empty());
        assert!(store.lookup_by_path("/tmp/app/other.py").unwrap().is_empty());
    }

    #[test]
    fn test_lookup_by_path_missing_collection_is_empty() {
        let store = create_test_store();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute_batch("DROP TABLE code_index; DROP TABLE code_index_vec;")
                .unwrap();
        }

        assert!(store.lookup_by_path("/tmp/a.py").unwrap().is_empty());
    }
}
