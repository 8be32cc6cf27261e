//! Episode insert and delete operations.

use rusqlite::params;
use tracing::debug;

use crate::error::{MemoryError, Result};
use crate::schema::CollectionKind;
use crate::types::{Episode, EpisodeResult, RecordId};
use crate::validation::{validate_embedding_result, validate_episode};
use crate::vector;

use super::MemoryStore;

/// Which field an episode deletion request probes.
///
/// Deletion matches against the goal when the request carries one, and
/// falls back to the summary otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeDeleteKey {
    /// Substring match against the goal field.
    Goal(String),
    /// Substring match against the summary field.
    Summary(String),
}

impl MemoryStore {
    /// Insert an episode unconditionally.
    pub fn insert_episode(&self, episode: &Episode, embedding: &[f32]) -> Result<()> {
        validate_episode(episode)?;
        validate_embedding_result(embedding, self.dimensions())?;

        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO episodes (id, goal, summary, result, category, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                episode.id.to_string(),
                episode.goal,
                episode.summary,
                episode.result.as_str(),
                episode.category,
                episode.timestamp,
            ],
        )?;
        vector::store_embedding(&conn, CollectionKind::Episodes, episode.id, embedding)?;

        debug!("Inserted episode {}", episode.id);
        Ok(())
    }

    /// Delete the first episode matching the request's substring.
    ///
    /// Returns the matched field value, or `None` when no episode matched.
    pub fn delete_episode_matching(&self, key: &EpisodeDeleteKey) -> Result<Option<String>> {
        let (field, needle) = match key {
            EpisodeDeleteKey::Goal(needle) => ("goal", needle.as_str()),
            EpisodeDeleteKey::Summary(needle) => ("summary", needle.as_str()),
        };
        self.delete_first_match(CollectionKind::Episodes, field, needle, "timestamp")
    }

    /// Fetch an episode by ID.
    pub fn get_episode(&self, id: RecordId) -> Result<Option<Episode>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, goal, summary, result, category, timestamp FROM episodes WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id.to_string()])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self::row_to_episode(row)?))
        } else {
            Ok(None)
        }
    }

    /// Convert a database row to an Episode.
    ///
    /// Expected column order: id, goal, summary, result, category, timestamp.
    pub(crate) fn row_to_episode(row: &rusqlite::Row) -> Result<Episode> {
        let id_str: String = row.get(0)?;
        let goal: String = row.get(1)?;
        let summary: String = row.get(2)?;
        let result_str: String = row.get(3)?;
        let category: String = row.get(4)?;
        let timestamp: f64 = row.get(5)?;

        let result = EpisodeResult::parse(&result_str).ok_or_else(|| {
            MemoryError::InvalidData(format!("Unknown episode result: {}", result_str))
        })?;

        Ok(Episode {
            id: RecordId::parse(&id_str)?,
            goal,
            summary,
            result,
            category,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> MemoryStore {
        MemoryStore::open_in_memory(4).unwrap()
    }

    fn embedding() -> Vec<f32> {
        vec![0.1, 0.2, 0.3, 0.4]
    }

    fn sample_episode() -> Episode {
        Episode::new(
            "Fix login bug",
            "Added a null check in the auth handler",
            EpisodeResult::Success,
            "code",
        )
    }

    #[test]
    fn test_insert_and_get() {
        let store = create_test_store();

        let episode = sample_episode();
        store.insert_episode(&episode, &embedding()).unwrap();

        let fetched = store.get_episode(episode.id).unwrap().unwrap();
        assert_eq!(fetched, episode);
    }

    #[test]
    fn test_insert_rejects_missing_goal() {
        let store = create_test_store();

        let episode = Episode::new("", "summary", EpisodeResult::Failure, "test");
        assert!(store.insert_episode(&episode, &embedding()).is_err());
    }

    #[test]
    fn test_delete_by_goal() {
        let store = create_test_store();
        store.insert_episode(&sample_episode(), &embedding()).unwrap();

        let deleted = store
            .delete_episode_matching(&EpisodeDeleteKey::Goal("login".to_string()))
            .unwrap();
        assert_eq!(deleted.as_deref(), Some("Fix login bug"));
        assert_eq!(store.count(CollectionKind::Episodes).unwrap(), 0);
    }

    #[test]
    fn test_delete_by_summary_fallback() {
        let store = create_test_store();
        store.insert_episode(&sample_episode(), &embedding()).unwrap();

        let deleted = store
            .delete_episode_matching(&EpisodeDeleteKey::Summary("null check".to_string()))
            .unwrap();
        assert_eq!(
            deleted.as_deref(),
            Some("Added a null check in the auth handler")
        );
        assert_eq!(store.count(CollectionKind::Episodes).unwrap(), 0);
    }

    #[test]
    fn test_delete_no_match_reports_none() {
        let store = create_test_store();
        store.insert_episode(&sample_episode(), &embedding()).unwrap();

        let deleted = store
            .delete_episode_matching(&EpisodeDeleteKey::Goal("unrelated".to_string()))
            .unwrap();
        assert!(deleted.is_none());
        assert_eq!(store.count(CollectionKind::Episodes).unwrap(), 1);
    }

    #[test]
    fn test_delete_removes_one_of_near_duplicates() {
        let store = create_test_store();

        store
            .insert_episode(
                &Episode::new("Deploy service A", "ok", EpisodeResult::Success, "ops"),
                &embedding(),
            )
            .unwrap();
        store
            .insert_episode(
                &Episode::new("Deploy service B", "ok", EpisodeResult::Partial, "ops"),
                &embedding(),
            )
            .unwrap();

        store
            .delete_episode_matching(&EpisodeDeleteKey::Goal("Deploy service".to_string()))
            .unwrap();
        assert_eq!(store.count(CollectionKind::Episodes).unwrap(), 1);
    }
}
