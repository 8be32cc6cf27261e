//! Fact insert and delete operations.

use rusqlite::params;
use tracing::debug;

use crate::error::Result;
use crate::schema::CollectionKind;
use crate::types::{Fact, RecordId};
use crate::validation::{validate_embedding_result, validate_fact};
use crate::vector;

use super::MemoryStore;

impl MemoryStore {
    /// Insert a fact unconditionally. No uniqueness is enforced;
    /// duplicates are permitted.
    pub fn insert_fact(&self, fact: &Fact, embedding: &[f32]) -> Result<()> {
        validate_fact(fact)?;
        validate_embedding_result(embedding, self.dimensions())?;

        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO facts (id, content, timestamp) VALUES (?1, ?2, ?3)",
            params![fact.id.to_string(), fact.content, fact.timestamp],
        )?;
        vector::store_embedding(&conn, CollectionKind::Facts, fact.id, embedding)?;

        debug!("Inserted fact {}", fact.id);
        Ok(())
    }

    /// Delete the first fact whose content contains `needle`.
    ///
    /// Returns the deleted content, or `None` when no fact matched.
    pub fn delete_fact_matching(&self, needle: &str) -> Result<Option<String>> {
        self.delete_first_match(CollectionKind::Facts, "content", needle, "timestamp")
    }

    /// Fetch a fact by ID.
    pub fn get_fact(&self, id: RecordId) -> Result<Option<Fact>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt =
            conn.prepare("SELECT id, content, timestamp FROM facts WHERE id = ?1")?;
        let mut rows = stmt.query(params![id.to_string()])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self::row_to_fact(row)?))
        } else {
            Ok(None)
        }
    }

    /// Convert a database row to a Fact.
    ///
    /// Expected column order: id, content, timestamp.
    pub(crate) fn row_to_fact(row: &rusqlite::Row) -> Result<Fact> {
        let id_str: String = row.get(0)?;
        let content: String = row.get(1)?;
        let timestamp: f64 = row.get(2)?;

        Ok(Fact {
            id: RecordId::parse(&id_str)?,
            content,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemoryError;

    fn create_test_store() -> MemoryStore {
        MemoryStore::open_in_memory(4).unwrap()
    }

    fn embedding() -> Vec<f32> {
        vec![0.1, 0.2, 0.3, 0.4]
    }

    #[test]
    fn test_insert_and_get() {
        let store = create_test_store();

        let fact = Fact::new("User prefers dark mode");
        store.insert_fact(&fact, &embedding()).unwrap();

        let fetched = store.get_fact(fact.id).unwrap().unwrap();
        assert_eq!(fetched, fact);
    }

    #[test]
    fn test_duplicates_permitted() {
        let store = create_test_store();

        store.insert_fact(&Fact::new("same text"), &embedding()).unwrap();
        store.insert_fact(&Fact::new("same text"), &embedding()).unwrap();

        assert_eq!(store.count(CollectionKind::Facts).unwrap(), 2);
    }

    #[test]
    fn test_insert_rejects_wrong_dimension() {
        let store = create_test_store();

        let result = store.insert_fact(&Fact::new("x"), &[0.1, 0.2]);
        assert!(matches!(result, Err(MemoryError::InvalidData(_))));
        assert_eq!(store.count(CollectionKind::Facts).unwrap(), 0);
    }

    #[test]
    fn test_insert_rejects_empty_content() {
        let store = create_test_store();

        let mut fact = Fact::new("x");
        fact.content = String::new();
        let result = store.insert_fact(&fact, &embedding());
        assert!(matches!(result, Err(MemoryError::InvalidData(_))));
    }

    #[test]
    fn test_selective_deletion() {
        let store = create_test_store();

        store
            .insert_fact(&Fact::new("Selective Match 1"), &embedding())
            .unwrap();
        store
            .insert_fact(&Fact::new("Selective Match 2"), &embedding())
            .unwrap();

        // First call removes exactly one of the two, whichever the engine
        // returned first.
        let deleted = store.delete_fact_matching("Selective Match").unwrap();
        assert!(deleted.is_some());
        assert_eq!(store.count(CollectionKind::Facts).unwrap(), 1);

        // Second call removes the survivor.
        let deleted = store.delete_fact_matching("Selective Match").unwrap();
        assert!(deleted.is_some());
        assert_eq!(store.count(CollectionKind::Facts).unwrap(), 0);

        // Third call has nothing left to match.
        assert!(store.delete_fact_matching("Selective Match").unwrap().is_none());
    }

    #[test]
    fn test_delete_with_embedded_quotes() {
        let store = create_test_store();

        store
            .insert_fact(&Fact::new("O'Brien's note"), &embedding())
            .unwrap();

        let deleted = store.delete_fact_matching("O'Brien").unwrap();
        assert_eq!(deleted.as_deref(), Some("O'Brien's note"));
        assert_eq!(store.count(CollectionKind::Facts).unwrap(), 0);
    }

    #[test]
    fn test_delete_removes_embedding_too() {
        let store = create_test_store();

        store.insert_fact(&Fact::new("note"), &embedding()).unwrap();
        store.delete_fact_matching("note").unwrap();

        let conn = store.conn.lock().unwrap();
        assert_eq!(
            vector::count_embeddings(&conn, CollectionKind::Facts).unwrap(),
            0
        );
    }
}
