//! Code index upsert and delete operations.

use std::collections::BTreeMap;

use rusqlite::params;
use tracing::debug;

use crate::error::Result;
use crate::schema::CollectionKind;
use crate::types::{CodeIndexEntry, RecordId};
use crate::validation::{validate_code_entry, validate_embedding_result};
use crate::vector;

use super::MemoryStore;

impl MemoryStore {
    /// Insert or replace the index entry for a file path.
    ///
    /// `file_path` is the de facto unique key: any existing row for the
    /// path is deleted first (zero matches is a no-op, not an error), then
    /// the new row is inserted. The collection never holds two rows for
    /// the same path.
    pub fn upsert_code_entry(&self, entry: &CodeIndexEntry, embedding: &[f32]) -> Result<()> {
        validate_code_entry(entry)?;
        validate_embedding_result(embedding, self.dimensions())?;

        let classes_json = serde_json::to_string(&entry.classes)?;
        let functions_json = serde_json::to_string(&entry.top_level_functions)?;

        let conn = self.conn.lock().unwrap();

        let replaced = Self::delete_where(
            &conn,
            CollectionKind::CodeIndex,
            &crate::predicate::Predicate::eq("file_path", entry.file_path.as_str()),
        )?;

        conn.execute(
            r#"
            INSERT INTO code_index (id, file_path, summary, classes, top_level_functions, last_modified)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.id.to_string(),
                entry.file_path,
                entry.summary,
                classes_json,
                functions_json,
                entry.last_modified,
            ],
        )?;
        vector::store_embedding(&conn, CollectionKind::CodeIndex, entry.id, embedding)?;

        debug!(
            "Indexed {} (replaced {} prior row(s))",
            entry.file_path, replaced
        );
        Ok(())
    }

    /// Delete the index entry for an absolute path. Returns whether a row
    /// existed. Errors surface; zero matches is reported, not raised.
    pub fn delete_code_entry(&self, file_path: &str) -> Result<bool> {
        let removed = self.delete_by_exact_key(CollectionKind::CodeIndex, "file_path", file_path)?;
        Ok(removed > 0)
    }

    /// Convert a database row to a CodeIndexEntry.
    ///
    /// Expected column order: id, file_path, summary, classes,
    /// top_level_functions, last_modified.
    pub(crate) fn row_to_code_entry(row: &rusqlite::Row) -> Result<CodeIndexEntry> {
        let id_str: String = row.get(0)?;
        let file_path: String = row.get(1)?;
        let summary: String = row.get(2)?;
        let classes_json: String = row.get(3)?;
        let functions_json: String = row.get(4)?;
        let last_modified: f64 = row.get(5)?;

        let classes: BTreeMap<String, Vec<String>> = serde_json::from_str(&classes_json)?;
        let top_level_functions: Vec<String> = serde_json::from_str(&functions_json)?;

        Ok(CodeIndexEntry {
            id: RecordId::parse(&id_str)?,
            file_path,
            summary,
            classes,
            top_level_functions,
            last_modified,
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

    fn entry_for(path: &str, summary: &str) -> CodeIndexEntry {
        CodeIndexEntry::new(path, summary, 100.0)
    }

    #[test]
    fn test_upsert_then_lookup() {
        let store = create_test_store();

        let mut classes = BTreeMap::new();
        classes.insert("Greeter".to_string(), vec!["greet".to_string(), "hello".to_string()]);
        let entry = entry_for("/tmp/main.py", "Main entry point")
            .with_symbols(classes, vec!["main".to_string()]);

        store.upsert_code_entry(&entry, &embedding()).unwrap();

        let rows = store.lookup_by_path("/tmp/main.py").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], entry);
    }

    #[test]
    fn test_upsert_is_idempotent_per_path() {
        let store = create_test_store();

        store
            .upsert_code_entry(&entry_for("/tmp/a.py", "first"), &embedding())
            .unwrap();
        store
            .upsert_code_entry(&entry_for("/tmp/a.py", "second"), &embedding())
            .unwrap();

        let rows = store.lookup_by_path("/tmp/a.py").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary, "second");
        assert_eq!(store.count(CollectionKind::CodeIndex).unwrap(), 1);

        // The replaced row's embedding went with it.
        let conn = store.conn.lock().unwrap();
        assert_eq!(
            vector::count_embeddings(&conn, CollectionKind::CodeIndex).unwrap(),
            1
        );
    }

    #[test]
    fn test_upsert_path_with_quote() {
        let store = create_test_store();

        let path = "/tmp/o'brien/util.py";
        store
            .upsert_code_entry(&entry_for(path, "quoted path"), &embedding())
            .unwrap();
        store
            .upsert_code_entry(&entry_for(path, "replaced"), &embedding())
            .unwrap();

        let rows = store.lookup_by_path(path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary, "replaced");
    }

    #[test]
    fn test_delete_code_entry() {
        let store = create_test_store();

        store
            .upsert_code_entry(&entry_for("/tmp/a.py", "s"), &embedding())
            .unwrap();

        assert!(store.delete_code_entry("/tmp/a.py").unwrap());
        assert!(!store.delete_code_entry("/tmp/a.py").unwrap());
        assert_eq!(store.count(CollectionKind::CodeIndex).unwrap(), 0);
    }

    #[test]
    fn test_distinct_paths_coexist() {
        let store = create_test_store();

        store
            .upsert_code_entry(&entry_for("/tmp/a.py", "a"), &embedding())
            .unwrap();
        store
            .upsert_code_entry(&entry_for("/tmp/b.py", "b"), &embedding())
            .unwrap();

        assert_eq!(store.count(CollectionKind::CodeIndex).unwrap(), 2);
    }
}
