//! Embedding storage and nearest-neighbor search using sqlite-vec.
//!
//! Each collection pairs its metadata table with a vec0 virtual table
//! holding one embedding per record, keyed by record ID. This module owns
//! every statement touching those virtual tables.

use rusqlite::{Connection, params};
use tracing::{debug, info};
use zerocopy::IntoBytes;

use crate::error::Result;
use crate::schema::CollectionKind;
use crate::types::RecordId;

/// Default embedding dimensions (MiniLM-class models produce 384-dim vectors).
pub const DEFAULT_EMBEDDING_DIMS: usize = 384;

/// Initialize the sqlite-vec extension for all connections in the process.
///
/// Must be called before any vector table is created or queried. Uses
/// `sqlite3_auto_extension`, so it applies globally.
pub fn init_vector_extension() {
    use rusqlite::ffi::sqlite3_auto_extension;
    use sqlite_vec::sqlite3_vec_init;

    unsafe {
        #[allow(clippy::missing_transmute_annotations)]
        sqlite3_auto_extension(Some(std::mem::transmute(sqlite3_vec_init as *const ())));
    }
}

/// Check that the sqlite-vec extension is loaded, returning its version.
pub fn check_vector_extension(conn: &Connection) -> Result<String> {
    let version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
    Ok(version)
}

/// Create a collection's vec0 virtual table.
pub fn create_vector_table(conn: &Connection, kind: CollectionKind, dims: usize) -> Result<()> {
    let sql = format!(
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS {} USING vec0(
            record_id TEXT PRIMARY KEY,
            embedding float[{dims}]
        )
        "#,
        kind.vector_table()
    );

    conn.execute_batch(&sql)?;

    debug!("Created {} with {} dimensions", kind.vector_table(), dims);
    Ok(())
}

/// Drop a collection's vec0 virtual table. Used during destructive
/// migration to recreate alongside the metadata table.
pub fn drop_vector_table(conn: &Connection, kind: CollectionKind) -> Result<()> {
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", kind.vector_table()))?;
    info!("Dropped {}", kind.vector_table());
    Ok(())
}

/// Store a record's embedding, replacing any previous one.
pub fn store_embedding(
    conn: &Connection,
    kind: CollectionKind,
    id: RecordId,
    embedding: &[f32],
) -> Result<()> {
    // vec0 doesn't support INSERT OR REPLACE, so delete first if exists
    conn.execute(
        &format!("DELETE FROM {} WHERE record_id = ?1", kind.vector_table()),
        params![id.to_string()],
    )?;

    conn.execute(
        &format!(
            "INSERT INTO {} (record_id, embedding) VALUES (?1, ?2)",
            kind.vector_table()
        ),
        params![id.to_string(), embedding.as_bytes()],
    )?;

    debug!("Stored embedding for {} record {}", kind, id);
    Ok(())
}

/// Delete a record's embedding. Returns whether one existed.
pub fn delete_embedding(conn: &Connection, kind: CollectionKind, id: RecordId) -> Result<bool> {
    let rows = conn.execute(
        &format!("DELETE FROM {} WHERE record_id = ?1", kind.vector_table()),
        params![id.to_string()],
    )?;

    Ok(rows > 0)
}

/// A nearest-neighbor match from the vector table.
#[derive(Debug, Clone)]
pub struct SimilarityResult {
    /// The matched record's ID.
    pub record_id: RecordId,
    /// Distance from the query vector (lower = more similar).
    pub distance: f32,
}

/// Nearest-neighbor search over a collection's embeddings.
///
/// Returns the top-k matches in the engine's own distance order, which is
/// not re-ranked locally.
pub fn search_nearest(
    conn: &Connection,
    kind: CollectionKind,
    query_embedding: &[f32],
    limit: usize,
) -> Result<Vec<SimilarityResult>> {
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT record_id, distance
        FROM {}
        WHERE embedding MATCH ?1
        ORDER BY distance
        LIMIT ?2
        "#,
        kind.vector_table()
    ))?;

    let mut rows = stmt.query(params![query_embedding.as_bytes(), limit as i64])?;

    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        let record_id_str: String = row.get(0)?;
        let distance: f32 = row.get(1)?;

        results.push(SimilarityResult {
            record_id: RecordId::parse(&record_id_str)?,
            distance,
        });
    }

    debug!(
        "Found {} nearest {} records (limit: {})",
        results.len(),
        kind,
        limit
    );
    Ok(results)
}

/// Count of stored embeddings for a collection.
pub fn count_embeddings(conn: &Connection, kind: CollectionKind) -> Result<usize> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", kind.vector_table()),
        [],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_connection() -> Connection {
        init_vector_extension();
        let conn = Connection::open_in_memory().unwrap();
        create_vector_table(&conn, CollectionKind::Facts, 4).unwrap(); // Small dims for testing
        conn
    }

    #[test]
    fn test_vector_extension_loads() {
        init_vector_extension();
        let conn = Connection::open_in_memory().unwrap();
        let version = check_vector_extension(&conn).unwrap();
        assert!(!version.is_empty());
    }

    #[test]
    fn test_store_and_count() {
        let conn = create_test_connection();
        assert_eq!(count_embeddings(&conn, CollectionKind::Facts).unwrap(), 0);

        let id = RecordId::new();
        store_embedding(&conn, CollectionKind::Facts, id, &[0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(count_embeddings(&conn, CollectionKind::Facts).unwrap(), 1);
    }

    #[test]
    fn test_delete_embedding() {
        let conn = create_test_connection();

        let id = RecordId::new();
        store_embedding(&conn, CollectionKind::Facts, id, &[0.1, 0.2, 0.3, 0.4]).unwrap();

        assert!(delete_embedding(&conn, CollectionKind::Facts, id).unwrap());
        assert!(!delete_embedding(&conn, CollectionKind::Facts, id).unwrap());
    }

    #[test]
    fn test_store_replaces_existing() {
        let conn = create_test_connection();

        let id = RecordId::new();
        store_embedding(&conn, CollectionKind::Facts, id, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        store_embedding(&conn, CollectionKind::Facts, id, &[0.0, 1.0, 0.0, 0.0]).unwrap();

        assert_eq!(count_embeddings(&conn, CollectionKind::Facts).unwrap(), 1);

        let results = search_nearest(&conn, CollectionKind::Facts, &[0.0, 1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(results[0].record_id, id);
        assert!(results[0].distance < 0.01);
    }

    #[test]
    fn test_search_nearest_orders_by_distance() {
        let conn = create_test_connection();

        let id1 = RecordId::new();
        let id2 = RecordId::new();
        let id3 = RecordId::new();

        store_embedding(&conn, CollectionKind::Facts, id1, &[1.0, 0.0, 0.0, 0.0]).unwrap();
        store_embedding(&conn, CollectionKind::Facts, id2, &[0.9, 0.1, 0.0, 0.0]).unwrap();
        store_embedding(&conn, CollectionKind::Facts, id3, &[0.0, 0.0, 1.0, 0.0]).unwrap();

        let results = search_nearest(&conn, CollectionKind::Facts, &[1.0, 0.0, 0.0, 0.0], 10).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].record_id, id1);
        assert_eq!(results[1].record_id, id2);
        assert_eq!(results[2].record_id, id3);
    }

    #[test]
    fn test_search_nearest_respects_limit() {
        let conn = create_test_connection();

        for i in 0..5 {
            store_embedding(
                &conn,
                CollectionKind::Facts,
                RecordId::new(),
                &[i as f32, 0.0, 0.0, 0.0],
            )
            .unwrap();
        }

        let results = search_nearest(&conn, CollectionKind::Facts, &[2.5, 0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_collections_are_isolated() {
        let conn = create_test_connection();
        create_vector_table(&conn, CollectionKind::Episodes, 4).unwrap();

        store_embedding(&conn, CollectionKind::Facts, RecordId::new(), &[1.0, 0.0, 0.0, 0.0])
            .unwrap();

        assert_eq!(count_embeddings(&conn, CollectionKind::Facts).unwrap(), 1);
        assert_eq!(count_embeddings(&conn, CollectionKind::Episodes).unwrap(), 0);
    }
}
