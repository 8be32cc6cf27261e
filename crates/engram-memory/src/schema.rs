//! Collection schema registry.
//!
//! Defines the row shape this build expects for each collection. The store
//! compares these shapes against the live database to decide whether a
//! destructive migration is needed (see `MemoryStore::migrate_if_needed`).
//!
//! Collections are a closed set, so "unknown collection name" is
//! unrepresentable: callers address them through [`CollectionKind`].

// ─────────────────────────────────────────────────────────────────────────────
// Collection Kind
// ─────────────────────────────────────────────────────────────────────────────

/// The three persisted collection kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Standalone facts.
    Facts,
    /// Episodic task summaries.
    Episodes,
    /// Per-file code index entries.
    CodeIndex,
}

impl CollectionKind {
    /// The collection name, which is also the metadata table name.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Facts => "facts",
            Self::Episodes => "episodes",
            Self::CodeIndex => "code_index",
        }
    }

    /// Name of the paired vec0 virtual table holding row embeddings.
    pub fn vector_table(&self) -> &'static str {
        match self {
            Self::Facts => "facts_vec",
            Self::Episodes => "episodes_vec",
            Self::CodeIndex => "code_index_vec",
        }
    }

    /// All collection kinds, in creation order.
    pub fn all() -> [CollectionKind; 3] {
        [Self::Facts, Self::Episodes, Self::CodeIndex]
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Expected Shapes
// ─────────────────────────────────────────────────────────────────────────────

/// A column in a collection's metadata table.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Column name.
    pub name: &'static str,
    /// Column type and constraints as they appear in the CREATE TABLE.
    pub sql_type: &'static str,
}

/// The expected shape of a collection.
#[derive(Debug, Clone, Copy)]
pub struct CollectionSchema {
    /// Which collection this shape describes.
    pub kind: CollectionKind,
    /// Metadata columns, in declaration order. The embedding lives in the
    /// paired vector table and is not listed here.
    pub fields: &'static [FieldDef],
    /// Structural encoding tag for nested fields. Bumped when the JSON
    /// encoding of a column changes shape (e.g. `classes` moving from a
    /// flat list to a class→methods mapping), which column presence alone
    /// cannot detect.
    pub encoding: &'static str,
}

const FACTS_FIELDS: &[FieldDef] = &[
    FieldDef { name: "id", sql_type: "TEXT PRIMARY KEY" },
    FieldDef { name: "content", sql_type: "TEXT NOT NULL" },
    FieldDef { name: "timestamp", sql_type: "REAL NOT NULL" },
];

const EPISODES_FIELDS: &[FieldDef] = &[
    FieldDef { name: "id", sql_type: "TEXT PRIMARY KEY" },
    FieldDef { name: "goal", sql_type: "TEXT NOT NULL" },
    FieldDef { name: "summary", sql_type: "TEXT NOT NULL" },
    FieldDef { name: "result", sql_type: "TEXT NOT NULL" },
    FieldDef { name: "category", sql_type: "TEXT NOT NULL" },
    FieldDef { name: "timestamp", sql_type: "REAL NOT NULL" },
];

const CODE_INDEX_FIELDS: &[FieldDef] = &[
    FieldDef { name: "id", sql_type: "TEXT PRIMARY KEY" },
    FieldDef { name: "file_path", sql_type: "TEXT NOT NULL" },
    FieldDef { name: "summary", sql_type: "TEXT NOT NULL" },
    FieldDef { name: "classes", sql_type: "TEXT NOT NULL DEFAULT '{}'" },
    FieldDef { name: "top_level_functions", sql_type: "TEXT NOT NULL DEFAULT '[]'" },
    FieldDef { name: "last_modified", sql_type: "REAL NOT NULL" },
];

const FACTS_SCHEMA: CollectionSchema = CollectionSchema {
    kind: CollectionKind::Facts,
    fields: FACTS_FIELDS,
    encoding: "fact-v1",
};

const EPISODES_SCHEMA: CollectionSchema = CollectionSchema {
    kind: CollectionKind::Episodes,
    fields: EPISODES_FIELDS,
    encoding: "episode-v1",
};

// v1 encoded symbols as a single flat list; v2 splits them into a
// class→methods mapping plus a top-level function list.
const CODE_INDEX_SCHEMA: CollectionSchema = CollectionSchema {
    kind: CollectionKind::CodeIndex,
    fields: CODE_INDEX_FIELDS,
    encoding: "code-index-v2-classes-map",
};

/// The shape this build expects for a collection.
pub fn expected_shape(kind: CollectionKind) -> &'static CollectionSchema {
    match kind {
        CollectionKind::Facts => &FACTS_SCHEMA,
        CollectionKind::Episodes => &EPISODES_SCHEMA,
        CollectionKind::CodeIndex => &CODE_INDEX_SCHEMA,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        assert_eq!(CollectionKind::Facts.table(), "facts");
        assert_eq!(CollectionKind::Episodes.table(), "episodes");
        assert_eq!(CollectionKind::CodeIndex.table(), "code_index");
    }

    #[test]
    fn test_vector_table_names_distinct() {
        for kind in CollectionKind::all() {
            assert_ne!(kind.table(), kind.vector_table());
        }
    }

    #[test]
    fn test_expected_shape_fields() {
        let shape = expected_shape(CollectionKind::CodeIndex);
        let names: Vec<_> = shape.fields.iter().map(|f| f.name).collect();
        assert!(names.contains(&"classes"));
        assert!(names.contains(&"top_level_functions"));
        assert!(names.contains(&"last_modified"));
    }

    #[test]
    fn test_every_shape_has_id_first() {
        for kind in CollectionKind::all() {
            assert_eq!(expected_shape(kind).fields[0].name, "id");
        }
    }
}
