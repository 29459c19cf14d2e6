//! Database schema definitions
//!
//! Each collection is a table holding the record's JSON body next to its
//! primary key. Secondary indexes are expression indexes over JSON fields,
//! so index entries are always derived from the stored body.

/// Name of the database, used for the default file name
pub const DATABASE_NAME: &str = "EguruDB";

/// Schema version this build of the store expects
pub const SCHEMA_VERSION: u32 = 1;

/// A secondary index over one or more top-level record fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSchema {
    pub name: &'static str,
    pub key_path: &'static [&'static str],
    pub unique: bool,
}

impl IndexSchema {
    /// SQLite index name, e.g. `idx_progress_userId_lessonId`
    pub fn sql_name(&self, collection: &str) -> String {
        format!("idx_{}_{}", collection, self.name)
    }

    /// `CREATE [UNIQUE] INDEX IF NOT EXISTS` for this index
    pub fn create_sql(&self, collection: &str) -> String {
        let columns: Vec<String> = self.key_path.iter().map(|f| field_expr(f)).collect();
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
            if self.unique { "UNIQUE " } else { "" },
            self.sql_name(collection),
            collection,
            columns.join(", ")
        )
    }

    /// WHERE clause matching every key part, with parameters `?1..?n`.
    ///
    /// Uses the same expressions as `create_sql` so SQLite picks the index.
    pub fn where_clause(&self) -> String {
        self.key_path
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ?{}", field_expr(f), i + 1))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// A collection (table) of one record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub indexes: &'static [IndexSchema],
}

impl CollectionSchema {
    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    id TEXT PRIMARY KEY NOT NULL,\n    data TEXT NOT NULL\n)",
            self.name
        )
    }
}

fn field_expr(field: &str) -> String {
    format!("json_extract(data, '$.{}')", field)
}

pub const LESSONS: CollectionSchema = CollectionSchema {
    name: "lessons",
    indexes: &[
        IndexSchema { name: "subject", key_path: &["subject"], unique: false },
        IndexSchema { name: "type", key_path: &["type"], unique: false },
        IndexSchema { name: "level", key_path: &["level"], unique: false },
    ],
};

pub const PROGRESS: CollectionSchema = CollectionSchema {
    name: "progress",
    indexes: &[
        IndexSchema { name: "userId", key_path: &["userId"], unique: false },
        IndexSchema { name: "lessonId", key_path: &["lessonId"], unique: false },
        IndexSchema { name: "userId_lessonId", key_path: &["userId", "lessonId"], unique: true },
    ],
};

pub const USERS: CollectionSchema = CollectionSchema {
    name: "users",
    indexes: &[],
};

pub const QUIZZES: CollectionSchema = CollectionSchema {
    name: "quizzes",
    indexes: &[IndexSchema { name: "lessonId", key_path: &["lessonId"], unique: false }],
};

/// Every collection in schema version 1
pub const COLLECTIONS: &[CollectionSchema] = &[LESSONS, PROGRESS, USERS, QUIZZES];

/// All schema creation statements for the current version
pub fn all_schema_statements() -> Vec<String> {
    let mut stmts = Vec::new();
    for collection in COLLECTIONS {
        stmts.push(collection.create_table_sql());
        stmts.extend(collection.indexes.iter().map(|i| i.create_sql(collection.name)));
    }
    stmts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_index_sql() {
        let index = PROGRESS.index("userId_lessonId").unwrap();
        assert_eq!(
            index.create_sql("progress"),
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_progress_userId_lessonId ON progress \
             (json_extract(data, '$.userId'), json_extract(data, '$.lessonId'))"
        );
        assert_eq!(
            index.where_clause(),
            "json_extract(data, '$.userId') = ?1 AND json_extract(data, '$.lessonId') = ?2"
        );
    }

    #[test]
    fn test_statement_count() {
        // four tables plus seven indexes
        assert_eq!(all_schema_statements().len(), 11);
        assert!(USERS.index("email").is_none());
    }
}
