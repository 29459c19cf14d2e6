//! Typed collection accessors
//!
//! A `Collection<T>` is a thin view over one table. Records are stored as
//! their JSON wire shape; lookups go through the primary key or one of the
//! secondary indexes declared in `schema`.

use std::marker::PhantomData;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params, params_from_iter};
use serde::Serialize;
use serde::de::DeserializeOwned;
use crate::{Error, Result};
use super::schema::{CollectionSchema, IndexSchema};

/// A record type stored in one collection
pub trait Record: Serialize + DeserializeOwned + Send + 'static {
    /// The collection this record type lives in
    fn schema() -> &'static CollectionSchema;

    /// Primary key value
    fn primary_key(&self) -> &str;

    /// Checked before every write
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Accessor for the records of type `T`
pub struct Collection<'c, T> {
    conn: &'c Connection,
    schema: &'static CollectionSchema,
    _marker: PhantomData<T>,
}

impl<'c, T: Record> Collection<'c, T> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            schema: T::schema(),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    /// Add a new record. Fails with `DuplicateKey` if the primary key or
    /// any unique index already holds a record.
    pub fn insert(&self, record: &T) -> Result<()> {
        record.validate()?;
        let data = serde_json::to_string(record)?;
        let sql = format!("INSERT INTO {} (id, data) VALUES (?1, ?2)", self.schema.name);

        self.conn
            .execute(&sql, params![record.primary_key(), data])
            .map_err(|e| self.map_write_error(e, record.primary_key()))?;

        tracing::debug!("Inserted {} into {}", record.primary_key(), self.schema.name);
        Ok(())
    }

    /// Insert or overwrite by primary key.
    ///
    /// An overwritten record keeps its position in insertion order. A
    /// unique index still rejects a record whose indexed fields collide
    /// with a record under a different primary key.
    pub fn put(&self, record: &T) -> Result<()> {
        record.validate()?;
        let data = serde_json::to_string(record)?;
        let sql = format!(
            "INSERT INTO {} (id, data) VALUES (?1, ?2) ON CONFLICT(id) DO UPDATE SET data = excluded.data",
            self.schema.name
        );

        self.conn
            .execute(&sql, params![record.primary_key(), data])
            .map_err(|e| self.map_write_error(e, record.primary_key()))?;

        tracing::debug!("Put {} into {}", record.primary_key(), self.schema.name);
        Ok(())
    }

    /// Get a record by primary key
    pub fn get(&self, key: &str) -> Result<Option<T>> {
        let sql = format!("SELECT data FROM {} WHERE id = ?1", self.schema.name);
        let data: Option<String> = self
            .conn
            .query_row(&sql, [key], |row| row.get(0))
            .optional()?;

        data.map(|d| serde_json::from_str(&d).map_err(Into::into))
            .transpose()
    }

    /// All records, in insertion order
    pub fn get_all(&self) -> Result<Vec<T>> {
        let sql = format!("SELECT id, data FROM {} ORDER BY rowid", self.schema.name);
        self.query_records(&sql, Vec::<&str>::new())
    }

    /// All records whose indexed fields equal `key`, in insertion order.
    ///
    /// `key` holds one value per field of the index (two for a composite
    /// index). The result is a snapshot taken when the call runs.
    pub fn get_all_by_index(&self, index: &str, key: &[&str]) -> Result<Vec<T>> {
        let index = self.resolve_index(index, key)?;
        let sql = format!(
            "SELECT id, data FROM {} WHERE {} ORDER BY rowid",
            self.schema.name,
            index.where_clause()
        );
        self.query_records(&sql, key.iter().copied())
    }

    /// The first record (in insertion order) whose indexed fields equal `key`
    pub fn get_one_by_index(&self, index: &str, key: &[&str]) -> Result<Option<T>> {
        let index = self.resolve_index(index, key)?;
        let sql = format!(
            "SELECT data FROM {} WHERE {} ORDER BY rowid LIMIT 1",
            self.schema.name,
            index.where_clause()
        );
        let data: Option<String> = self
            .conn
            .query_row(&sql, params_from_iter(key.iter()), |row| row.get(0))
            .optional()?;

        data.map(|d| serde_json::from_str(&d).map_err(Into::into))
            .transpose()
    }

    /// Count all records
    pub fn count(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.schema.name);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn resolve_index(&self, name: &str, key: &[&str]) -> Result<&'static IndexSchema> {
        let index = self.schema.index(name).ok_or_else(|| Error::UnknownIndex {
            collection: self.schema.name.to_string(),
            index: name.to_string(),
        })?;

        if index.key_path.len() != key.len() {
            return Err(Error::InvalidIndexKey {
                index: name.to_string(),
                expected: index.key_path.len(),
                got: key.len(),
            });
        }
        Ok(index)
    }

    /// Run a `SELECT id, data` query. Rows that no longer decode are skipped
    /// so one bad record does not hide the rest of the collection.
    fn query_records<P>(&self, sql: &str, args: P) -> Result<Vec<T>>
    where
        P: IntoIterator,
        P::Item: rusqlite::ToSql,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(args), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, data) = row?;
            match serde_json::from_str(&data) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping undecodable record {} in {}: {}", id, self.schema.name, e),
            }
        }
        Ok(records)
    }

    fn map_write_error(&self, err: rusqlite::Error, key: &str) -> Error {
        if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            tracing::warn!("Rejected duplicate {} in {}: {}", key, self.schema.name, err);
            Error::DuplicateKey {
                collection: self.schema.name.to_string(),
                key: key.to_string(),
            }
        } else {
            Error::Storage(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Error;
    use crate::lesson::{Lesson, LessonType, Level};
    use crate::progress::UserProgress;
    use crate::quiz::{Quiz, QuizQuestion};
    use crate::storage::Handle;
    use crate::user::{Role, User};

    fn lesson(id: &str, subject: &str, kind: LessonType) -> Lesson {
        Lesson::new(id, format!("Lesson {}", id), kind, "https://example.com/a.mp4", 10, subject, Level::Beginner)
    }

    #[test]
    fn test_insert_then_get() {
        let handle = Handle::open_in_memory().unwrap();
        let l = lesson("1", "Mathematics", LessonType::Video).with_thumbnail("/math.jpg");

        handle.lessons().insert(&l).unwrap();

        assert_eq!(handle.lessons().get("1").unwrap(), Some(l.clone()));
        assert_eq!(handle.lessons().get_all().unwrap(), vec![l]);
        assert_eq!(handle.lessons().get("missing").unwrap(), None);
    }

    #[test]
    fn test_insert_rejects_duplicate_primary_key() {
        let handle = Handle::open_in_memory().unwrap();
        let quiz = Quiz::new("quiz-4", "4", vec![QuizQuestion::new("q1", "1 + 1?", &["1", "2"], 1)]);
        handle.quizzes().insert(&quiz).unwrap();

        let mut changed = quiz.clone();
        changed.questions.clear();
        let err = handle.quizzes().insert(&changed).unwrap_err();

        assert!(matches!(err, Error::DuplicateKey { ref collection, ref key } if collection == "quizzes" && key == "quiz-4"));
        assert_eq!(handle.quizzes().count().unwrap(), 1);
        assert_eq!(handle.quizzes().get("quiz-4").unwrap(), Some(quiz));
    }

    #[test]
    fn test_put_overwrites_in_place() {
        let handle = Handle::open_in_memory().unwrap();
        let users = handle.users();

        users.put(&User::new("a", "Asha", Role::Student)).unwrap();
        users.put(&User::new("b", "Ravi", Role::Student)).unwrap();
        users.put(&User::new("a", "Asha K", Role::Teacher)).unwrap();

        let all = users.get_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "a");
        assert_eq!(all[0].name.as_deref(), Some("Asha K"));
        assert_eq!(all[1].id, "b");
    }

    #[test]
    fn test_index_lookup_keeps_insertion_order() {
        let handle = Handle::open_in_memory().unwrap();
        let lessons = handle.lessons();
        lessons.insert(&lesson("9", "Science", LessonType::Video)).unwrap();
        lessons.insert(&lesson("2", "Mathematics", LessonType::Quiz)).unwrap();
        lessons.insert(&lesson("7", "Science", LessonType::Text)).unwrap();
        lessons.insert(&lesson("1", "Science", LessonType::Audio)).unwrap();

        let ids: Vec<String> = lessons
            .get_all_by_index("subject", &["Science"])
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec!["9", "7", "1"]);

        let quizzes = lessons.get_all_by_index("type", &["quiz"]).unwrap();
        assert_eq!(quizzes.len(), 1);
        assert!(lessons.get_all_by_index("subject", &["History"]).unwrap().is_empty());
    }

    #[test]
    fn test_unique_composite_index_rejects_foreign_id() {
        let handle = Handle::open_in_memory().unwrap();
        let progress = handle.progress();
        progress.put(&UserProgress::new("u1", "l1").with_progress(40)).unwrap();

        let mut stray = UserProgress::new("u1", "l1").with_progress(90);
        stray.id = "something-else".to_string();

        assert!(progress.put(&stray).unwrap_err().is_duplicate_key());
        assert!(progress.insert(&stray).unwrap_err().is_duplicate_key());

        let stored = progress.get_one_by_index("userId_lessonId", &["u1", "l1"]).unwrap().unwrap();
        assert_eq!(stored.id, "u1-l1");
        assert_eq!(stored.progress, 40);
        assert_eq!(progress.count().unwrap(), 1);
    }

    #[test]
    fn test_index_errors() {
        let handle = Handle::open_in_memory().unwrap();

        let err = handle.users().get_all_by_index("email", &["a@b.c"]).unwrap_err();
        assert!(matches!(err, Error::UnknownIndex { .. }));

        let err = handle.progress().get_one_by_index("userId_lessonId", &["u1"]).unwrap_err();
        assert!(matches!(err, Error::InvalidIndexKey { expected: 2, got: 1, .. }));
    }

    #[test]
    fn test_invalid_record_is_not_written() {
        let handle = Handle::open_in_memory().unwrap();
        let mut l = lesson("1", "Mathematics", LessonType::Video);
        l.duration = 0;

        assert!(matches!(handle.lessons().insert(&l), Err(Error::InvalidRecord(_))));
        assert_eq!(handle.lessons().count().unwrap(), 0);
    }

    #[test]
    fn test_undecodable_rows_are_skipped_in_scans() {
        let handle = Handle::open_in_memory().unwrap();
        handle.lessons().insert(&lesson("1", "Science", LessonType::Video)).unwrap();
        // a body written by an incompatible client: indexed, but missing required fields
        handle
            .connection()
            .execute(
                "INSERT INTO lessons (id, data) VALUES ('bad', '{\"id\":\"bad\",\"subject\":\"Science\"}')",
                [],
            )
            .unwrap();
        handle.lessons().insert(&lesson("2", "Science", LessonType::Text)).unwrap();

        let science = handle.lessons().get_all_by_index("subject", &["Science"]).unwrap();
        assert_eq!(science.len(), 2);
        assert_eq!(handle.lessons().count().unwrap(), 3);
        assert!(handle.lessons().get("bad").is_err());
    }
}
