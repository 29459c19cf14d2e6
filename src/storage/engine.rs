//! Engine handle - the single SQLite connection behind a store

use std::path::{Path, PathBuf};
use std::time::Duration;
use rusqlite::{Connection, ErrorCode};
use serde::Serialize;
use crate::{Error, Result};
use crate::lesson::Lesson;
use crate::progress::UserProgress;
use crate::quiz::Quiz;
use crate::user::User;
use super::collection::{Collection, Record};
use super::migrate::{self, Migration};
use super::schema;

/// Where the database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    /// Private database that disappears with the handle (tests, dry runs)
    InMemory,
}

impl StoreLocation {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        StoreLocation::File(path.into())
    }
}

impl std::fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreLocation::File(path) => write!(f, "{}", path.display()),
            StoreLocation::InMemory => write!(f, ":memory:"),
        }
    }
}

/// An open, migrated database.
///
/// Obtaining a `Handle` guarantees the schema is at `SCHEMA_VERSION`, so
/// every collection accessor borrowed from it can assume its table exists.
pub struct Handle {
    conn: Connection,
    location: StoreLocation,
}

impl Handle {
    /// Open (creating on first use) and migrate the database
    pub fn open(location: &StoreLocation) -> Result<Self> {
        Self::open_with(location, migrate::MIGRATIONS, schema::SCHEMA_VERSION)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&StoreLocation::InMemory)
    }

    /// Open and migrate to `target` with an explicit migration table
    pub fn open_with(location: &StoreLocation, migrations: &[Migration], target: u32) -> Result<Self> {
        let mut conn = connect(location)?;

        let stored = migrate::current_version(&conn).map_err(unavailable_or)?;
        if stored != target {
            tracing::info!("Upgrading {} from schema {} to {}", location, stored, target);
            migrate::migrate_with(&mut conn, migrations, stored, target)?;
        }

        tracing::debug!("Opened {} at schema version {}", location, target);
        Ok(Self {
            conn,
            location: location.clone(),
        })
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// How long a write waits on a lock held by another connection
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    pub fn schema_version(&self) -> Result<u32> {
        Ok(migrate::current_version(&self.conn)?)
    }

    /// Typed accessor for the collection holding `T`
    pub fn collection<T: Record>(&self) -> Collection<'_, T> {
        Collection::new(&self.conn)
    }

    pub fn lessons(&self) -> Collection<'_, Lesson> {
        self.collection()
    }

    pub fn progress(&self) -> Collection<'_, UserProgress> {
        self.collection()
    }

    pub fn users(&self) -> Collection<'_, User> {
        self.collection()
    }

    pub fn quizzes(&self) -> Collection<'_, Quiz> {
        self.collection()
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            location: self.location.to_string(),
            schema_version: self.schema_version()?,
            lessons: self.lessons().count()?,
            progress: self.progress().count()?,
            users: self.users().count()?,
            quizzes: self.quizzes().count()?,
        })
    }
}

fn connect(location: &StoreLocation) -> Result<Connection> {
    match location {
        StoreLocation::InMemory => Connection::open_in_memory().map_err(unavailable_or),
        StoreLocation::File(path) => {
            ensure_parent_dir(path)?;
            Connection::open(path).map_err(unavailable_or)
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::StorageUnavailable(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
    }
    Ok(())
}

/// Map "no usable storage here" failures to `StorageUnavailable`
fn unavailable_or(err: rusqlite::Error) -> Error {
    match err.sqlite_error_code() {
        Some(
            ErrorCode::CannotOpen
            | ErrorCode::PermissionDenied
            | ErrorCode::ReadOnly
            | ErrorCode::NotADatabase
            | ErrorCode::SystemIoFailure,
        ) => Error::StorageUnavailable(err.to_string()),
        _ => Error::Storage(err),
    }
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub location: String,
    pub schema_version: u32,
    pub lessons: usize,
    pub progress: usize,
    pub users: usize,
    pub quizzes: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics ({}):", self.location)?;
        writeln!(f, "  Schema version: {}", self.schema_version)?;
        writeln!(f, "  Lessons: {}", self.lessons)?;
        writeln!(f, "  Progress: {}", self.progress)?;
        writeln!(f, "  Users: {}", self.users)?;
        writeln!(f, "  Quizzes: {}", self.quizzes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::{LessonType, Level};
    use rusqlite::Transaction;

    fn failing_step(_tx: &Transaction<'_>) -> rusqlite::Result<()> {
        Err(rusqlite::Error::InvalidQuery)
    }

    #[test]
    fn test_open_in_memory_is_migrated() {
        let handle = Handle::open_in_memory().unwrap();
        assert_eq!(handle.schema_version().unwrap(), schema::SCHEMA_VERSION);

        let stats = handle.stats().unwrap();
        assert_eq!(stats.lessons, 0);
        assert_eq!(stats.quizzes, 0);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::file(dir.path().join("nested").join("eguru.db"));

        {
            let handle = Handle::open(&location).unwrap();
            let lesson = Lesson::new("1", "Addition", LessonType::Video, "u", 15, "Mathematics", Level::Beginner);
            handle.lessons().insert(&lesson).unwrap();
        }

        let handle = Handle::open(&location).unwrap();
        assert_eq!(handle.lessons().count().unwrap(), 1);
        assert_eq!(handle.schema_version().unwrap(), 1);
    }

    #[test]
    fn test_newer_database_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation::file(dir.path().join("eguru.db"));
        {
            let conn = Connection::open(dir.path().join("eguru.db")).unwrap();
            conn.pragma_update(None, "user_version", 7).unwrap();
        }

        let err = Handle::open(&location).err().unwrap();
        assert!(matches!(err, Error::SchemaUpgradeFailed { from: 7, to: 1, .. }));
    }

    #[test]
    fn test_failing_migration_surfaces_upgrade_error() {
        let table = [Migration { from: 0, to: 1, description: "fails", apply: failing_step }];
        let err = Handle::open_with(&StoreLocation::InMemory, &table, 1).err().unwrap();
        assert!(matches!(err, Error::SchemaUpgradeFailed { from: 0, to: 1, .. }));
    }

    #[test]
    fn test_unusable_path_is_storage_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let location = StoreLocation::file(blocker.join("eguru.db"));
        let err = Handle::open(&location).err().unwrap();
        assert!(matches!(err, Error::StorageUnavailable(_)));
    }

    #[test]
    fn test_garbage_file_is_storage_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eguru.db");
        std::fs::write(&path, vec![0x42u8; 4096]).unwrap();

        let err = Handle::open(&StoreLocation::file(path)).err().unwrap();
        assert!(matches!(err, Error::StorageUnavailable(_)));
    }
}
