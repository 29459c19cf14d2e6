//! Versioned schema migrations
//!
//! The stored version lives in `PRAGMA user_version`. `migrate` walks the
//! migration table one step at a time; every step commits together with the
//! version bump, so a failing step leaves the database at the last good
//! version.

use rusqlite::{Connection, Transaction};
use crate::{Error, Result};
use super::schema;

/// One schema step from `from` to `to`
pub struct Migration {
    pub from: u32,
    pub to: u32,
    pub description: &'static str,
    pub apply: fn(&Transaction<'_>) -> rusqlite::Result<()>,
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("description", &self.description)
            .finish()
    }
}

/// The migration table shipped with this build
pub const MIGRATIONS: &[Migration] = &[Migration {
    from: 0,
    to: 1,
    description: "create lessons, progress, users and quizzes with their indexes",
    apply: create_v1,
}];

/// Additive: creates whatever collection or index is missing, leaves the rest alone
fn create_v1(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    for stmt in schema::all_schema_statements() {
        tx.execute(&stmt, [])?;
    }
    Ok(())
}

/// Read the stored schema version
pub fn current_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Bring the database from `from` to `to` using the built-in table
pub fn migrate(conn: &mut Connection, from: u32, to: u32) -> Result<()> {
    migrate_with(conn, MIGRATIONS, from, to)
}

/// Bring the database from `from` to `to` using `table`
pub fn migrate_with(conn: &mut Connection, table: &[Migration], from: u32, to: u32) -> Result<()> {
    if from > to {
        return Err(Error::SchemaUpgradeFailed {
            from,
            to,
            reason: "stored schema is newer than this build".into(),
        });
    }

    let mut version = from;
    while version < to {
        let step = table
            .iter()
            .find(|m| m.from == version && m.to > version && m.to <= to)
            .ok_or_else(|| Error::SchemaUpgradeFailed {
                from: version,
                to,
                reason: format!("no migration step starts at version {}", version),
            })?;

        tracing::info!("Migrating schema {} -> {}: {}", step.from, step.to, step.description);
        apply_step(conn, step).map_err(|e| {
            tracing::error!("Migration {} -> {} failed: {}", step.from, step.to, e);
            Error::SchemaUpgradeFailed {
                from: step.from,
                to: step.to,
                reason: e.to_string(),
            }
        })?;
        version = step.to;
    }

    Ok(())
}

fn apply_step(conn: &mut Connection, step: &Migration) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    (step.apply)(&tx)?;
    tx.pragma_update(None, "user_version", step.to)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    fn create_extra(tx: &Transaction<'_>) -> rusqlite::Result<()> {
        tx.execute("CREATE TABLE IF NOT EXISTS notes (id TEXT PRIMARY KEY NOT NULL, data TEXT NOT NULL)", [])?;
        Ok(())
    }

    fn broken(tx: &Transaction<'_>) -> rusqlite::Result<()> {
        tx.execute("CREATE TABLE half_done (id TEXT)", [])?;
        tx.execute("THIS IS NOT SQL", [])?;
        Ok(())
    }

    #[test]
    fn test_migrate_fresh_database() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(current_version(&conn).unwrap(), 0);

        migrate(&mut conn, 0, schema::SCHEMA_VERSION).unwrap();

        assert_eq!(current_version(&conn).unwrap(), 1);
        for collection in schema::COLLECTIONS {
            assert!(table_exists(&conn, collection.name));
        }
    }

    #[test]
    fn test_steps_chain_in_order() {
        let table = [
            Migration { from: 0, to: 1, description: "v1", apply: create_v1 },
            Migration { from: 1, to: 2, description: "notes", apply: create_extra },
        ];
        let mut conn = Connection::open_in_memory().unwrap();
        migrate_with(&mut conn, &table, 0, 2).unwrap();

        assert_eq!(current_version(&conn).unwrap(), 2);
        assert!(table_exists(&conn, "notes"));
        assert!(table_exists(&conn, "lessons"));
    }

    #[test]
    fn test_failed_step_rolls_back() {
        let table = [
            Migration { from: 0, to: 1, description: "v1", apply: create_v1 },
            Migration { from: 1, to: 2, description: "broken", apply: broken },
        ];
        let mut conn = Connection::open_in_memory().unwrap();
        let err = migrate_with(&mut conn, &table, 0, 2).unwrap_err();

        assert!(matches!(err, Error::SchemaUpgradeFailed { from: 1, to: 2, .. }));
        assert_eq!(current_version(&conn).unwrap(), 1);
        assert!(!table_exists(&conn, "half_done"));
    }

    #[test]
    fn test_missing_step_fails() {
        let mut conn = Connection::open_in_memory().unwrap();
        let err = migrate_with(&mut conn, MIGRATIONS, 0, 3).unwrap_err();
        assert!(matches!(err, Error::SchemaUpgradeFailed { from: 1, to: 3, .. }));
    }

    #[test]
    fn test_downgrade_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        let err = migrate(&mut conn, 2, 1).unwrap_err();
        assert!(matches!(err, Error::SchemaUpgradeFailed { from: 2, to: 1, .. }));
    }

    #[test]
    fn test_rerun_is_additive() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn, 0, 1).unwrap();
        conn.execute("INSERT INTO users (id, data) VALUES ('u1', '{\"id\":\"u1\"}')", []).unwrap();

        // running the v1 step again must not touch existing data
        let tx = conn.transaction().unwrap();
        create_v1(&tx).unwrap();
        tx.commit().unwrap();

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }
}
