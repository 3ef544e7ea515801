//! Database schema setup and versioning for railforms.
//!
//! Schema creation is an explicit deployment step (`railforms migrate`).
//! Opening an existing database only checks that its recorded version
//! matches [`CURRENT_VERSION`]; it never creates or alters tables.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Bring the database schema up to [`CURRENT_VERSION`].
///
/// Creates all tables and indexes that don't exist, then runs any pending
/// migrations. Safe to run repeatedly. Returns the version the database was
/// at before, `None` for a fresh database.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn migrate(conn: &Connection) -> Result<Option<i32>> {
    let previous = schema_version(conn)?;
    if let Some(version) = previous {
        if version > CURRENT_VERSION {
            return Err(Error::DatabaseMigration {
                message: format!(
                    "database is at version {version}, newer than this build ({CURRENT_VERSION})"
                ),
            });
        }
    }

    let tx = conn.unchecked_transaction()?;
    for statement in SCHEMA_STATEMENTS {
        tx.execute(statement, [])?;
    }

    let from = previous.unwrap_or(0);
    if from < CURRENT_VERSION {
        run_migrations(&tx, from)?;
        info!(from, to = CURRENT_VERSION, "Migrated database schema");
    }
    tx.commit()?;

    Ok(previous)
}

/// Fail unless the database has been migrated to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns [`Error::SchemaNotInitialized`] for a database that was never
/// migrated and [`Error::SchemaVersionMismatch`] for any other version.
pub fn ensure_current(conn: &Connection, path: &Path) -> Result<()> {
    match schema_version(conn)? {
        None => Err(Error::SchemaNotInitialized {
            path: path.to_path_buf(),
        }),
        Some(CURRENT_VERSION) => Ok(()),
        Some(found) => Err(Error::SchemaVersionMismatch {
            found,
            expected: CURRENT_VERSION,
        }),
    }
}

/// Get the schema version recorded in the database.
///
/// Returns `None` if the metadata table or the version key is missing.
///
/// # Errors
///
/// Returns an error if the query fails or the stored version is not a number.
pub fn schema_version(conn: &Connection) -> Result<Option<i32>> {
    let has_metadata: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'metadata'",
        [],
        |row| row.get(0),
    )?;
    if !has_metadata {
        return Ok(None);
    }

    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    value
        .map(|value| {
            value.parse().map_err(|_| Error::DatabaseMigration {
                message: format!("invalid schema version: {value}"),
            })
        })
        .transpose()
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < CURRENT_VERSION {
        current += 1;
        run_migration(conn, current)?;
    }

    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Version 1 is the base schema from `SCHEMA_STATEMENTS`.
fn migrate_v1(conn: &Connection) -> Result<()> {
    set_schema_version(conn, 1)
}
