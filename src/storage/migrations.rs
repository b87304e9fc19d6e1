/// Database migration management
///
/// This module creates and upgrades the SQLite schema behind the key-value
/// store. Several handles may open the same file concurrently, so every
/// statement is idempotent and the upgrade runs inside one transaction.

use rusqlite::Connection;
use crate::storage::StorageError;

/// Current database schema version
///
/// Increment this when you add new migrations
const CURRENT_VERSION: i32 = 1;

/// Initialize the database schema
///
/// Creates the version table and runs every migration newer than the
/// recorded version.
pub fn initialize_database(conn: &Connection) -> Result<(), StorageError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let current_version = get_current_version(&tx)?;
    if current_version > CURRENT_VERSION {
        return Err(StorageError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current_version, CURRENT_VERSION
        )));
    }

    if current_version < CURRENT_VERSION {
        run_migrations(&tx, current_version)?;
        set_version(&tx, CURRENT_VERSION)?;
    }

    tx.commit()?;
    Ok(())
}

/// Get the current database schema version
fn get_current_version(conn: &Connection) -> Result<i32, StorageError> {
    let version = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get::<_, i32>(0)
        })
        .unwrap_or(0); // no row yet means a fresh database

    Ok(version)
}

/// Set the database schema version
fn set_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Run database migrations from the current version to the latest
fn run_migrations(conn: &Connection, from_version: i32) -> Result<(), StorageError> {
    if from_version < 1 {
        migration_v1(conn)?;
    }

    Ok(())
}

/// Migration to version 1: the key-value table
///
/// `value` is NULL for removed keys so the removal itself carries a revision
/// other handles can observe.
fn migration_v1(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_entries (
            key TEXT PRIMARY KEY,
            value TEXT,
            revision INTEGER NOT NULL,
            writer TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // Polling reads everything newer than a revision
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_kv_entries_revision
         ON kv_entries (revision)",
        [],
    )?;

    tracing::info!("Applied migration v1: created key-value schema");
    Ok(())
}
