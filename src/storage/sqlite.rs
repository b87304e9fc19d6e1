/// SQLite implementation of the storage backend
///
/// Every handle opens its own connection to the same file; SQLite's locking
/// serializes writers and the global `revision` column orders their writes.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::storage::{migrations, RawEntry, StorageBackend, StorageError};

/// How long a writer waits for another connection's lock before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) the database file and bring its schema up to date
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        let backend = Self::from_connection(conn)?;
        tracing::info!("SQLite storage initialized at: {:?}", db_path);
        Ok(backend)
    }

    /// Private, connection-scoped database; useful for tests
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| StorageError::Connection(format!("Failed to set busy timeout: {}", e)))?;
        migrations::initialize_database(&conn)?;
        Ok(Self { conn })
    }
}

impl StorageBackend for SqliteBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    fn write(&self, key: &str, value: Option<&str>, writer: &str) -> Result<u64, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO kv_entries (key, value, revision, writer, updated_at)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(revision), 0) + 1 FROM kv_entries), ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                revision = excluded.revision,
                writer = excluded.writer,
                updated_at = excluded.updated_at",
            params![key, value, writer, Utc::now().to_rfc3339()],
        )?;
        let revision: i64 = tx.query_row(
            "SELECT revision FROM kv_entries WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(revision as u64)
    }

    fn head(&self) -> Result<u64, StorageError> {
        let head: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(revision), 0) FROM kv_entries",
            [],
            |row| row.get(0),
        )?;
        Ok(head as u64)
    }

    fn changes_since(&self, revision: u64) -> Result<Vec<RawEntry>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value, revision, writer FROM kv_entries
             WHERE revision > ?1
             ORDER BY revision",
        )?;

        let rows = stmt.query_map(params![revision as i64], |row| {
            Ok(RawEntry {
                key: row.get(0)?,
                value: row.get(1)?,
                revision: row.get::<_, i64>(2)? as u64,
                writer: row.get(3)?,
            })
        })?;

        let mut changes = Vec::new();
        for change in rows {
            changes.push(change?);
        }
        Ok(changes)
    }
}
