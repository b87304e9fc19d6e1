/// Storage layer for persisting tracker state
///
/// This module provides a key -> JSON store shared by several execution
/// contexts (one per open client). Each context sees its own writes
/// immediately and learns about other contexts' writes through
/// `poll_changes`, which also drives the subscriptions.

pub mod local;
pub mod memory;
pub mod migrations;
pub mod sqlite;
pub mod subscription;

// Re-export the main storage types
pub use local::*;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use subscription::{ChangeCallback, Subscribers, Subscription};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur in a storage backend
///
/// Only constructors surface these; once a store is open, failures are
/// logged and the operation degrades to a no-op or a miss.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

/// A change made to a key by another execution context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// Raw serialized value, `None` when the key was removed
    pub new_value: Option<String>,
    pub revision: u64,
}

/// One row as the backend stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub key: String,
    pub value: Option<String>,
    pub revision: u64,
    /// Context id of the handle that wrote this revision
    pub writer: String,
}

/// The shared medium under every store handle
///
/// Revisions are global and strictly increasing across all keys, so a handle
/// can ask for everything written after the last revision it has seen.
pub trait StorageBackend {
    /// Read the current raw value of a key
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write (or, with `None`, remove) a key and return the new revision
    fn write(&self, key: &str, value: Option<&str>, writer: &str) -> Result<u64, StorageError>;

    /// Latest revision written by anyone
    fn head(&self) -> Result<u64, StorageError>;

    /// Current entries whose revision is greater than `revision`, oldest first
    fn changes_since(&self, revision: u64) -> Result<Vec<RawEntry>, StorageError>;
}

/// Key -> JSON store as seen from one execution context
pub trait KeyValueStore {
    /// Cached, parsed value of `key`; unreadable or unparsable values are a miss
    fn get(&self, key: &str) -> Option<Value>;

    /// Serialize and write; failures are logged and the write is dropped
    fn set(&self, key: &str, value: &Value);

    /// Remove a key; failures are logged
    fn remove(&self, key: &str);

    /// Register a callback for changes to `key` made by other contexts
    fn subscribe(&self, key: &str, callback: ChangeCallback) -> Subscription;

    /// Pick up changes made by other contexts since the last poll
    ///
    /// Refreshes the cache, runs matching subscriptions and returns the events.
    /// Local writes are never reported.
    fn poll_changes(&self) -> Vec<StorageEvent>;
}

/// Typed read with a fallback for missing or malformed values
pub fn load_or<T, S>(store: &S, key: &str, default: T) -> T
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(value) = store.get(key) else {
        return default;
    };
    match serde_json::from_value(value) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Stored value for '{}' has an unexpected shape, using default: {}", key, e);
            default
        }
    }
}

/// Typed write; a value that cannot be serialized is logged and skipped
pub fn save<T, S>(store: &S, key: &str, value: &T)
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    match serde_json::to_value(value) {
        Ok(json) => store.set(key, &json),
        Err(e) => tracing::warn!("Could not serialize value for '{}': {}", key, e),
    }
}
