/// A store handle for one execution context
///
/// `LocalStore` adds the per-context behaviour on top of a shared backend:
/// a parse-once read cache, a context id that marks its own writes, and the
/// revision cursor used to find other contexts' writes.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use uuid::Uuid;

use crate::storage::{
    ChangeCallback, KeyValueStore, MemoryBackend, SqliteBackend, StorageBackend, StorageError,
    StorageEvent, Subscribers, Subscription,
};

pub struct LocalStore<B: StorageBackend> {
    backend: B,
    context_id: String,
    last_seen: Cell<u64>,
    cache: RefCell<HashMap<String, Option<Value>>>,
    subscribers: Subscribers,
}

/// Store handle over a SQLite file
pub type SqliteStore = LocalStore<SqliteBackend>;

/// Store handle over an in-process medium
pub type MemoryStore = LocalStore<MemoryBackend>;

impl SqliteStore {
    /// Open a handle on the database at `db_path`, creating it if needed
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Ok(LocalStore::new(SqliteBackend::open(db_path)?))
    }
}

impl<B: StorageBackend> LocalStore<B> {
    /// Create a new context over `backend`
    ///
    /// Changes written before the context was created are not reported as
    /// events; they are simply what `get` returns.
    pub fn new(backend: B) -> Self {
        let head = backend.head().unwrap_or_else(|e| {
            tracing::warn!("Could not read storage head revision: {}", e);
            0
        });

        Self {
            backend,
            context_id: Uuid::new_v4().to_string(),
            last_seen: Cell::new(head),
            cache: RefCell::new(HashMap::new()),
            subscribers: Subscribers::default(),
        }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of live subscriptions on this handle
    pub fn subscription_count(&self) -> usize {
        self.subscribers.len()
    }

    fn parse(key: &str, raw: &str) -> Option<Value> {
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring unparsable value stored under '{}': {}", key, e);
                None
            }
        }
    }

    fn write(&self, key: &str, raw: Option<&str>, value: Option<Value>) {
        match self.backend.write(key, raw, &self.context_id) {
            Ok(revision) => {
                tracing::debug!("Wrote '{}' at revision {}", key, revision);
                self.cache.borrow_mut().insert(key.to_string(), value);
            }
            Err(e) => {
                tracing::warn!("Dropping write to '{}': {}", key, e);
            }
        }
    }
}

impl<B: StorageBackend> KeyValueStore for LocalStore<B> {
    fn get(&self, key: &str) -> Option<Value> {
        if let Some(cached) = self.cache.borrow().get(key) {
            return cached.clone();
        }

        let parsed = match self.backend.read(key) {
            Ok(Some(raw)) => Self::parse(key, &raw),
            Ok(None) => None,
            Err(e) => {
                // Not cached, so the next read retries the backend
                tracing::warn!("Could not read '{}': {}", key, e);
                return None;
            }
        };

        self.cache
            .borrow_mut()
            .insert(key.to_string(), parsed.clone());
        parsed
    }

    fn set(&self, key: &str, value: &Value) {
        match serde_json::to_string(value) {
            Ok(raw) => self.write(key, Some(&raw), Some(value.clone())),
            Err(e) => tracing::warn!("Could not serialize value for '{}': {}", key, e),
        }
    }

    fn remove(&self, key: &str) {
        self.write(key, None, None);
    }

    fn subscribe(&self, key: &str, callback: ChangeCallback) -> Subscription {
        self.subscribers.add(key, callback)
    }

    fn poll_changes(&self) -> Vec<StorageEvent> {
        let changes = match self.backend.changes_since(self.last_seen.get()) {
            Ok(changes) => changes,
            Err(e) => {
                tracing::warn!("Could not poll for storage changes: {}", e);
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        for change in changes {
            self.last_seen.set(self.last_seen.get().max(change.revision));
            if change.writer == self.context_id {
                continue;
            }

            let parsed = change
                .value
                .as_deref()
                .and_then(|raw| Self::parse(&change.key, raw));
            self.cache.borrow_mut().insert(change.key.clone(), parsed);

            let event = StorageEvent {
                key: change.key,
                new_value: change.value,
                revision: change.revision,
            };
            self.subscribers.dispatch(&event);
            events.push(event);
        }

        if !events.is_empty() {
            tracing::debug!("Picked up {} change(s) from other contexts", events.len());
        }
        events
    }
}
