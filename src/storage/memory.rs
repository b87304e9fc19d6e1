/// In-process storage medium
///
/// Clones of a `MemoryBackend` share one medium, so several `LocalStore`
/// handles over clones behave like several clients on one device.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::storage::{RawEntry, StorageBackend, StorageError};

#[derive(Debug)]
struct Medium {
    entries: BTreeMap<String, RawEntry>,
    head: u64,
    available: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryBackend {
    medium: Rc<RefCell<Medium>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            medium: Rc::new(RefCell::new(Medium {
                entries: BTreeMap::new(),
                head: 0,
                available: true,
            })),
        }
    }

    /// Simulate the medium becoming unreachable (e.g. quota exhausted)
    pub fn set_available(&self, available: bool) {
        self.medium.borrow_mut().available = available;
    }

    fn check_available(medium: &Medium) -> Result<(), StorageError> {
        if medium.available {
            Ok(())
        } else {
            Err(StorageError::Unavailable("memory medium is offline".to_string()))
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let medium = self.medium.borrow();
        Self::check_available(&medium)?;
        Ok(medium.entries.get(key).and_then(|e| e.value.clone()))
    }

    fn write(&self, key: &str, value: Option<&str>, writer: &str) -> Result<u64, StorageError> {
        let mut medium = self.medium.borrow_mut();
        Self::check_available(&medium)?;
        medium.head += 1;
        let revision = medium.head;
        medium.entries.insert(
            key.to_string(),
            RawEntry {
                key: key.to_string(),
                value: value.map(str::to_string),
                revision,
                writer: writer.to_string(),
            },
        );
        Ok(revision)
    }

    fn head(&self) -> Result<u64, StorageError> {
        let medium = self.medium.borrow();
        Self::check_available(&medium)?;
        Ok(medium.head)
    }

    fn changes_since(&self, revision: u64) -> Result<Vec<RawEntry>, StorageError> {
        let medium = self.medium.borrow();
        Self::check_available(&medium)?;
        let mut changes: Vec<RawEntry> = medium
            .entries
            .values()
            .filter(|e| e.revision > revision)
            .cloned()
            .collect();
        changes.sort_by_key(|e| e.revision);
        Ok(changes)
    }
}
