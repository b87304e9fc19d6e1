/// Change subscriptions for a single execution context
///
/// Subscriptions are owned handles: dropping a `Subscription` removes its
/// callback, which ties listener lifetime to whatever owns the handle.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use crate::storage::StorageEvent;

/// Callback invoked with every foreign change to the subscribed key
pub type ChangeCallback = Box<dyn FnMut(&StorageEvent)>;

struct Entry {
    id: u64,
    key: String,
    callback: ChangeCallback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
    dispatching: bool,
    // ids dropped while their callbacks were checked out for dispatch
    dropped: HashSet<u64>,
}

/// The set of live subscriptions of one store handle
#[derive(Clone, Default)]
pub struct Subscribers {
    registry: Rc<RefCell<Registry>>,
}

impl Subscribers {
    pub fn add(&self, key: &str, callback: ChangeCallback) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.entries.push(Entry {
            id,
            key: key.to_string(),
            callback,
        });

        Subscription {
            registry: Rc::downgrade(&self.registry),
            id,
            key: key.to_string(),
        }
    }

    /// Invoke every callback subscribed to the event's key
    ///
    /// Callbacks may subscribe or drop subscriptions while running; those
    /// changes take effect for the next event.
    pub fn dispatch(&self, event: &StorageEvent) {
        let mut checked_out = {
            let mut registry = self.registry.borrow_mut();
            registry.dispatching = true;
            std::mem::take(&mut registry.entries)
        };

        for entry in checked_out.iter_mut().filter(|e| e.key == event.key) {
            (entry.callback)(event);
        }

        let mut registry = self.registry.borrow_mut();
        let dropped = std::mem::take(&mut registry.dropped);
        checked_out.retain(|e| !dropped.contains(&e.id));
        let added = std::mem::take(&mut registry.entries);
        checked_out.extend(added);
        registry.entries = checked_out;
        registry.dispatching = false;
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for a registered change callback; dropping it unsubscribes
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    id: u64,
    key: String,
}

impl Subscription {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.borrow_mut();
        if registry.dispatching {
            registry.dropped.insert(self.id);
        }
        registry.entries.retain(|e| e.id != self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish()
    }
}
