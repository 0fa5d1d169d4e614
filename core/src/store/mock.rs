//! In-memory config store for testing.
//!
//! Holds objects in a map behind a `RefCell` so a test can keep a shared
//! reference, mutate the store between cycles, and hand the same store to an
//! `Aggregator`.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use super::ConfigStore;
use crate::error::StoreError;
use crate::types::ConfigObject;

/// A test-double store with controllable contents and failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RefCell<BTreeMap<String, ConfigObject>>,
    fail_next: RefCell<Option<String>>,
    list_calls: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with some objects already present.
    pub fn with_objects(objects: Vec<ConfigObject>) -> Self {
        let store = Self::new();
        for obj in objects {
            store.upsert(obj);
        }
        store
    }

    /// Insert or replace an object by name.
    pub fn upsert(&self, object: ConfigObject) {
        self.objects.borrow_mut().insert(object.name.clone(), object);
    }

    pub fn remove(&self, name: &str) -> Option<ConfigObject> {
        self.objects.borrow_mut().remove(name)
    }

    /// Make the next `list_objects` call fail with the given message.
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.borrow_mut() = Some(message.to_string());
    }

    /// Number of `list_objects` calls so far, failed ones included.
    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }
}

impl ConfigStore for MemoryStore {
    fn list_objects(&self, prefix: &str) -> Result<Vec<ConfigObject>, StoreError> {
        self.list_calls.set(self.list_calls.get() + 1);
        if let Some(message) = self.fail_next.borrow_mut().take() {
            return Err(StoreError::Unavailable(message));
        }
        Ok(self
            .objects
            .borrow()
            .values()
            .filter(|obj| obj.name.starts_with(prefix))
            .cloned()
            .collect())
    }
}
