//! Configuration stores: where scope declarations come from.
//!
//! The monitor only needs one operation: list the objects whose name starts
//! with a prefix, with their payloads and a version token that changes
//! whenever the object does.
//!
//! - `kubectl`: Kubernetes ConfigMaps, fetched through the `kubectl` binary.
//! - `directory`: a directory tree laid out like a mounted ConfigMap volume.
//! - `mock`: in-memory store for tests.

pub mod directory;
pub mod kubectl;
pub mod mock;

pub use directory::DirectoryStore;
pub use kubectl::{KubeCredentials, KubectlStore};
pub use mock::MemoryStore;

use crate::error::StoreError;
use crate::types::ConfigObject;

/// Source of config objects.
pub trait ConfigStore {
    /// Return every object whose name starts with `prefix`.
    fn list_objects(&self, prefix: &str) -> Result<Vec<ConfigObject>, StoreError>;
}

impl<S: ConfigStore + ?Sized> ConfigStore for &S {
    fn list_objects(&self, prefix: &str) -> Result<Vec<ConfigObject>, StoreError> {
        (**self).list_objects(prefix)
    }
}

impl<S: ConfigStore + ?Sized> ConfigStore for Box<S> {
    fn list_objects(&self, prefix: &str) -> Result<Vec<ConfigObject>, StoreError> {
        (**self).list_objects(prefix)
    }
}
