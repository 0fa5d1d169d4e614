//! A directory tree as a config store.
//!
//! Layout mirrors a ConfigMap mounted as a volume: `<root>/<object>/<key>`,
//! one file per payload. Entries starting with `.` (including the `..data`
//! links Kubernetes creates) are ignored. The version token is a digest of
//! the object's keys and contents, so any edit changes it.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use super::ConfigStore;
use crate::error::StoreError;
use crate::types::ConfigObject;

#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_object(&self, name: &str, dir: &Path) -> Result<ConfigObject, StoreError> {
        let mut data = BTreeMap::new();
        for entry in read_dir(dir)? {
            let path = entry.path();
            let key = entry.file_name().to_string_lossy().to_string();
            if key.starts_with('.') || !path.is_file() {
                continue;
            }
            let bytes = fs::read(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            data.insert(key, String::from_utf8_lossy(&bytes).into_owned());
        }
        Ok(ConfigObject {
            name: name.to_string(),
            version: content_version(&data),
            data,
        })
    }
}

impl ConfigStore for DirectoryStore {
    fn list_objects(&self, prefix: &str) -> Result<Vec<ConfigObject>, StoreError> {
        let mut objects = Vec::new();
        for entry in read_dir(&self.root)? {
            let name = entry.file_name().to_string_lossy().to_string();
            let path = entry.path();
            if name.starts_with('.') || !name.starts_with(prefix) || !path.is_dir() {
                continue;
            }
            objects.push(self.read_object(&name, &path)?);
        }
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }
}

fn read_dir(dir: &Path) -> Result<Vec<fs::DirEntry>, StoreError> {
    let io_err = |source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    };
    fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)
}

fn content_version(data: &BTreeMap<String, String>) -> String {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, object: &str, key: &str, value: &str) {
        let dir = root.join(object);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(key), value).unwrap();
    }

    #[test]
    fn lists_matching_object_directories() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "scoped-config-b", "k", r#"{"scopes":["r2"]}"#);
        write(tmp.path(), "scoped-config-a", "k", r#"{"scopes":["r1"]}"#);
        write(tmp.path(), "other", "k", "{}");
        fs::write(tmp.path().join("scoped-config-file"), "not a dir").unwrap();

        let store = DirectoryStore::new(tmp.path());
        let objects = store.list_objects("scoped-config-").unwrap();
        let names: Vec<_> = objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["scoped-config-a", "scoped-config-b"]);
        assert_eq!(objects[0].data["k"], r#"{"scopes":["r1"]}"#);
    }

    #[test]
    fn skips_hidden_entries() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "scoped-config-a", "k", "{}");
        write(tmp.path(), "scoped-config-a", "..data", "ignored");
        write(tmp.path(), ".scoped-config-hidden", "k", "{}");

        let objects = DirectoryStore::new(tmp.path()).list_objects("").unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].data.len(), 1);
    }

    #[test]
    fn version_tracks_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(tmp.path());
        write(tmp.path(), "scoped-config-a", "k", r#"{"scopes":["r1"]}"#);
        let v1 = store.list_objects("").unwrap()[0].version.clone();
        let again = store.list_objects("").unwrap()[0].version.clone();
        assert_eq!(v1, again);

        write(tmp.path(), "scoped-config-a", "k", r#"{"scopes":["r1","r2"]}"#);
        let v2 = store.list_objects("").unwrap()[0].version.clone();
        assert_ne!(v1, v2);
    }

    #[test]
    fn missing_root_is_error() {
        let store = DirectoryStore::new("/definitely/not/here");
        assert!(matches!(store.list_objects(""), Err(StoreError::Io { .. })));
    }
}
