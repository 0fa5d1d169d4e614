//! Snapshot store: the publication point shared by monitor and verifier.
//!
//! The monitor is the only writer. Publishing writes the snapshot to
//! `<file>.tmp` in the target directory and renames it over `<file>`, so a
//! reader opening the file sees either the previous snapshot or the new one,
//! never a partial write. The temp file always lives next to the target so
//! the rename never crosses a filesystem.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::SnapshotError;
use crate::types::ScopeSnapshot;

const TEMP_EXTENSION: &str = "tmp";


#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    file_name: String,
}


impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, file_name: &str) -> Self {
        SnapshotStore {
            dir: dir.into(),
            file_name: file_name.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The well-known path readers open.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    pub fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.file_name, TEMP_EXTENSION))
    }

    /// Atomically replace the published snapshot.
    ///
    /// Leftover temp files from interrupted publishes are removed first; a
    /// failure there is logged and does not stop the publish. If the rename
    /// fails the temp file is removed and the previous snapshot is left as
    /// it was.
    pub fn publish(&self, snapshot: &ScopeSnapshot) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(&self.dir).map_err(|source| SnapshotError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;
        self.cleanup_temp_files();

        let json = snapshot.to_json_pretty().map_err(SnapshotError::Serialize)?;
        let tmp_path = self.temp_path();
        write_synced(&tmp_path, json.as_bytes()).map_err(|source| SnapshotError::WriteTemp {
            path: tmp_path.clone(),
            source,
        })?;

        let path = self.path();
        if let Err(source) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(SnapshotError::Rename {
                from: tmp_path,
                to: path,
                source,
            });
        }
        info!(path = %path.display(), scopes = snapshot.len(), "published scope snapshot");
        Ok(path)
    }

    /// Load the published snapshot.
    ///
    /// `Ok(None)` means nothing has been published yet. A file that exists
    /// but does not parse is an error, never treated as absent.
    pub fn load(&self) -> Result<Option<ScopeSnapshot>, SnapshotError> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SnapshotError::Read { path, source }),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| SnapshotError::Corrupt { path, source })
    }

    /// Remove every `*.tmp` file in the snapshot directory. Returns how many
    /// were removed; individual failures are logged and skipped.
    pub fn cleanup_temp_files(&self) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "failed to scan for temp files");
                return 0;
            }
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_temp = path.extension().map(|e| e == TEMP_EXTENSION).unwrap_or(false);
            if !is_temp || !path.is_file() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "removed temp file");
                    removed += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temp file"),
            }
        }
        removed
    }
}


fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
