//! Settings for the monitor and the verifier.
//!
//! The monitor reads an optional YAML file on top of built-in defaults; the
//! command line can override either. The verifier is launched by the
//! container runtime with a fixed flag set, so its paths come from the
//! environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::gate::EngineSettings;

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_PREFIX: &str = "scoped-config-";
pub const DEFAULT_INTERVAL_SECS: u64 = 10;
/// Where the monitor writes the snapshot.
pub const DEFAULT_SHARED_DIR: &str = "/shared-data";
/// The same volume as seen from the verifier.
pub const DEFAULT_SNAPSHOT_DIR: &str = "/var/shared-data";
pub const DEFAULT_SNAPSHOT_FILE: &str = "ratify-config.json";
pub const DEFAULT_ENGINE_BIN: &str = "/root/.ratify/bin/ratify";
pub const DEFAULT_ENGINE_CONFIG: &str = "/root/.ratify/bin/config.json";
pub const DEFAULT_ENGINE_HOME: &str = "/root";

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorSettings {
    pub namespace: String,
    pub prefix: String,
    pub interval_secs: u64,
    pub shared_dir: PathBuf,
    pub file_name: String,
    pub kubectl: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,
    pub request_timeout: String,
    /// Read objects from this directory instead of the cluster.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings {
            namespace: DEFAULT_NAMESPACE.into(),
            prefix: DEFAULT_PREFIX.into(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            shared_dir: PathBuf::from(DEFAULT_SHARED_DIR),
            file_name: DEFAULT_SNAPSHOT_FILE.into(),
            kubectl: "kubectl".into(),
            kubeconfig: None,
            request_timeout: "30s".into(),
            store_dir: None,
        }
    }
}

impl MonitorSettings {
    /// Load settings from a YAML file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.interval_secs == 0 {
            return Err(SettingsError::Invalid {
                field: "interval_secs",
                reason: "must be at least 1".into(),
            });
        }
        if self.prefix.is_empty() {
            return Err(SettingsError::Invalid {
                field: "prefix",
                reason: "must not be empty".into(),
            });
        }
        if self.namespace.is_empty() {
            return Err(SettingsError::Invalid {
                field: "namespace",
                reason: "must not be empty".into(),
            });
        }
        if self.file_name.is_empty() || self.file_name.contains('/') {
            return Err(SettingsError::Invalid {
                field: "file_name",
                reason: format!("'{}' is not a plain file name", self.file_name),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

pub const ENV_SNAPSHOT_DIR: &str = "SCOPE_GATE_SNAPSHOT_DIR";
pub const ENV_SNAPSHOT_FILE: &str = "SCOPE_GATE_SNAPSHOT_FILE";
pub const ENV_ENGINE_BIN: &str = "SCOPE_GATE_ENGINE_BIN";
pub const ENV_ENGINE_CONFIG: &str = "SCOPE_GATE_ENGINE_CONFIG";
pub const ENV_ENGINE_HOME: &str = "SCOPE_GATE_ENGINE_HOME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
    pub snapshot_dir: PathBuf,
    pub snapshot_file: String,
    pub engine: EngineSettings,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        VerifierSettings {
            snapshot_dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
            snapshot_file: DEFAULT_SNAPSHOT_FILE.into(),
            engine: EngineSettings {
                binary: PathBuf::from(DEFAULT_ENGINE_BIN),
                config_path: PathBuf::from(DEFAULT_ENGINE_CONFIG),
                home_dir: PathBuf::from(DEFAULT_ENGINE_HOME),
            },
        }
    }
}

impl VerifierSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from a variable lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut s = Self::default();
        if let Some(v) = get(ENV_SNAPSHOT_DIR) {
            s.snapshot_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_SNAPSHOT_FILE) {
            s.snapshot_file = v;
        }
        if let Some(v) = get(ENV_ENGINE_BIN) {
            s.engine.binary = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_ENGINE_CONFIG) {
            s.engine.config_path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_ENGINE_HOME) {
            s.engine.home_dir = PathBuf::from(v);
        }
        s
    }
}
