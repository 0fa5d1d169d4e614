use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Process execution
// ---------------------------------------------------------------------------

/// A process could not be started. A process that started and exited
/// non-zero is not an error at this level.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Configuration stores
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error("kubectl exited with {status}: {stderr}")]
    Kubectl { status: String, stderr: String },
    #[error("failed to decode object list: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Snapshot store
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to create snapshot directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write temp file {path}: {source}")]
    WriteTemp {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to list config objects: {0}")]
    List(#[from] StoreError),
    #[error("failed to publish snapshot: {0}")]
    Publish(#[from] SnapshotError),
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("invalid reference '{0}': missing registry or repository")]
    MissingRepository(String),
    #[error("invalid reference '{reference}': invalid registry '{registry}'")]
    InvalidRegistry { reference: String, registry: String },
    #[error("invalid reference '{reference}': invalid repository '{repository}'")]
    InvalidRepository { reference: String, repository: String },
    #[error("invalid reference '{reference}': invalid tag '{tag}'")]
    InvalidTag { reference: String, tag: String },
    #[error("invalid reference '{reference}': invalid digest '{digest}'")]
    InvalidDigest { reference: String, digest: String },
}

/// Problems with the verifier's command-line flags.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlagError {
    #[error("-{0} flag is required")]
    Required(&'static str),
    #[error("flag needs an argument: -{0}")]
    MissingValue(String),
    #[error("flag provided but not defined: -{0}")]
    Unknown(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Launch(#[from] RunnerError),
    #[error("cannot check verification engine config {path}: {source}")]
    ConfigCheck {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("verification engine exited with {status} and produced no output")]
    NoOutput { status: String },
    #[error("failed to parse verification engine output: {source}")]
    Parse {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EngineError {
    /// The unparsed engine output, when there was any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            EngineError::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error("error checking repository scope: {0}")]
    Scope(#[from] SnapshotError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
