//! Verification engine wrapper.
//!
//! Runs `<engine> verify -c <config> -s <name> --digest <digest>` and parses
//! the JSON envelope it prints. The engine reports a failed verification
//! with a non-zero exit code while still printing a valid envelope, so a
//! non-zero exit is not an error here: stdout and stderr are concatenated and
//! parsed like any other output.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::infrastructure::{CommandRunner, Invocation, ProcessOutput};

/// The engine's verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationEnvelope {
    pub is_success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}


impl VerificationEnvelope {
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        serde_json::from_str(raw).map_err(|source| EngineError::Parse {
            raw: raw.to_string(),
            source,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}


/// Where the engine lives and how it is run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub binary: PathBuf,
    pub config_path: PathBuf,
    /// Exported to the engine as `HOME`.
    pub home_dir: PathBuf,
}


pub struct VerificationEngine<R: CommandRunner> {
    settings: EngineSettings,
    runner: R,
}


impl<R: CommandRunner> VerificationEngine<R> {
    pub fn new(settings: EngineSettings, runner: R) -> Self {
        VerificationEngine { settings, runner }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Whether the engine config file exists.
    ///
    /// Only a missing file counts as "not configured". Any other failure to
    /// stat it is an error, so an unreadable config never skips
    /// verification.
    pub fn is_configured(&self) -> Result<bool, EngineError> {
        let path = &self.settings.config_path;
        match fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(EngineError::ConfigCheck {
                path: path.clone(),
                source,
            }),
        }
    }

    pub fn invocation(&self, name: &str, digest: &str) -> Invocation {
        let home = path_str(&self.settings.home_dir);
        Invocation::new(&path_str(&self.settings.binary))
            .arg("verify")
            .arg("-c")
            .arg(&path_str(&self.settings.config_path))
            .arg("-s")
            .arg(name)
            .arg("--digest")
            .arg(digest)
            .env("HOME", &home)
    }

    /// Run the engine once and parse its envelope.
    pub fn verify(&self, name: &str, digest: &str) -> Result<VerificationEnvelope, EngineError> {
        let invocation = self.invocation(name, digest);
        info!(command = %invocation, "executing verification engine");
        let output = self.runner.run(&invocation)?;
        let raw = capture(output)?;
        VerificationEnvelope::parse(&raw)
    }
}


/// Pick the text to parse from a finished process.
///
/// Zero exit: stdout. Non-zero exit: stdout followed by stderr, unless both
/// are empty, which is an error.
pub fn capture(output: ProcessOutput) -> Result<String, EngineError> {
    if output.is_success() {
        debug!(stdout = %output.stdout, "engine output");
        return Ok(output.stdout);
    }
    let status = output.status_label();
    let combined = output.stdout + &output.stderr;
    if combined.is_empty() {
        return Err(EngineError::NoOutput { status });
    }
    debug!(%status, output = %combined, "engine output (with stderr)");
    Ok(combined)
}


fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
