//! Gate: per-request verification decision.
//!
//! For one `(name, digest)` request the gate:
//!
//! 1. Reduces `name` to its bare repository
//! 2. Checks the repository against the published snapshot; no snapshot
//!    means every repository is in scope, a corrupt one is an error
//! 3. Skips verification when the engine has no config file
//! 4. Otherwise runs the engine once and returns its envelope
//!
//! `flags` parses the verifier's command line, `reference` the image name,
//! and `engine` wraps the verification process.

pub mod engine;
pub mod flags;
pub mod reference;

pub use engine::{EngineSettings, VerificationEngine, VerificationEnvelope};
pub use flags::{parse_flags, FlagParse, GateArgs};
pub use reference::ImageReference;

use tracing::{debug, info};

use crate::error::{GateError, SnapshotError};
use crate::exit_codes;
use crate::infrastructure::CommandRunner;
use crate::snapshot::SnapshotStore;

/// How a gate run ended, short of an error.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// The repository is not in scope; the engine was not run.
    Skipped { repository: String },
    /// The engine config file is missing; verification is not set up.
    NotConfigured,
    /// The engine ran and returned a verdict.
    Verified(VerificationEnvelope),
}

impl GateOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            GateOutcome::Skipped { .. } | GateOutcome::NotConfigured => exit_codes::SUCCESS,
            GateOutcome::Verified(envelope) => exit_codes::from_success(envelope.is_success),
        }
    }
}

pub struct Gate<R: CommandRunner> {
    snapshots: SnapshotStore,
    engine: VerificationEngine<R>,
}

impl<R: CommandRunner> Gate<R> {
    pub fn new(snapshots: SnapshotStore, engine: VerificationEngine<R>) -> Self {
        Gate { snapshots, engine }
    }

    pub fn engine(&self) -> &VerificationEngine<R> {
        &self.engine
    }

    /// Whether `repository` needs verification.
    ///
    /// With no snapshot published yet every repository is in scope.
    pub fn decide(&self, repository: &str) -> Result<bool, SnapshotError> {
        debug!(repository, path = %self.snapshots.path().display(), "checking repository scope");
        match self.snapshots.load()? {
            None => {
                info!(path = %self.snapshots.path().display(), "no scope snapshot, verifying everything");
                Ok(true)
            }
            Some(snapshot) => Ok(snapshot.has_scope(repository)),
        }
    }

    pub fn run(&self, name: &str, digest: &str) -> Result<GateOutcome, GateError> {
        let repository = ImageReference::parse(name)?.repository_path();

        if !self.decide(&repository)? {
            info!(%repository, "repository not in scope");
            return Ok(GateOutcome::Skipped { repository });
        }

        if !self.engine.is_configured()? {
            info!(
                config = %self.engine.settings().config_path.display(),
                "verification engine config not found, failing open"
            );
            return Ok(GateOutcome::NotConfigured);
        }

        let envelope = self.engine.verify(name, digest)?;
        Ok(GateOutcome::Verified(envelope))
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use chrono::Utc;

    use super::*;
    use crate::error::EngineError;
    use crate::infrastructure::{MockRunner, ProcessOutput};
    use crate::types::ScopeSnapshot;

    struct Fixture {
        _tmp: tempfile::TempDir,
        snapshots: SnapshotStore,
        engine_config: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let snapshots = SnapshotStore::new(tmp.path().join("shared-data"), "ratify-config.json");
            let engine_config = tmp.path().join("config.json");
            std::fs::write(&engine_config, "{}").unwrap();
            Fixture {
                _tmp: tmp,
                snapshots,
                engine_config,
            }
        }

        fn publish(&self, scopes: &[&str]) {
            let snap = ScopeSnapshot::from_scopes(scopes.iter().copied(), Utc::now());
            self.snapshots.publish(&snap).unwrap();
        }

        fn gate<'a>(&self, runner: &'a MockRunner) -> Gate<&'a MockRunner> {
            self.gate_with_config(runner, &self.engine_config)
        }

        fn gate_with_config<'a>(&self, runner: &'a MockRunner, config: &Path) -> Gate<&'a MockRunner> {
            let settings = EngineSettings {
                binary: PathBuf::from("ratify"),
                config_path: config.to_path_buf(),
                home_dir: PathBuf::from("/root"),
            };
            Gate::new(self.snapshots.clone(), VerificationEngine::new(settings, runner))
        }
    }

    fn success() -> Result<ProcessOutput, String> {
        Ok(ProcessOutput::success(r#"{"isSuccess":true,"result":{}}"#))
    }

    #[test]
    fn decide_fails_open_without_snapshot() {
        let fx = Fixture::new();
        let runner = MockRunner::new();
        let gate = fx.gate(&runner);
        assert!(gate.decide("registry.io/anything").unwrap());
        assert!(gate.decide("").unwrap());
    }

    #[test]
    fn decide_uses_exact_membership() {
        let fx = Fixture::new();
        fx.publish(&["registry.io/app"]);
        let runner = MockRunner::new();
        let gate = fx.gate(&runner);
        assert!(gate.decide("registry.io/app").unwrap());
        assert!(!gate.decide("registry.io/app2").unwrap());
        assert!(!gate.decide("registry.io/App").unwrap());
    }

    #[test]
    fn decide_rejects_corrupt_snapshot() {
        let fx = Fixture::new();
        std::fs::create_dir_all(fx.snapshots.dir()).unwrap();
        std::fs::write(fx.snapshots.path(), "{ truncated").unwrap();
        let runner = MockRunner::new();
        assert!(matches!(
            fx.gate(&runner).decide("registry.io/app"),
            Err(SnapshotError::Corrupt { .. })
        ));
    }

    #[test]
    fn out_of_scope_skips_engine() {
        let fx = Fixture::new();
        fx.publish(&["registry.io/app"]);
        let runner = MockRunner::with_responses(vec![success()]);
        let outcome = fx.gate(&runner).run("registry.io/other:v1", "sha256:abc").unwrap();
        assert_eq!(
            outcome,
            GateOutcome::Skipped {
                repository: "registry.io/other".into()
            }
        );
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn tag_is_ignored_for_scope_match() {
        let fx = Fixture::new();
        fx.publish(&["registry.io/app"]);
        let runner = MockRunner::with_responses(vec![success()]);
        let outcome = fx.gate(&runner).run("registry.io/app:v2", "sha256:abc").unwrap();
        assert_eq!(outcome.exit_code(), 0);
        assert!(matches!(outcome, GateOutcome::Verified(_)));
        // The engine gets the name as given, tag included.
        assert!(runner.invocations()[0].args.contains(&"registry.io/app:v2".to_string()));
    }

    #[test]
    fn missing_engine_config_fails_open() {
        let fx = Fixture::new();
        let runner = MockRunner::with_responses(vec![success()]);
        let gate = fx.gate_with_config(&runner, Path::new("/definitely/missing/config.json"));
        let outcome = gate.run("registry.io/app", "sha256:abc").unwrap();
        assert_eq!(outcome, GateOutcome::NotConfigured);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(runner.call_count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_engine_config_does_not_fail_open() {
        let fx = Fixture::new();
        let looped = fx._tmp.path().join("looped.json");
        std::os::unix::fs::symlink(&looped, &looped).unwrap();
        let runner = MockRunner::with_responses(vec![success()]);
        let err = fx
            .gate_with_config(&runner, &looped)
            .run("registry.io/app", "sha256:abc")
            .unwrap_err();
        assert!(matches!(err, GateError::Engine(EngineError::ConfigCheck { .. })));
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn engine_failure_exits_one() {
        let fx = Fixture::new();
        let runner = MockRunner::with_responses(vec![Ok(ProcessOutput::failure(
            1,
            r#"{"isSuccess":false,"error":"signature missing"}"#,
            "",
        ))]);
        let outcome = fx.gate(&runner).run("registry.io/app", "sha256:abc").unwrap();
        match &outcome {
            GateOutcome::Verified(env) => {
                assert_eq!(env.error.as_deref(), Some("signature missing"))
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    fn unparseable_engine_output_is_error() {
        let fx = Fixture::new();
        let runner = MockRunner::with_responses(vec![Ok(ProcessOutput::success("not json"))]);
        let err = fx.gate(&runner).run("registry.io/app", "sha256:abc").unwrap_err();
        match err {
            GateError::Engine(e @ EngineError::Parse { .. }) => {
                assert_eq!(e.raw_output(), Some("not json"))
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn invalid_name_is_error() {
        let fx = Fixture::new();
        let runner = MockRunner::new();
        assert!(matches!(
            fx.gate(&runner).run("nginx", "sha256:abc"),
            Err(GateError::Reference(_))
        ));
    }
}
