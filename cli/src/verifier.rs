//! scope-verifier: per-image verification hook.
//!
//! ```text
//! scope-verifier -name registry.io/app:v1 -digest sha256:...
//! ```
//!
//! Exit 0 lets the image through, exit 1 blocks it. Only the verdict goes to
//! stdout; logs go to stderr.

mod logging;

use std::io::Write;
use std::process;

use scope_gate_core::error::{EngineError, GateError};
use scope_gate_core::exit_codes;
use scope_gate_core::gate::flags::USAGE;
use scope_gate_core::gate::{parse_flags, FlagParse, GateArgs, VerificationEngine};
use scope_gate_core::infrastructure::{CommandRunner, ProcessRunner};
use scope_gate_core::settings::VerifierSettings;
use scope_gate_core::{Gate, GateOutcome, SnapshotStore};

fn build_gate<R: CommandRunner>(settings: &VerifierSettings, runner: R) -> Gate<R> {
    let snapshots = SnapshotStore::new(settings.snapshot_dir.clone(), &settings.snapshot_file);
    Gate::new(snapshots, VerificationEngine::new(settings.engine.clone(), runner))
}

/// Write what the runtime sees for a finished gate run and return the exit
/// code.
fn report(out: &mut impl Write, result: Result<GateOutcome, GateError>) -> i32 {
    match result {
        Ok(GateOutcome::Skipped { repository }) => {
            let _ = writeln!(out, "Repository '{}' is not in scope. Skip checking.", repository);
            exit_codes::SUCCESS
        }
        Ok(GateOutcome::NotConfigured) => {
            let _ = writeln!(out, "verification engine config file not found. failing open");
            exit_codes::SUCCESS
        }
        Ok(GateOutcome::Verified(envelope)) => {
            match envelope.to_json_pretty() {
                Ok(pretty) => {
                    let _ = writeln!(out, "{}", pretty);
                }
                Err(_) => {
                    let _ = writeln!(out, "{:?}", envelope);
                }
            }
            let verdict = if envelope.is_success {
                "verification succeeded"
            } else {
                "verification failed"
            };
            let _ = writeln!(out, "{}", verdict);
            exit_codes::from_success(envelope.is_success)
        }
        Err(GateError::Engine(e @ EngineError::Parse { .. })) => {
            let _ = writeln!(out, "Error: {}", e);
            if let Some(raw) = e.raw_output() {
                let _ = writeln!(out, "Raw output: {}", raw);
            }
            exit_codes::FAILURE
        }
        Err(e) => {
            let _ = writeln!(out, "Error: {}", e);
            exit_codes::FAILURE
        }
    }
}

fn run(args: GateArgs) -> i32 {
    if let Some(media_type) = &args.stdin_media_type {
        tracing::debug!(media_type = %media_type, "ignoring stdin media type");
    }
    let settings = VerifierSettings::from_env();
    let gate = build_gate(&settings, ProcessRunner);
    let result = gate.run(&args.name, &args.digest);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    report(&mut out, result)
}

fn main() {
    logging::init("warn");
    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    let code = match parse_flags(&arg_refs) {
        Ok(FlagParse::Run(args)) => run(args),
        Ok(FlagParse::Help) => {
            println!("{}", USAGE);
            exit_codes::SUCCESS
        }
        Err(e) => {
            println!("Error: {}", e);
            println!("{}", USAGE);
            exit_codes::FAILURE
        }
    };
    process::exit(code);
}
