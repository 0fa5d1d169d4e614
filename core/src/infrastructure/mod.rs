//! Process execution backends.
//!
//! Provides the `CommandRunner` trait with a production implementation that
//! spawns real processes and a mock for tests. Both the kubectl-backed config
//! store and the verification engine run through it.

pub mod runner;

pub use runner::{CommandRunner, Invocation, MockRunner, ProcessOutput, ProcessRunner};
