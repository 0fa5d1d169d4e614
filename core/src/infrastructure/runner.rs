//! Command runner abstraction for executing external programs.
//!
//! `CommandRunner` is the trait the config store and the verification engine
//! use to run processes. `ProcessRunner` is the production implementation.
//! `MockRunner` is the test double that records invocations and returns
//! preset outputs.
//!
//! A process that starts and exits non-zero is returned as a normal
//! `ProcessOutput`; only a failure to launch is an error.

use std::cell::RefCell;
use std::fmt;
use std::process::Command;

use tracing::debug;

use crate::error::RunnerError;

/// A fully described process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Variables added on top of the inherited environment.
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: &str) -> Self {
        Invocation {
            program: program.to_string(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// What a finished process left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(stdout: &str) -> Self {
        ProcessOutput {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stdout: &str, stderr: &str) -> Self {
        ProcessOutput {
            code: Some(code),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Human-readable exit status for error messages.
    pub fn status_label(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "signal".to_string(),
        }
    }
}

/// Trait for running external programs synchronously.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, RunnerError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, RunnerError> {
        (**self).run(invocation)
    }
}

/// Production runner backed by `std::process::Command`. Blocks until the
/// child exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, RunnerError> {
        debug!(command = %invocation, "running command");
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        cmd.envs(invocation.envs.iter().cloned());
        let output = cmd.output().map_err(|source| RunnerError::Launch {
            program: invocation.program.clone(),
            source,
        })?;
        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Test-double runner that records invocations and returns pre-configured
/// responses in order. When the responses run out it reports success with
/// empty output.
pub struct MockRunner {
    responses: RefCell<Vec<Result<ProcessOutput, String>>>,
    invocations: RefCell<Vec<Invocation>>,
}

impl MockRunner {
    pub fn with_responses(responses: Vec<Result<ProcessOutput, String>>) -> Self {
        let mut reversed = responses;
        reversed.reverse();
        MockRunner {
            responses: RefCell::new(reversed),
            invocations: RefCell::new(Vec::new()),
        }
    }

    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Queue another response after the ones already queued.
    pub fn push_response(&self, response: Result<ProcessOutput, String>) {
        self.responses.borrow_mut().insert(0, response);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.invocations.borrow().len()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, RunnerError> {
        self.invocations.borrow_mut().push(invocation.clone());
        match self.responses.borrow_mut().pop() {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(RunnerError::Launch {
                program: invocation.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, message),
            }),
            None => Ok(ProcessOutput::success("")),
        }
    }
}
