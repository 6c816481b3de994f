//! External process runner.
//!
//! Every agent that talks to a CLI (`acli`, `wtm`) goes through
//! [`CommandRunner`], so tests can swap in a scripted runner instead of
//! shelling out. [`SystemRunner`] is the real thing: one blocking
//! `std::process::Command` per call, no retries, no timeout.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tracing::debug;

use crate::errors::{WorkflowError, WorkflowResult};

/// A single external command: program, arguments, and where to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Variables layered on top of the inherited environment.
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Shell-quoted command line, used in logs and error messages.
    pub fn display(&self) -> String {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        shlex::try_join(words.clone()).unwrap_or_else(|_| words.collect::<Vec<_>>().join(" "))
    }
}

/// Abstraction over process execution.
///
/// `SystemRunner` implements this for real subprocesses. Tests provide a
/// scripted implementation.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    /// Run the command and return its trimmed stdout.
    ///
    /// A non-zero exit status is a [`WorkflowError::CommandFailed`].
    fn run(&self, invocation: &Invocation) -> WorkflowResult<String>;
}

/// JSON helpers available on every [`CommandRunner`].
pub trait CommandRunnerExt: CommandRunner {
    /// Run the command and parse stdout as JSON.
    ///
    /// Returns `Ok(None)` when the command printed nothing.
    fn run_json(&self, invocation: &Invocation) -> WorkflowResult<Option<Value>> {
        let stdout = self.run(invocation)?;
        parse_json_stdout(&invocation.display(), &stdout)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunnerExt for T {}

pub(crate) fn parse_json_stdout(command: &str, stdout: &str) -> WorkflowResult<Option<Value>> {
    if stdout.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(stdout)
        .map(Some)
        .map_err(|e| WorkflowError::malformed(command, e.to_string()))
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> WorkflowResult<String> {
        let command = invocation.display();
        debug!(%command, cwd = ?invocation.cwd, "Running external command");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).envs(&invocation.env);
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|source| WorkflowError::Spawn {
            command: command.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(WorkflowError::CommandFailed {
                command,
                exit_code: output.status.code().unwrap_or(-1),
                stdout: stdout.into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(stdout.trim().to_string())
    }
}
