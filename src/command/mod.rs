//! Status lookup backed by an external command.
//!
//! Each lookup runs the command once. A zero exit status reports the first
//! line of stdout as the status (empty output means the entity is absent);
//! a configured exit code also means absent; any other exit status is a
//! lookup failure.

use std::ffi::OsString;
use std::future::Future;
use std::pin::Pin;

use shell_escape::unix::escape;
use thiserror::Error;
use tokio::process::Command;

use crate::lookup::{LookupError, LookupResult};
use crate::status::StatusSnapshot;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Errors raised while preparing or spawning the lookup command.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CommandError {
    /// Raised when no program was given.
    #[error("lookup command is empty")]
    Empty,
    /// Raised when the program cannot be started.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Error reported by the operating system.
        message: String,
    },
}

impl From<CommandError> for LookupError {
    fn from(value: CommandError) -> Self {
        Self::permanent(value.to_string())
    }
}

/// Future returned by [`CommandRunner::run`].
pub type RunnerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CommandOutput, CommandError>> + Send + 'a>>;

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    fn run<'a>(&'a self, program: &'a str, args: &'a [OsString]) -> RunnerFuture<'a>;
}

/// Real command runner that spawns a child process per call.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run<'a>(&'a self, program: &'a str, args: &'a [OsString]) -> RunnerFuture<'a> {
        Box::pin(async move {
            let output = Command::new(program)
                .args(args)
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|err| CommandError::Spawn {
                    program: program.to_owned(),
                    message: err.to_string(),
                })?;

            Ok(CommandOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}

/// Lookup that derives the remote status from a command's output.
#[derive(Clone, Debug)]
pub struct CommandLookup<R: CommandRunner> {
    runner: R,
    program: String,
    args: Vec<OsString>,
    not_found_exit_code: Option<i32>,
    fail_fast: bool,
}

impl CommandLookup<ProcessCommandRunner> {
    /// Creates a lookup wired to the real process runner.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Empty`] when `command` has no program.
    pub fn with_process_runner(command: Vec<String>) -> Result<Self, CommandError> {
        Self::new(ProcessCommandRunner, command)
    }
}

impl<R: CommandRunner> CommandLookup<R> {
    /// Creates a lookup running `command` (program followed by arguments).
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Empty`] when `command` has no program.
    pub fn new(runner: R, command: Vec<String>) -> Result<Self, CommandError> {
        let mut parts = command.into_iter();
        let program = parts
            .next()
            .filter(|program| !program.trim().is_empty())
            .ok_or(CommandError::Empty)?;
        Ok(Self {
            runner,
            program,
            args: parts.map(OsString::from).collect(),
            not_found_exit_code: None,
            fail_fast: false,
        })
    }

    /// Treats `code` as "entity not found" instead of a failure.
    #[must_use]
    pub const fn not_found_exit_code(mut self, code: Option<i32>) -> Self {
        self.not_found_exit_code = code;
        self
    }

    /// Makes unexpected exit codes abort the wait instead of retrying.
    #[must_use]
    pub const fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Renders the command as a shell-quoted string for diagnostics.
    #[must_use]
    pub fn render(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(
                self.args
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned()),
            )
            .map(|part| escape(part.into()).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the command once and maps its output to a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Permanent`] when the command cannot be spawned
    /// or exits unexpectedly with fail-fast enabled, and
    /// [`LookupError::Transient`] for other unexpected exit codes.
    pub async fn lookup(&self) -> LookupResult<String> {
        let output = self.runner.run(&self.program, &self.args).await?;

        if output.is_success() {
            let stdout = output.stdout.trim();
            return Ok(match stdout.lines().next().map(str::trim) {
                Some(status) if !status.is_empty() => {
                    StatusSnapshot::present(stdout.to_owned(), status)
                }
                _ => StatusSnapshot::absent(),
            });
        }

        if output.code.is_some() && output.code == self.not_found_exit_code {
            return Ok(StatusSnapshot::absent());
        }

        let status_text = output
            .code
            .map_or_else(|| String::from("signal"), |code| code.to_string());
        let message = format!(
            "{} exited with status {status_text}: {}",
            self.program,
            output.stderr.trim()
        );
        if self.fail_fast {
            Err(LookupError::permanent(message))
        } else {
            Err(LookupError::transient(message))
        }
    }
}
