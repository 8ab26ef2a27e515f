//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::future::{Ready, ready};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::command::{CommandError, CommandOutput, CommandRunner, RunnerFuture};
use crate::lookup::{LookupError, LookupResult};
use crate::status::StatusSnapshot;

/// Scripted status lookup that replays queued results in FIFO order.
///
/// Once the queue is drained, the last queued result repeats, so a single
/// pending status models an entity that never converges.
#[derive(Debug)]
pub struct ScriptedLookup<T> {
    responses: Arc<Mutex<VecDeque<LookupResult<T>>>>,
    last: Arc<Mutex<Option<LookupResult<T>>>>,
    calls: Arc<AtomicU32>,
}

impl<T> Clone for ScriptedLookup<T> {
    fn clone(&self) -> Self {
        Self {
            responses: Arc::clone(&self.responses),
            last: Arc::clone(&self.last),
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<T> Default for ScriptedLookup<T> {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            last: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl<T: Clone> ScriptedLookup<T> {
    /// Creates a lookup with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a lookup reporting each status in turn with `entity`.
    #[must_use]
    pub fn with_statuses(entity: &T, statuses: &[&str]) -> Self {
        let lookup = Self::new();
        for status in statuses {
            lookup.push_status(entity.clone(), *status);
        }
        lookup
    }

    /// Queues a snapshot for an existing entity.
    pub fn push_status(&self, entity: T, status: &str) {
        self.push(Ok(StatusSnapshot::present(entity, status)));
    }

    /// Queues an absent snapshot.
    pub fn push_absent(&self) {
        self.push(Ok(StatusSnapshot::absent()));
    }

    /// Queues a lookup error.
    pub fn push_error(&self, error: LookupError) {
        self.push(Err(error));
    }

    /// Returns how many times the lookup has been invoked.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Produces the next scripted result.
    ///
    /// Returns a permanent error when nothing was ever queued.
    pub fn lookup(&self) -> Ready<LookupResult<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let result = match next {
            Some(result) => {
                *last = Some(result.clone());
                result
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(LookupError::permanent("script exhausted"))),
        };
        ready(result)
    }

    fn push(&self, result: LookupResult<T>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Arc<Mutex<VecDeque<Result<CommandOutput, CommandError>>>>,
    invocations: Arc<Mutex<Vec<CommandInvocation>>>,
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Pushes an output with explicit exit code and streams.
    pub fn push_output(&self, code: Option<i32>, stdout: &str, stderr: &str) {
        self.push(Ok(CommandOutput {
            code,
            stdout: stdout.to_owned(),
            stderr: stderr.to_owned(),
        }));
    }

    /// Pushes a spawn failure.
    pub fn push_spawn_error(&self, program: &str) {
        self.push(Err(CommandError::Spawn {
            program: program.to_owned(),
            message: String::from("No such file or directory"),
        }));
    }

    fn push(&self, response: Result<CommandOutput, CommandError>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(&'a self, program: &'a str, args: &'a [OsString]) -> RunnerFuture<'a> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CommandInvocation {
                program: program.to_owned(),
                args: args.to_vec(),
            });
        let response = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(CommandError::Spawn {
                    program: program.to_owned(),
                    message: String::from("no scripted response"),
                })
            });
        Box::pin(ready(response))
    }
}
