//! Convergence waiting for asynchronous remote provisioning APIs.
//!
//! Remote create, update, and delete calls return before the change takes
//! effect. The [`waiter`] polls a caller-supplied status lookup until the
//! entity reaches a target status, fails, or a deadline passes. The
//! [`retry`] helpers cover propagation lag, [`lifecycle`] holds per-phase
//! presets, and [`command`] backs a lookup with an external command for the
//! `converge` binary.

pub mod command;
pub mod config;
pub mod lifecycle;
pub mod lookup;
pub mod report;
pub mod retry;
pub mod status;
pub mod test_support;
pub mod waiter;

pub use command::{
    CommandError, CommandLookup, CommandOutput, CommandRunner, ProcessCommandRunner,
};
pub use config::{ConfigError, WaitSettings};
pub use lifecycle::Phase;
pub use lookup::{LookupError, LookupResult, find_status};
pub use report::{Outcome, WaitReport};
pub use retry::{RetryError, retry_until_not_found, retry_when, wait_until_stable};
pub use status::{Status, StatusSnapshot};
pub use waiter::{
    Converged, MAX_DURATION, SpecError, WaitError, WaitSpec, WaitSpecBuilder, wait,
    wait_with_cancel,
};
