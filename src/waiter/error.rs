//! Terminal failures of a convergence wait.

use std::time::Duration;

use thiserror::Error;

use crate::status::Status;

use super::spec::SpecError;

/// Errors returned when a wait ends without converging.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum WaitError {
    /// Raised before any lookup when the spec is malformed.
    #[error("invalid wait spec: {0}")]
    InvalidSpec(#[from] SpecError),
    /// Raised when the deadline passes while the entity is still pending.
    #[error(
        "timeout after {timeout:?} waiting for [{target}] (last status: {})",
        .last_status.as_deref().unwrap_or("none")
    )]
    Timeout {
        /// Configured deadline.
        timeout: Duration,
        /// Rendered target set.
        target: String,
        /// Last status observed before the deadline, if any lookup succeeded.
        last_status: Option<Status>,
        /// Last transient lookup error, if the final attempts failed.
        last_error: Option<String>,
    },
    /// Raised when the entity vanished while its presence was expected.
    #[error("entity not found after {checks} consecutive lookups")]
    NotFound {
        /// Consecutive absent observations seen.
        checks: u32,
    },
    /// Raised when the entity reports a status nobody anticipated.
    #[error("unexpected state '{status}', wanted [{target}]")]
    UnexpectedState {
        /// Offending status.
        status: Status,
        /// Rendered target set.
        target: String,
    },
    /// Raised when the lookup fails permanently.
    #[error("lookup failed: {message}")]
    LookupFailed {
        /// Message reported by the lookup.
        message: String,
    },
    /// Raised when the caller cancels the wait.
    #[error("wait canceled after {attempts} lookups")]
    Canceled {
        /// Lookups completed before cancellation.
        attempts: u32,
    },
}

impl WaitError {
    /// Returns the last observed status carried by a timeout.
    #[must_use]
    pub fn last_status(&self) -> Option<&Status> {
        match self {
            Self::Timeout { last_status, .. } => last_status.as_ref(),
            Self::UnexpectedState { status, .. } => Some(status),
            _ => None,
        }
    }

    /// Returns `true` when the wait ran out of time.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` when the entity was missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
