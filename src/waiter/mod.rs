//! Convergence waiter.
//!
//! Every create, update, and delete against the remote API is asynchronous:
//! the call returns before the change takes effect. [`wait`] bridges the gap
//! by polling a caller-supplied lookup until the reported status lands in the
//! target set, strays outside the anticipated vocabulary, or the deadline
//! passes. Each invocation is self-contained; concurrent waits share nothing.

pub(crate) mod cadence;
mod error;
mod spec;

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::lookup::{LookupError, LookupResult};
use crate::status::{Status, StatusSnapshot};
use cadence::Cadence;

pub use error::WaitError;
pub use spec::{MAX_DURATION, SpecError, WaitSpec, WaitSpecBuilder};

/// Successful end of a wait.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Converged<T> {
    /// Entity from the final lookup; `None` when absence was the target.
    pub entity: Option<T>,
    /// Target status that ended the wait.
    pub status: Status,
    /// Number of lookups performed.
    pub attempts: u32,
    /// Time spent since the wait started, including the initial delay.
    pub elapsed: Duration,
}

/// Polls `lookup` until the entity converges on `spec.target`.
///
/// The deadline is fixed when the call starts, before `spec.initial_delay`
/// elapses. At least one lookup is always made and no lookup is dispatched
/// after the deadline.
///
/// # Errors
///
/// Returns [`WaitError`] when the spec is invalid, the lookup fails
/// permanently, the entity disappears, reports an unanticipated status, or
/// the deadline passes.
pub async fn wait<T, F, Fut>(lookup: F, spec: &WaitSpec) -> Result<Converged<T>, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LookupResult<T>>,
{
    wait_with_cancel(lookup, spec, &CancellationToken::new()).await
}

/// Same as [`wait`], but returns [`WaitError::Canceled`] promptly once
/// `cancel` fires, abandoning the current sleep or in-flight lookup.
///
/// # Errors
///
/// See [`wait`]; additionally returns [`WaitError::Canceled`].
pub async fn wait_with_cancel<T, F, Fut>(
    mut lookup: F,
    spec: &WaitSpec,
    cancel: &CancellationToken,
) -> Result<Converged<T>, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LookupResult<T>>,
{
    spec.validate()?;

    // Validated durations are bounded by MAX_DURATION, so instant sums cannot overflow.
    let started = Instant::now();
    let deadline = started + spec.timeout;
    let mut progress = Progress::default();

    if !spec.initial_delay.is_zero() && !pause_until(cancel, started + spec.initial_delay).await
    {
        return Err(progress.canceled());
    }

    let mut cadence = Cadence::new(spec.poll_interval, spec.max_poll_interval);
    loop {
        if cancel.is_cancelled() {
            return Err(progress.canceled());
        }
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(progress.canceled()),
            result = lookup() => result,
        };
        progress.attempts = progress.attempts.saturating_add(1);

        match progress.observe(spec, result) {
            Step::Continue => {}
            Step::Failed(err) => {
                debug!(attempts = progress.attempts, error = %err, "wait failed");
                return Err(err);
            }
            Step::Converged(entity, status) => {
                let elapsed = started.elapsed();
                info!(attempts = progress.attempts, %status, ?elapsed, "converged");
                return Ok(Converged {
                    entity,
                    status,
                    attempts: progress.attempts,
                    elapsed,
                });
            }
        }

        let next = Instant::now() + cadence.next_delay();
        if next >= deadline {
            if !pause_until(cancel, deadline).await {
                return Err(progress.canceled());
            }
            let err = progress.timed_out(spec);
            warn!(attempts = progress.attempts, error = %err, "wait timed out");
            return Err(err);
        }
        if !pause_until(cancel, next).await {
            return Err(progress.canceled());
        }
    }
}

/// Sleeps until `until`, returning `false` when `cancel` fires first.
pub(crate) async fn pause_until(cancel: &CancellationToken, until: Instant) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = sleep_until(until) => true,
    }
}

enum Step<T> {
    Continue,
    Converged(Option<T>, Status),
    Failed(WaitError),
}

/// Observations accumulated across the attempts of one wait.
#[derive(Debug, Default)]
struct Progress {
    attempts: u32,
    target_streak: u32,
    not_found_streak: u32,
    last_status: Option<Status>,
    last_error: Option<String>,
}

impl Progress {
    fn observe<T>(&mut self, spec: &WaitSpec, result: LookupResult<T>) -> Step<T> {
        let StatusSnapshot { entity, status } = match result {
            Ok(snapshot) => snapshot,
            Err(LookupError::Transient { message }) => {
                warn!(attempt = self.attempts, error = %message, "transient lookup failure, retrying");
                self.last_error = Some(message);
                return Step::Continue;
            }
            Err(LookupError::Permanent { message }) => {
                return Step::Failed(WaitError::LookupFailed { message });
            }
        };

        debug!(attempt = self.attempts, %status, "observed status");
        self.last_error = None;
        self.last_status = Some(status.clone());

        let reached = if status.is_not_found() {
            spec.absence_is_target()
        } else {
            spec.target.contains(&status)
        };
        if reached {
            self.not_found_streak = 0;
            self.target_streak = self.target_streak.saturating_add(1);
            if self.target_streak >= spec.continuous_target_occurrence {
                return Step::Converged(entity, status);
            }
            return Step::Continue;
        }
        self.target_streak = 0;

        if spec.pending.contains(&status) {
            self.not_found_streak = 0;
            return Step::Continue;
        }

        if status.is_not_found() {
            self.not_found_streak = self.not_found_streak.saturating_add(1);
            if self.not_found_streak >= spec.not_found_checks {
                return Step::Failed(WaitError::NotFound {
                    checks: self.not_found_streak,
                });
            }
            return Step::Continue;
        }

        Step::Failed(WaitError::UnexpectedState {
            status,
            target: spec.describe_target(),
        })
    }

    const fn canceled(&self) -> WaitError {
        WaitError::Canceled {
            attempts: self.attempts,
        }
    }

    fn timed_out(&self, spec: &WaitSpec) -> WaitError {
        WaitError::Timeout {
            timeout: spec.timeout,
            target: spec.describe_target(),
            last_status: self.last_status.clone(),
            last_error: self.last_error.clone(),
        }
    }
}
