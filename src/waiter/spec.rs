//! Caller-supplied description of what a wait is waiting for.

use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;

use crate::status::Status;

/// Longest timeout, initial delay, or backoff cap a [`WaitSpec`] accepts.
pub const MAX_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Pending and target vocabularies plus the cadence and deadline of a wait.
///
/// Putting [`Status::NOT_FOUND`] in `target` turns the wait into a deletion
/// wait; putting it in `pending` tolerates an entity that has not become
/// visible yet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WaitSpec {
    /// Statuses meaning the operation is still in progress.
    pub pending: BTreeSet<Status>,
    /// Statuses meaning the operation completed.
    pub target: BTreeSet<Status>,
    /// Hard wall-clock bound measured from the start of the wait.
    pub timeout: Duration,
    /// Minimum delay between consecutive lookups.
    pub poll_interval: Duration,
    /// Upper bound for the delay when it backs off; `None` keeps it fixed.
    pub max_poll_interval: Option<Duration>,
    /// Delay before the first lookup.
    pub initial_delay: Duration,
    /// Consecutive absent observations tolerated before failing.
    pub not_found_checks: u32,
    /// Consecutive target observations required before succeeding.
    pub continuous_target_occurrence: u32,
}

impl WaitSpec {
    /// Starts a builder for a [`WaitSpec`].
    #[must_use]
    pub fn builder() -> WaitSpecBuilder {
        WaitSpecBuilder::new()
    }

    /// Returns `true` when absence of the entity satisfies the wait.
    #[must_use]
    pub fn absence_is_target(&self) -> bool {
        self.target.iter().any(Status::is_not_found)
    }

    /// Renders the target set for error messages.
    #[must_use]
    pub fn describe_target(&self) -> String {
        self.target
            .iter()
            .map(Status::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Checks the invariants the waiter relies on.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] naming the first violated invariant.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.target.is_empty() {
            return Err(SpecError::EmptyTarget);
        }
        if let Some(status) = self.pending.intersection(&self.target).next() {
            return Err(SpecError::OverlappingStatus {
                status: status.to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(SpecError::ZeroTimeout);
        }
        if self.poll_interval.is_zero() {
            return Err(SpecError::ZeroPollInterval);
        }
        if self.timeout <= self.poll_interval {
            return Err(SpecError::TimeoutNotAfterInterval {
                timeout: self.timeout,
                poll_interval: self.poll_interval,
            });
        }
        for (field, value) in [
            ("timeout", Some(self.timeout)),
            ("initial_delay", Some(self.initial_delay)),
            ("max_poll_interval", self.max_poll_interval),
        ] {
            if value.is_some_and(|duration| duration > MAX_DURATION) {
                return Err(SpecError::DurationTooLong {
                    field: String::from(field),
                    limit: MAX_DURATION,
                });
            }
        }
        if let Some(max) = self.max_poll_interval
            && max < self.poll_interval
        {
            return Err(SpecError::MaxIntervalBelowInterval {
                max_poll_interval: max,
                poll_interval: self.poll_interval,
            });
        }
        if self.not_found_checks == 0 {
            return Err(SpecError::ZeroCount {
                field: String::from("not_found_checks"),
            });
        }
        if self.continuous_target_occurrence == 0 {
            return Err(SpecError::ZeroCount {
                field: String::from("continuous_target_occurrence"),
            });
        }
        Ok(())
    }
}

/// Builder for [`WaitSpec`] that validates on construction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WaitSpecBuilder {
    pending: BTreeSet<Status>,
    target: BTreeSet<Status>,
    timeout: Duration,
    poll_interval: Duration,
    max_poll_interval: Option<Duration>,
    initial_delay: Duration,
    not_found_checks: u32,
    continuous_target_occurrence: u32,
}

impl Default for WaitSpecBuilder {
    fn default() -> Self {
        Self {
            pending: BTreeSet::new(),
            target: BTreeSet::new(),
            timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
            max_poll_interval: None,
            initial_delay: Duration::ZERO,
            not_found_checks: 1,
            continuous_target_occurrence: 1,
        }
    }
}

impl WaitSpecBuilder {
    /// Creates a builder with single-observation thresholds and no delays.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds in-progress statuses.
    #[must_use]
    pub fn pending<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Status>,
    {
        self.pending.extend(statuses.into_iter().map(Into::into));
        self
    }

    /// Adds completion statuses.
    #[must_use]
    pub fn target<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Status>,
    {
        self.target.extend(statuses.into_iter().map(Into::into));
        self
    }

    /// Treats absence of the entity as completion.
    #[must_use]
    pub fn target_absent(mut self) -> Self {
        self.target.insert(Status::not_found());
        self
    }

    /// Sets the overall deadline.
    #[must_use]
    pub const fn timeout(mut self, value: Duration) -> Self {
        self.timeout = value;
        self
    }

    /// Sets the minimum delay between lookups.
    #[must_use]
    pub const fn poll_interval(mut self, value: Duration) -> Self {
        self.poll_interval = value;
        self
    }

    /// Lets the delay double after each attempt up to `value`.
    #[must_use]
    pub const fn max_poll_interval(mut self, value: Option<Duration>) -> Self {
        self.max_poll_interval = value;
        self
    }

    /// Sets the delay before the first lookup.
    #[must_use]
    pub const fn initial_delay(mut self, value: Duration) -> Self {
        self.initial_delay = value;
        self
    }

    /// Sets how many consecutive absences are tolerated.
    #[must_use]
    pub const fn not_found_checks(mut self, value: u32) -> Self {
        self.not_found_checks = value;
        self
    }

    /// Sets how many consecutive target observations are required.
    #[must_use]
    pub const fn continuous_target_occurrence(mut self, value: u32) -> Self {
        self.continuous_target_occurrence = value;
        self
    }

    /// Builds and validates the [`WaitSpec`].
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] when the assembled spec violates an invariant.
    pub fn build(self) -> Result<WaitSpec, SpecError> {
        let spec = WaitSpec {
            pending: self.pending,
            target: self.target,
            timeout: self.timeout,
            poll_interval: self.poll_interval,
            max_poll_interval: self.max_poll_interval,
            initial_delay: self.initial_delay,
            not_found_checks: self.not_found_checks,
            continuous_target_occurrence: self.continuous_target_occurrence,
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Invariant violations in a [`WaitSpec`]. These are programming errors and
/// are never retried.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SpecError {
    /// No completion status was given.
    #[error("target status set is empty")]
    EmptyTarget,
    /// A status appears in both the pending and target sets.
    #[error("status '{status}' is both pending and target")]
    OverlappingStatus {
        /// Status present in both sets.
        status: String,
    },
    /// The deadline is zero.
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
    /// The poll interval is zero, which would spin.
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,
    /// The deadline does not leave room for a second attempt.
    #[error("timeout {timeout:?} must exceed poll interval {poll_interval:?}")]
    TimeoutNotAfterInterval {
        /// Configured deadline.
        timeout: Duration,
        /// Configured poll interval.
        poll_interval: Duration,
    },
    /// The backoff cap sits below the starting interval.
    #[error("max poll interval {max_poll_interval:?} is below poll interval {poll_interval:?}")]
    MaxIntervalBelowInterval {
        /// Configured cap.
        max_poll_interval: Duration,
        /// Configured poll interval.
        poll_interval: Duration,
    },
    /// A duration exceeds [`MAX_DURATION`].
    #[error("{field} must not exceed {limit:?}")]
    DurationTooLong {
        /// Name of the offending field.
        field: String,
        /// Accepted maximum.
        limit: Duration,
    },
    /// A consecutive-observation threshold is zero.
    #[error("{field} must be at least 1")]
    ZeroCount {
        /// Name of the offending field.
        field: String,
    },
}
