//! Delay schedule between lookup attempts.

use std::time::Duration;

/// Yields the delay before each retry, doubling up to a cap when one is set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Cadence {
    next: Duration,
    max: Option<Duration>,
}

impl Cadence {
    pub(crate) const fn new(poll_interval: Duration, max: Option<Duration>) -> Self {
        Self {
            next: poll_interval,
            max,
        }
    }

    pub(crate) fn next_delay(&mut self) -> Duration {
        let current = self.next;
        if let Some(max) = self.max {
            self.next = current.checked_mul(2).map_or(max, |doubled| doubled.min(max));
        }
        current
    }
}
