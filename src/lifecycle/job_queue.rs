//! Wait presets for batch job queues.
//!
//! A job queue reports `CREATING`, `UPDATING`, `DELETING`, `DELETED`,
//! `VALID`, or `INVALID`. Queues must be disabled before deletion, and a
//! deleted queue may either report `DELETED` for a while or vanish outright.

use std::time::Duration;

use crate::config::WaitSettings;
use crate::lifecycle::Phase;
use crate::waiter::{SpecError, WaitSpec};

/// Queue is being provisioned.
pub const CREATING: &str = "CREATING";
/// Queue is applying a change.
pub const UPDATING: &str = "UPDATING";
/// Queue is being torn down.
pub const DELETING: &str = "DELETING";
/// Queue has been torn down.
pub const DELETED: &str = "DELETED";
/// Queue is ready.
pub const VALID: &str = "VALID";
/// Queue failed to reach a usable state.
pub const INVALID: &str = "INVALID";
/// Queue state reported right after it is disabled.
pub const DISABLED: &str = "DISABLED";

const SETTLE_DELAY: Duration = Duration::from_secs(30);
const DISABLE_TIMEOUT: Duration = Duration::from_secs(600);
const DISABLE_DELAY: Duration = Duration::from_secs(10);
const DISABLE_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Wait for a newly created queue to become usable.
///
/// # Errors
///
/// Returns [`SpecError`] when `settings` yield an invalid cadence.
pub fn created(settings: &WaitSettings) -> Result<WaitSpec, SpecError> {
    settings
        .builder(Phase::Create)
        .pending([CREATING, UPDATING])
        .target([VALID])
        .initial_delay(SETTLE_DELAY)
        .build()
}

/// Wait for an updated queue to settle.
///
/// # Errors
///
/// Returns [`SpecError`] when `settings` yield an invalid cadence.
pub fn updated(settings: &WaitSettings) -> Result<WaitSpec, SpecError> {
    settings
        .builder(Phase::Update)
        .pending([UPDATING])
        .target([VALID])
        .initial_delay(SETTLE_DELAY)
        .build()
}

/// Wait for a deleted queue to report `DELETED` or disappear.
///
/// # Errors
///
/// Returns [`SpecError`] when `settings` yield an invalid cadence.
pub fn deleted(settings: &WaitSettings) -> Result<WaitSpec, SpecError> {
    settings
        .builder(Phase::Delete)
        .pending([DISABLED, DELETING])
        .target([DELETED])
        .target_absent()
        .initial_delay(SETTLE_DELAY)
        .build()
}

/// Wait for a queue to finish disabling before it can be deleted. Uses a
/// fixed, tighter cadence than the phase waits.
///
/// # Errors
///
/// Never fails for the fixed cadence; the signature matches the other
/// presets.
pub fn disabled() -> Result<WaitSpec, SpecError> {
    WaitSpec::builder()
        .pending([UPDATING])
        .target([VALID])
        .timeout(DISABLE_TIMEOUT)
        .initial_delay(DISABLE_DELAY)
        .poll_interval(DISABLE_POLL_INTERVAL)
        .build()
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::test_support::ScriptedLookup;
    use crate::waiter::{WaitError, wait};

    #[test]
    fn created_uses_create_timeout() {
        let settings = WaitSettings {
            create_timeout_secs: 900,
            ..WaitSettings::default()
        };
        let spec = created(&settings).expect("preset should be valid");

        assert_eq!(spec.timeout, Duration::from_secs(900));
        assert_eq!(spec.initial_delay, SETTLE_DELAY);
        assert_eq!(spec.poll_interval, Duration::from_secs(10));
        assert_eq!(spec.describe_target(), VALID);
    }

    #[test]
    fn deleted_accepts_absence() {
        let spec = deleted(&WaitSettings::default()).expect("preset should be valid");
        assert!(spec.absence_is_target());
        assert_eq!(spec.describe_target(), "DELETED, NOT_FOUND");
    }

    #[test]
    fn invalid_settings_surface_as_spec_errors() {
        let settings = WaitSettings {
            update_timeout_secs: 5,
            ..WaitSettings::default()
        };
        let err = updated(&settings).expect_err("timeout is below the interval");
        assert!(matches!(err, SpecError::TimeoutNotAfterInterval { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn created_queue_converges_after_settling() {
        let lookup = ScriptedLookup::with_statuses(&"queue", &[CREATING, UPDATING, VALID]);
        let spec = created(&WaitSettings::default()).expect("preset should be valid");
        let started = Instant::now();

        let converged = wait(|| lookup.lookup(), &spec)
            .await
            .expect("queue should converge");

        assert_eq!(converged.status.as_str(), VALID);
        assert_eq!(lookup.calls(), 3);
        assert!(started.elapsed() >= Duration::from_secs(50));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_queue_stops_the_wait() {
        let lookup = ScriptedLookup::with_statuses(&"queue", &[CREATING, INVALID]);
        let spec = created(&WaitSettings::default()).expect("preset should be valid");

        let err = wait(|| lookup.lookup(), &spec)
            .await
            .expect_err("queue should be rejected");

        assert!(matches!(
            err,
            WaitError::UnexpectedState { ref status, .. } if status.as_str() == INVALID
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_queue_may_vanish() {
        let lookup: ScriptedLookup<&str> = ScriptedLookup::new();
        lookup.push_status("queue", DISABLED);
        lookup.push_status("queue", DELETING);
        lookup.push_absent();
        let spec = deleted(&WaitSettings::default()).expect("preset should be valid");

        let converged = wait(|| lookup.lookup(), &spec)
            .await
            .expect("queue should disappear");

        assert!(converged.entity.is_none());
        assert!(converged.status.is_not_found());
    }

    #[test]
    fn disabled_uses_tight_cadence() {
        let spec = disabled().expect("preset should be valid");
        assert_eq!(spec.poll_interval, DISABLE_POLL_INTERVAL);
        assert_eq!(spec.initial_delay, DISABLE_DELAY);
        assert_eq!(spec.timeout, DISABLE_TIMEOUT);
    }
}
