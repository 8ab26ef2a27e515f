//! Retry helpers for remote propagation lag.
//!
//! A freshly created resource is often not visible to every API endpoint
//! straight away, so follow-up calls fail with "does not exist" errors for a
//! while. These helpers retry such calls, wait for a deleted resource to
//! disappear, or wait for a read to stop changing between observations.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::lookup::LookupError;
use crate::status::StatusSnapshot;
use crate::waiter::cadence::Cadence;
use crate::waiter::{WaitError, WaitSpec, pause_until, wait_with_cancel};

/// Default bound for propagation retries.
pub const PROPAGATION_TIMEOUT: Duration = Duration::from_secs(120);

const RETRY_INITIAL_DELAY: Duration = Duration::from_millis(200);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);
const PROPAGATION_POLL_INTERVAL: Duration = Duration::from_secs(2);

const PRESENT: &str = "PRESENT";
const CHANGING: &str = "CHANGING";
const STABLE: &str = "STABLE";

/// Errors returned by [`retry_when`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RetryError<E> {
    /// The operation failed with an error that is not retried.
    #[error("operation failed: {0}")]
    Failed(E),
    /// The deadline passed while the operation kept failing.
    #[error("timeout after {timeout:?} retrying operation: {last}")]
    Timeout {
        /// Configured deadline.
        timeout: Duration,
        /// Error returned by the final attempt.
        last: E,
    },
    /// The caller canceled the retry loop.
    #[error("retry canceled")]
    Canceled,
}

/// Runs `operation`, retrying with exponential backoff while its error
/// satisfies `is_retryable` and the deadline has not passed. A `timeout` too
/// large to represent as an instant leaves the retries unbounded.
///
/// # Errors
///
/// Returns [`RetryError::Failed`] for a non-retryable error,
/// [`RetryError::Timeout`] with the last error once the deadline would be
/// exceeded, and [`RetryError::Canceled`] when `cancel` fires.
pub async fn retry_when<T, E, F, Fut, P>(
    timeout: Duration,
    cancel: &CancellationToken,
    mut operation: F,
    is_retryable: P,
) -> Result<T, RetryError<E>>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let deadline = Instant::now().checked_add(timeout);
    let mut cadence = Cadence::new(RETRY_INITIAL_DELAY, Some(RETRY_MAX_DELAY));
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Canceled);
        }
        attempt = attempt.saturating_add(1);
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RetryError::Canceled),
            result = operation() => result,
        };
        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retryable(&err) {
            return Err(RetryError::Failed(err));
        }

        let next = Instant::now() + cadence.next_delay();
        if deadline.is_some_and(|limit| next >= limit) {
            return Err(RetryError::Timeout { timeout, last: err });
        }
        debug!(attempt, error = %err, "retryable error");
        if !pause_until(cancel, next).await {
            return Err(RetryError::Canceled);
        }
    }
}

/// Polls `find` until it reports the entity as gone.
///
/// # Errors
///
/// Returns [`WaitError::Timeout`] when the entity is still visible at the
/// deadline, and any lookup or cancellation error raised while polling.
pub async fn retry_until_not_found<T, F, Fut>(
    timeout: Duration,
    cancel: &CancellationToken,
    mut find: F,
) -> Result<(), WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, LookupError>>,
{
    let spec = WaitSpec::builder()
        .pending([PRESENT])
        .target_absent()
        .timeout(timeout)
        .poll_interval((timeout / 4).min(PROPAGATION_POLL_INTERVAL))
        .build()?;

    wait_with_cancel(
        || {
            let pending = find();
            async move {
                Ok::<_, LookupError>(match pending.await? {
                    Some(entity) => StatusSnapshot::present(entity, PRESENT),
                    None => StatusSnapshot::absent(),
                })
            }
        },
        &spec,
        cancel,
    )
    .await
    .map(drop)
}

/// Polls `fetch` until two consecutive reads return equal values and
/// returns the settled value. When the value is still changing at the
/// deadline, one final read is made and its value returned as-is.
///
/// # Errors
///
/// Returns [`WaitError::NotFound`] when the value disappears, and any lookup
/// or cancellation error raised while polling or during the final read.
pub async fn wait_until_stable<T, F, Fut>(
    mut fetch: F,
    timeout: Duration,
    poll_interval: Duration,
    cancel: &CancellationToken,
) -> Result<T, WaitError>
where
    T: Clone + PartialEq,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, LookupError>>,
{
    let spec = WaitSpec::builder()
        .pending([CHANGING])
        .target([STABLE])
        .timeout(timeout)
        .poll_interval(poll_interval)
        .build()?;

    let previous: Mutex<Option<T>> = Mutex::new(None);
    let previous_ref = &previous;
    let outcome = wait_with_cancel(
        || {
            let pending = fetch();
            async move {
                let Some(current) = pending.await? else {
                    return Ok::<_, LookupError>(StatusSnapshot::absent());
                };
                let mut last = previous_ref.lock().unwrap_or_else(PoisonError::into_inner);
                let status = if last.as_ref() == Some(&current) {
                    STABLE
                } else {
                    CHANGING
                };
                *last = Some(current.clone());
                drop(last);
                Ok::<_, LookupError>(StatusSnapshot::present(current, status))
            }
        },
        &spec,
        cancel,
    )
    .await;

    let entity = match outcome {
        Ok(settled) => settled.entity,
        Err(err) if err.is_timeout() => {
            debug!(error = %err, "value still changing at deadline, using a final read");
            fetch().await.map_err(|lookup_err| WaitError::LookupFailed {
                message: lookup_err.message().to_owned(),
            })?
        }
        Err(err) => return Err(err),
    };
    entity.ok_or(WaitError::NotFound { checks: 1 })
}

#[cfg(test)]
mod tests;
