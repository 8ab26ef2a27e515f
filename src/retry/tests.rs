//! Tests for the propagation retry helpers.

use std::future::ready;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::status::Status;

const NO_SUCH_BUCKET: &str = "NoSuchBucket";

#[tokio::test(start_paused = true)]
async fn retry_when_retries_until_success() {
    let calls = AtomicU32::new(0);

    let value = retry_when(
        PROPAGATION_TIMEOUT,
        &CancellationToken::new(),
        || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            ready(if attempt < 2 {
                Err(NO_SUCH_BUCKET)
            } else {
                Ok(attempt)
            })
        },
        |err: &&str| *err == NO_SUCH_BUCKET,
    )
    .await
    .expect("operation should eventually succeed");

    assert_eq!(value, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_when_stops_on_other_errors() {
    let calls = AtomicU32::new(0);

    let err = retry_when(
        PROPAGATION_TIMEOUT,
        &CancellationToken::new(),
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            ready(Err::<(), _>("AccessDenied"))
        },
        |err: &&str| *err == NO_SUCH_BUCKET,
    )
    .await
    .expect_err("operation should fail");

    assert_eq!(err, RetryError::Failed("AccessDenied"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_when_times_out_with_last_error() {
    let started = Instant::now();

    let err = retry_when(
        Duration::from_secs(5),
        &CancellationToken::new(),
        || ready(Err::<(), _>(NO_SUCH_BUCKET)),
        |err: &&str| *err == NO_SUCH_BUCKET,
    )
    .await
    .expect_err("operation should time out");

    assert_eq!(
        err,
        RetryError::Timeout {
            timeout: Duration::from_secs(5),
            last: NO_SUCH_BUCKET,
        }
    );
    assert!(started.elapsed() <= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn retry_when_honours_cancellation() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let calls = AtomicU32::new(0);

    let err = retry_when(
        PROPAGATION_TIMEOUT,
        &cancel,
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            ready(Ok::<_, &str>(1))
        },
        |_: &&str| true,
    )
    .await
    .expect_err("retry should be canceled");

    assert_eq!(err, RetryError::Canceled);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn retry_when_accepts_unrepresentable_timeout() {
    let calls = AtomicU32::new(0);

    let value = retry_when(
        Duration::MAX,
        &CancellationToken::new(),
        || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            ready(if attempt == 0 {
                Err(NO_SUCH_BUCKET)
            } else {
                Ok(attempt)
            })
        },
        |err: &&str| *err == NO_SUCH_BUCKET,
    )
    .await
    .expect("operation should succeed on retry");

    assert_eq!(value, 1);
}

#[tokio::test(start_paused = true)]
async fn retry_until_not_found_waits_for_absence() {
    let calls = AtomicU32::new(0);

    retry_until_not_found(PROPAGATION_TIMEOUT, &CancellationToken::new(), || {
        let attempt = calls.fetch_add(1, Ordering::SeqCst);
        ready(Ok((attempt < 2).then_some("lifecycle-rules")))
    })
    .await
    .expect("entity should disappear");

    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_until_not_found_times_out_when_entity_lingers() {
    let err = retry_until_not_found(Duration::from_secs(8), &CancellationToken::new(), || {
        ready(Ok(Some("lifecycle-rules")))
    })
    .await
    .expect_err("entity should linger");

    assert!(err.is_timeout());
    assert_eq!(err.last_status().map(Status::as_str), Some(PRESENT));
}

#[tokio::test(start_paused = true)]
async fn wait_until_stable_returns_settled_value() {
    let reads = [vec!["rule-a"], vec!["rule-a", "rule-b"], vec!["rule-a", "rule-b"]];
    let calls = AtomicU32::new(0);

    let settled = wait_until_stable(
        || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            let index = usize::try_from(attempt).unwrap_or(usize::MAX);
            ready(Ok(reads.get(index).cloned()))
        },
        Duration::from_secs(120),
        Duration::from_secs(1),
        &CancellationToken::new(),
    )
    .await
    .expect("rules should settle");

    assert_eq!(settled, vec!["rule-a", "rule-b"]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn wait_until_stable_reports_missing_value() {
    let err = wait_until_stable(
        || ready(Ok::<Option<u32>, LookupError>(None)),
        Duration::from_secs(120),
        Duration::from_secs(1),
        &CancellationToken::new(),
    )
    .await
    .expect_err("missing value should fail");

    assert!(err.is_not_found());
}

#[tokio::test(start_paused = true)]
async fn wait_until_stable_uses_final_read_after_deadline() {
    let calls = AtomicU32::new(0);

    let settled = wait_until_stable(
        || ready(Ok(Some(calls.fetch_add(1, Ordering::SeqCst)))),
        Duration::from_secs(5),
        Duration::from_secs(1),
        &CancellationToken::new(),
    )
    .await
    .expect("final read should be returned");

    // five polls at 0..=4 s, then one read after the deadline
    assert_eq!(settled, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}
