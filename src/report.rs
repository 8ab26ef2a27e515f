//! Machine-readable summary of a finished wait.

use serde::Serialize;

use crate::waiter::{Converged, WaitError};

/// How a wait ended, with the process exit code used by the CLI.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The entity reached a target status.
    Converged,
    /// The wait spec was rejected before polling.
    InvalidSpec,
    /// The lookup failed permanently.
    LookupFailed,
    /// The deadline passed.
    Timeout,
    /// The entity disappeared while its presence was expected.
    NotFound,
    /// The entity reported an unanticipated status.
    UnexpectedState,
    /// The wait was interrupted.
    Canceled,
}

impl Outcome {
    /// Classifies a wait failure.
    #[must_use]
    pub const fn of(err: &WaitError) -> Self {
        match err {
            WaitError::InvalidSpec(_) => Self::InvalidSpec,
            WaitError::LookupFailed { .. } => Self::LookupFailed,
            WaitError::Timeout { .. } => Self::Timeout,
            WaitError::NotFound { .. } => Self::NotFound,
            WaitError::UnexpectedState { .. } => Self::UnexpectedState,
            WaitError::Canceled { .. } => Self::Canceled,
        }
    }

    /// Exit code reported by the `converge` binary.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Converged => 0,
            Self::InvalidSpec => 1,
            Self::LookupFailed => 2,
            Self::Timeout => 3,
            Self::NotFound => 4,
            Self::UnexpectedState => 5,
            Self::Canceled => 130,
        }
    }
}

/// Serializable report printed by `converge wait --json`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct WaitReport {
    /// Terminal outcome.
    pub outcome: Outcome,
    /// Final status, or the last one observed before a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Lookups performed, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// Wall-clock time spent, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    /// Human-readable failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WaitReport {
    /// Summarises a successful wait.
    #[must_use]
    pub fn converged<T>(converged: &Converged<T>) -> Self {
        Self {
            outcome: Outcome::Converged,
            status: Some(converged.status.to_string()),
            attempts: Some(converged.attempts),
            elapsed_ms: Some(u64::try_from(converged.elapsed.as_millis()).unwrap_or(u64::MAX)),
            message: None,
        }
    }

    /// Summarises a failed wait.
    #[must_use]
    pub fn failed(err: &WaitError) -> Self {
        let attempts = match err {
            WaitError::Canceled { attempts } => Some(*attempts),
            WaitError::NotFound { checks } => Some(*checks),
            _ => None,
        };
        let message = match err {
            WaitError::Timeout {
                last_error: Some(last_error),
                ..
            } => format!("{err}; last error: {last_error}"),
            _ => err.to_string(),
        };
        Self {
            outcome: Outcome::of(err),
            status: err.last_status().map(ToString::to_string),
            attempts,
            elapsed_ms: None,
            message: Some(message),
        }
    }

    /// Encodes the report as a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns the serializer error, which only occurs for I/O-backed writers.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::status::Status;

    #[test]
    fn converged_report_serializes_status_and_timing() {
        let converged = Converged {
            entity: Some("queue"),
            status: Status::new("VALID"),
            attempts: 3,
            elapsed: Duration::from_millis(2_500),
        };

        let json = WaitReport::converged(&converged)
            .to_json()
            .expect("report should serialize");

        assert_eq!(
            json,
            r#"{"outcome":"converged","status":"VALID","attempts":3,"elapsed_ms":2500}"#
        );
    }

    #[test]
    fn timeout_report_mentions_last_error() {
        let err = WaitError::Timeout {
            timeout: Duration::from_secs(5),
            target: String::from("VALID"),
            last_status: Some(Status::new("CREATING")),
            last_error: Some(String::from("throttled")),
        };

        let report = WaitReport::failed(&err);

        assert_eq!(report.outcome, Outcome::Timeout);
        assert_eq!(report.status.as_deref(), Some("CREATING"));
        assert!(
            report
                .message
                .as_deref()
                .is_some_and(|message| message.ends_with("last error: throttled"))
        );
    }

    #[rstest]
    #[case(WaitError::LookupFailed { message: String::from("denied") }, 2)]
    #[case(WaitError::Timeout {
        timeout: Duration::from_secs(1),
        target: String::from("VALID"),
        last_status: None,
        last_error: None,
    }, 3)]
    #[case(WaitError::NotFound { checks: 1 }, 4)]
    #[case(WaitError::UnexpectedState { status: Status::new("INVALID"), target: String::from("VALID") }, 5)]
    #[case(WaitError::Canceled { attempts: 0 }, 130)]
    fn failures_map_to_exit_codes(#[case] err: WaitError, #[case] code: i32) {
        assert_eq!(Outcome::of(&err).exit_code(), code);
    }
}
