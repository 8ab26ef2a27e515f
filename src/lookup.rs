//! Status lookup contract consumed by the convergence waiter.
//!
//! A lookup is any `FnMut() -> impl Future<Output = LookupResult<T>>`. It
//! closes over whatever client and identifier it needs; the waiter only sees
//! the returned [`StatusSnapshot`]. Absence is reported through the
//! [`Status::NOT_FOUND`] sentinel rather than as an error.

use std::future::Future;

use thiserror::Error;

use crate::status::{Status, StatusSnapshot};

/// Outcome of one lookup attempt.
pub type LookupResult<T> = Result<StatusSnapshot<T>, LookupError>;

/// Errors raised by a lookup, classified by whether polling may continue.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LookupError {
    /// Network failure, throttling, or another condition worth retrying.
    #[error("transient lookup failure: {message}")]
    Transient {
        /// Description of the failure.
        message: String,
    },
    /// Failure that makes further polling pointless.
    #[error("permanent lookup failure: {message}")]
    Permanent {
        /// Description of the failure.
        message: String,
    },
}

impl LookupError {
    /// Builds a retryable error.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Builds a non-retryable error.
    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    /// Returns `true` for errors the waiter absorbs and retries.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Returns the underlying message without the classification prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Transient { message } | Self::Permanent { message } => message,
        }
    }
}

/// Adapts a "find by identifier" call into a status lookup.
///
/// `find` yields `Ok(None)` when the entity does not exist, which becomes a
/// [`Status::NOT_FOUND`] snapshot. Otherwise `status_of` extracts the status
/// from the found entity.
pub fn find_status<T, E, F, Fut, S>(
    mut find: F,
    status_of: S,
) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = LookupResult<T>> + Send>>
where
    T: Send + 'static,
    E: Into<LookupError> + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>> + Send + 'static,
    S: Fn(&T) -> Status + Clone + Send + 'static,
{
    move || {
        let pending = find();
        let extract = status_of.clone();
        Box::pin(async move {
            match pending.await.map_err(Into::into)? {
                Some(entity) => {
                    let status = extract(&entity);
                    Ok::<_, LookupError>(StatusSnapshot::present(entity, status))
                }
                None => Ok::<_, LookupError>(StatusSnapshot::absent()),
            }
        })
    }
}
