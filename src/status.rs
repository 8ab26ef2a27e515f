//! Status vocabulary and per-attempt snapshots reported by a status lookup.

use std::fmt;
use std::ops::Deref;

/// Lifecycle status reported by the remote API (for example `CREATING`).
///
/// Statuses compare as plain strings; the waiter never interprets them beyond
/// set membership and the [`Status::NOT_FOUND`] sentinel.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Status(String);

impl Status {
    /// Sentinel reported when the remote entity does not exist.
    pub const NOT_FOUND: &'static str = "NOT_FOUND";

    /// Wraps a raw status string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the absence sentinel.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(Self::NOT_FOUND)
    }

    /// Returns the status as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns `true` when this is the absence sentinel.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.0 == Self::NOT_FOUND
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl AsRef<str> for Status {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for Status {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single lookup attempt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot<T> {
    /// Full remote state, or `None` when the entity does not exist.
    pub entity: Option<T>,
    /// Lifecycle phase reported alongside the entity.
    pub status: Status,
}

impl<T> StatusSnapshot<T> {
    /// Builds a snapshot for an entity that exists.
    #[must_use]
    pub fn present(entity: T, status: impl Into<Status>) -> Self {
        Self {
            entity: Some(entity),
            status: status.into(),
        }
    }

    /// Builds a snapshot for an entity that was not found.
    #[must_use]
    pub fn absent() -> Self {
        Self {
            entity: None,
            status: Status::not_found(),
        }
    }

    /// Returns `true` when the snapshot reports absence.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.status.is_not_found()
    }
}
