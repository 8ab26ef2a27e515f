//! Lifecycle phases and the wait presets used after each remote call.

pub mod job_queue;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Remote operation a wait follows.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Phase {
    /// The resource was just created.
    Create,
    /// The resource was just updated.
    Update,
    /// The resource was just deleted.
    Delete,
}

impl Phase {
    /// Returns the lowercase name used in configuration and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a phase name is not recognised.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown phase '{0}', expected create, update, or delete")]
pub struct UnknownPhase(pub String);

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(UnknownPhase(value.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("create", Phase::Create)]
    #[case(" Update ", Phase::Update)]
    #[case("DELETE", Phase::Delete)]
    fn parses_phase_names(#[case] input: &str, #[case] expected: Phase) {
        assert_eq!(input.parse::<Phase>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_phase() {
        let err = "destroy".parse::<Phase>().expect_err("phase is unknown");
        assert_eq!(
            err.to_string(),
            "unknown phase 'destroy', expected create, update, or delete"
        );
    }

    #[test]
    fn displays_lowercase_name() {
        assert_eq!(Phase::Update.to_string(), "update");
    }
}
