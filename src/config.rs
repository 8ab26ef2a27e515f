//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::lifecycle::Phase;
use crate::waiter::WaitSpecBuilder;

const DEFAULT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Per-phase wait defaults derived from configuration files and
/// environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "CONVERGE",
    discovery(
        app_name = "converge",
        env_var = "CONVERGE_CONFIG_PATH",
        config_file_name = "converge.toml",
        dotfile_name = ".converge.toml",
        project_file_name = "converge.toml"
    )
)]
pub struct WaitSettings {
    /// Deadline for waits following a create call, in seconds.
    #[ortho_config(default = DEFAULT_TIMEOUT_SECS)]
    pub create_timeout_secs: u64,
    /// Deadline for waits following an update call, in seconds.
    #[ortho_config(default = DEFAULT_TIMEOUT_SECS)]
    pub update_timeout_secs: u64,
    /// Deadline for waits following a delete call, in seconds.
    #[ortho_config(default = DEFAULT_TIMEOUT_SECS)]
    pub delete_timeout_secs: u64,
    /// Minimum delay between lookups, in seconds.
    #[ortho_config(default = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval_secs: u64,
    /// Cap for the backed-off delay between lookups, in seconds. When unset
    /// the delay stays at `poll_interval_secs`.
    pub max_poll_interval_secs: Option<u64>,
    /// Delay before the first lookup, in seconds.
    #[ortho_config(default = 0)]
    pub initial_delay_secs: u64,
    /// Consecutive absent observations tolerated before a wait fails.
    #[ortho_config(default = 1)]
    pub not_found_checks: u32,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            create_timeout_secs: DEFAULT_TIMEOUT_SECS,
            update_timeout_secs: DEFAULT_TIMEOUT_SECS,
            delete_timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_poll_interval_secs: None,
            initial_delay_secs: 0,
            not_found_checks: 1,
        }
    }
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn invalid(&self, requirement: &str) -> ConfigError {
        ConfigError::InvalidField(format!(
            "{} {requirement}: set {} or {} in converge.toml",
            self.description, self.env_var, self.toml_key
        ))
    }
}

const POLL_INTERVAL: FieldMetadata = FieldMetadata::new(
    "poll interval",
    "CONVERGE_POLL_INTERVAL_SECS",
    "poll_interval_secs",
);
const MAX_POLL_INTERVAL: FieldMetadata = FieldMetadata::new(
    "max poll interval",
    "CONVERGE_MAX_POLL_INTERVAL_SECS",
    "max_poll_interval_secs",
);
const NOT_FOUND_CHECKS: FieldMetadata = FieldMetadata::new(
    "not-found checks",
    "CONVERGE_NOT_FOUND_CHECKS",
    "not_found_checks",
);

impl WaitSettings {
    /// Loads settings without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("converge")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Returns the configured deadline for `phase`.
    #[must_use]
    pub const fn timeout_for(&self, phase: Phase) -> Duration {
        Duration::from_secs(match phase {
            Phase::Create => self.create_timeout_secs,
            Phase::Update => self.update_timeout_secs,
            Phase::Delete => self.delete_timeout_secs,
        })
    }

    /// Overrides the deadline for `phase`.
    pub const fn set_timeout(&mut self, phase: Phase, secs: u64) {
        match phase {
            Phase::Create => self.create_timeout_secs = secs,
            Phase::Update => self.update_timeout_secs = secs,
            Phase::Delete => self.delete_timeout_secs = secs,
        }
    }

    /// Starts a [`WaitSpecBuilder`] carrying the cadence and deadline for
    /// `phase`; callers add the pending and target statuses.
    #[must_use]
    pub fn builder(&self, phase: Phase) -> WaitSpecBuilder {
        WaitSpecBuilder::new()
            .timeout(self.timeout_for(phase))
            .poll_interval(Duration::from_secs(self.poll_interval_secs))
            .max_poll_interval(self.max_poll_interval_secs.map(Duration::from_secs))
            .initial_delay(Duration::from_secs(self.initial_delay_secs))
            .not_found_checks(self.not_found_checks)
    }

    /// Validates the phase-independent fields. Error messages include
    /// guidance on how to provide corrected values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(POLL_INTERVAL.invalid("must be at least 1 second"));
        }
        if self
            .max_poll_interval_secs
            .is_some_and(|max| max < self.poll_interval_secs)
        {
            return Err(MAX_POLL_INTERVAL.invalid("must not be below the poll interval"));
        }
        if self.not_found_checks == 0 {
            return Err(NOT_FOUND_CHECKS.invalid("must be at least 1"));
        }
        Ok(())
    }

    /// Validates the fields a wait for `phase` uses, including that phase's
    /// timeout. Timeouts of other phases are not inspected.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] naming the first invalid field.
    pub fn validate_for(&self, phase: Phase) -> Result<(), ConfigError> {
        self.validate()?;
        if self.timeout_for(phase).as_secs() <= self.poll_interval_secs {
            return Err(timeout_field(phase).invalid("must exceed the poll interval"));
        }
        Ok(())
    }
}

const fn timeout_field(phase: Phase) -> FieldMetadata {
    match phase {
        Phase::Create => FieldMetadata::new(
            "create timeout",
            "CONVERGE_CREATE_TIMEOUT_SECS",
            "create_timeout_secs",
        ),
        Phase::Update => FieldMetadata::new(
            "update timeout",
            "CONVERGE_UPDATE_TIMEOUT_SECS",
            "update_timeout_secs",
        ),
        Phase::Delete => FieldMetadata::new(
            "delete timeout",
            "CONVERGE_DELETE_TIMEOUT_SECS",
            "delete_timeout_secs",
        ),
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}
