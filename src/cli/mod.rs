//! Command-line interface definitions for the `converge` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Parser, ValueEnum};

/// Top-level CLI for the `converge` binary.
#[derive(Debug, Parser)]
#[command(
    name = "converge",
    about = "Poll a status command until a remote resource converges",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Run a status command repeatedly until it reports a target status.
    #[command(
        name = "wait",
        about = "Run a status command repeatedly until it reports a target status"
    )]
    Wait(WaitCommand),
}

/// Lifecycle phase selecting which configured timeout applies.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum PhaseArg {
    /// Wait after creating a resource.
    Create,
    /// Wait after updating a resource.
    Update,
    /// Wait after deleting a resource.
    Delete,
}

/// Arguments for the `converge wait` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct WaitCommand {
    /// Lifecycle phase; selects the configured timeout.
    #[arg(long, value_enum, default_value_t = PhaseArg::Create)]
    pub(crate) phase: PhaseArg,
    /// Statuses meaning the change is still in progress (comma separated).
    #[arg(long, value_name = "STATUS", value_delimiter = ',')]
    pub(crate) pending: Vec<String>,
    /// Statuses meaning the change completed (comma separated).
    #[arg(
        long,
        value_name = "STATUS",
        value_delimiter = ',',
        required_unless_present = "target_absent"
    )]
    pub(crate) target: Vec<String>,
    /// Treat disappearance of the resource as completion.
    #[arg(long)]
    pub(crate) target_absent: bool,
    /// Overall deadline in seconds, overriding the phase timeout.
    #[arg(long, value_name = "SECS")]
    pub(crate) timeout_secs: Option<u64>,
    /// Minimum delay between lookups in seconds.
    #[arg(long, value_name = "SECS")]
    pub(crate) poll_interval_secs: Option<u64>,
    /// Let the delay double after each lookup up to this many seconds.
    #[arg(long, value_name = "SECS")]
    pub(crate) max_poll_interval_secs: Option<u64>,
    /// Delay before the first lookup in seconds.
    #[arg(long, value_name = "SECS")]
    pub(crate) initial_delay_secs: Option<u64>,
    /// Consecutive absent lookups tolerated before failing.
    #[arg(long, value_name = "COUNT")]
    pub(crate) not_found_checks: Option<u32>,
    /// Consecutive target lookups required before succeeding.
    #[arg(long, value_name = "COUNT", default_value_t = 1)]
    pub(crate) continuous_target_occurrence: u32,
    /// Exit code of the status command meaning the resource does not exist.
    #[arg(long, value_name = "CODE", allow_negative_numbers = true)]
    pub(crate) not_found_exit_code: Option<i32>,
    /// Abort on unexpected exit codes instead of retrying.
    #[arg(long)]
    pub(crate) fail_fast: bool,
    /// Print a JSON report instead of the bare status.
    #[arg(long)]
    pub(crate) json: bool,
    /// Status command to run on each lookup (use -- to separate flags).
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub(crate) command: Vec<String>,
}
