//! Binary entry point for the `converge` CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use converge::{
    CommandError, CommandLookup, ConfigError, Converged, Outcome, Phase, SpecError, WaitError,
    WaitReport, WaitSettings, WaitSpec, wait_with_cancel,
};

mod cli;

use cli::{Cli, PhaseArg, WaitCommand};

const LOG_ENV: &str = "CONVERGE_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("invalid wait: {0}")]
    Spec(#[from] SpecError),
    #[error("invalid command: {0}")]
    Command(#[from] CommandError),
    #[error("failed to encode report: {0}")]
    Report(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .ok();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Wait(command) => wait_command(command).await,
    }
}

async fn wait_command(args: WaitCommand) -> Result<i32, CliError> {
    let phase = phase_of(args.phase);
    let mut settings = WaitSettings::load_without_cli_args()?;
    apply_overrides(&mut settings, phase, &args);
    settings.validate_for(phase)?;
    let spec = build_spec(&settings, phase, &args)?;

    let lookup = CommandLookup::with_process_runner(args.command)?
        .not_found_exit_code(args.not_found_exit_code)
        .fail_fast(args.fail_fast);
    debug!(command = %lookup.render(), %phase, target = %spec.describe_target(), "starting wait");

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    let result = wait_with_cancel(|| lookup.lookup(), &spec, &cancel).await;

    if args.json {
        let report = match &result {
            Ok(converged) => WaitReport::converged(converged),
            Err(err) => WaitReport::failed(err),
        };
        writeln!(io::stdout(), "{}", report.to_json()?).ok();
        return Ok(report.outcome.exit_code());
    }
    Ok(write_outcome(io::stdout(), io::stderr(), &result))
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, canceling wait");
            cancel.cancel();
        }
    });
}

const fn phase_of(arg: PhaseArg) -> Phase {
    match arg {
        PhaseArg::Create => Phase::Create,
        PhaseArg::Update => Phase::Update,
        PhaseArg::Delete => Phase::Delete,
    }
}

fn apply_overrides(settings: &mut WaitSettings, phase: Phase, args: &WaitCommand) {
    if let Some(secs) = args.timeout_secs {
        settings.set_timeout(phase, secs);
    }
    if let Some(secs) = args.poll_interval_secs {
        settings.poll_interval_secs = secs;
    }
    if args.max_poll_interval_secs.is_some() {
        settings.max_poll_interval_secs = args.max_poll_interval_secs;
    }
    if let Some(secs) = args.initial_delay_secs {
        settings.initial_delay_secs = secs;
    }
    if let Some(checks) = args.not_found_checks {
        settings.not_found_checks = checks;
    }
}

fn build_spec(
    settings: &WaitSettings,
    phase: Phase,
    args: &WaitCommand,
) -> Result<WaitSpec, SpecError> {
    let builder = settings
        .builder(phase)
        .pending(args.pending.iter().map(String::as_str))
        .target(args.target.iter().map(String::as_str))
        .continuous_target_occurrence(args.continuous_target_occurrence);
    if args.target_absent {
        builder.target_absent().build()
    } else {
        builder.build()
    }
}

fn write_outcome(
    mut out: impl Write,
    mut err_out: impl Write,
    result: &Result<Converged<String>, WaitError>,
) -> i32 {
    match result {
        Ok(converged) => {
            writeln!(out, "{}", converged.status).ok();
            Outcome::Converged.exit_code()
        }
        Err(err) => {
            if let Some(message) = WaitReport::failed(err).message {
                writeln!(err_out, "{message}").ok();
            }
            Outcome::of(err).exit_code()
        }
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
