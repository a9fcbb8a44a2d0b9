//! CLI for bulk incident acknowledgement.
//!
//! Run `incident-ack --help` for usage information.

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use incident_ack::cli::Cli;
use incident_ack::{confirm, pipeline, ui, Error, GrpcurlTransport, RunOutcome, Settings};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "incident_ack=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    match execute(&cli).await {
        Ok(outcome) => {
            debug!(?outcome, "Run finished");
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            ui::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: &Cli) -> Result<RunOutcome, Error> {
    let settings = Settings::resolve(&cli.overrides())?;
    let transport = GrpcurlTransport::new(&settings);
    transport.ensure_available()?;

    let started = Utc::now();
    ui::print_banner(&settings, started);
    info!(
        region = %settings.region,
        action = %settings.action,
        mode = %settings.mode,
        batch_size = settings.batch_size,
        "Starting run"
    );

    let mut confirmer = confirm::for_stdin(settings.assume_yes);
    pipeline::run(&settings, &transport, confirmer.as_mut(), started).await
}
