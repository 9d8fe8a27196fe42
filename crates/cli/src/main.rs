//! backlog-sync CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: load `backlog-sync.toml` and validate it.
//! 2. **Wire observability**: configure `tracing-subscriber` with a compact or
//!    JSON layer and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an
//!    OpenTelemetry OTLP exporter. All `tracing` spans and structured events
//!    emitted by every crate in the workspace flow through this layer.
//! 3. **Construct infrastructure**: read the access token from the configured
//!    environment variable, build the [`tracker::TrackerClient`] and inject it
//!    into [`engine::BacklogSync`].
//! 4. **Dispatch** the selected subcommand and render its result.
//!
//! Exit status is non-zero when the command fails or when any patch of a
//! reorder did not apply.

#![forbid(unsafe_code)]

mod args;
mod config;
mod output;
mod telemetry;

use std::io::Write;

use anyhow::{bail, Context};
use backlog::ReorderIntent;
use clap::Parser;
use engine::{BacklogSync, RunOptions, SyncReport};
use tracker::{Credential, TrackerClient};

use args::{Cli, Command};
use config::CliConfig;
use output::OutputMode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _telemetry = telemetry::init(cli.log_format)?;

    let config = CliConfig::load(&cli.config)?;
    let credential = Credential::from_env(config.service.auth, &config.service.token_env)?;
    let project = config.service.project.clone();
    let client = TrackerClient::new(config.service.clone(), credential)?;
    let sync = BacklogSync::new(client, config.sync.clone())?;
    tracing::debug!(project = %project, "Engine ready");

    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::List {
            filter,
            deadline_secs,
        } => {
            let options = RunOptions {
                deadline: args::deadline_after(deadline_secs),
                dry_run: false,
            };
            let items = sync.list(&filter.to_spec(&project), &options).await?;
            output::print_items(&mut out, mode, &items)?;
        }
        Command::Move {
            ids,
            anchor,
            filter,
            run,
        } => {
            let intent = ReorderIntent::new(ids, anchor.anchor());
            let report = sync
                .reorder(&filter.to_spec(&project), &intent, &run.options())
                .await?;
            finish(&mut out, mode, &report)?;
        }
        Command::Reprioritize {
            anchor,
            filter,
            subset,
            run,
        } => {
            if subset.is_empty() {
                bail!("reprioritize needs at least one --where-* filter to select the items to move");
            }
            let context = filter.to_spec(&project);
            let selection = subset.narrow(&context)?;
            let report = sync
                .reprioritize(&context, &selection, anchor.anchor(), &run.options())
                .await?;
            finish(&mut out, mode, &report)?;
        }
    }

    out.flush().context("failed to flush output")?;
    Ok(())
}

/// Prints `report` and fails when any patch did not apply.
fn finish<W: Write>(out: &mut W, mode: OutputMode, report: &SyncReport) -> anyhow::Result<()> {
    output::print_report(out, mode, report)?;
    if !report.is_complete() {
        bail!("reorder did not fully apply; see the report for per-item outcomes");
    }
    Ok(())
}
