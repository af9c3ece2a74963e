//! CLI glue for blogpost-sync: argument parsing, client construction and the
//! user-visible run summary.
//!
//! All decisions about what to publish live in `blogpost-sync-core`; this module
//! wires the GitHub and dev.to clients into [`synchronise`] and turns the report
//! into an exit status.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use blogpost_sync_core::publish::SyncOutcome;
use blogpost_sync_core::synchronise::{synchronise, RecordStatus, SynchroniseReport};
use clap::{Parser, Subcommand};

use crate::devto::DevToClient;
use crate::github::GitHubClient;
use crate::load_config::load_config;

/// Publish README files from marked repository folders as dev.to drafts.
#[derive(Parser)]
#[clap(
    name = "blogpost-sync",
    version,
    about = "Publish README files from marked repository folders as dev.to drafts"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or update an article for every documentation folder whose README changed
    Sync {
        /// Optional YAML settings file; secrets always come from the environment
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

fn print_report(report: &SynchroniseReport) {
    for record in &report.records {
        let line = match &record.status {
            RecordStatus::Synced(SyncOutcome::Unchanged) => "no changes".to_string(),
            RecordStatus::Synced(SyncOutcome::Created { slug, id }) => {
                format!("created {slug} (id {id})")
            }
            RecordStatus::Synced(SyncOutcome::Updated { slug, id }) => {
                format!("updated {slug} (id {id})")
            }
            RecordStatus::Conflict(reason) => format!("conflict: {reason}"),
            RecordStatus::Failed(reason) => format!("FAILED: {reason}"),
        };
        println!("[{}] {}: {}", record.kind, record.location, line);
    }
    for error in &report.discovery_errors {
        println!("[discovery] FAILED: {error}");
    }
    println!(
        "Synchronise complete: {} folder(s), {} published, {} failed, {} conflict(s)",
        report.records.len(),
        report.published(),
        report.failed(),
        report.conflicts()
    );
}

/// Async CLI entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config } => {
            let config = load_config(config.as_deref())?;
            tracing::info!(command = "sync", "Starting synchronisation process");

            let repo = GitHubClient::connect(&config.github, config.timeout)
                .await
                .with_context(|| format!("Failed to connect to GitHub repository {}", config.github.repo))?;
            let publisher = DevToClient::new(&config.dev_to, config.timeout)
                .context("Failed to construct dev.to client")?;

            println!(
                "Processing documentation folders from {} ({})",
                config.github.repo,
                repo.branch()
            );
            let report = synchronise(&config.sync, &repo, &publisher)
                .await
                .context("Synchronisation aborted")?;
            print_report(&report);

            if !report.is_success() {
                tracing::error!(command = "sync", failed = report.failed(), "Synchronisation finished with failures");
                bail!(
                    "{} folder(s) failed and {} walk(s) stopped early",
                    report.failed(),
                    report.discovery_errors.len()
                );
            }
            tracing::info!(command = "sync", ?report, "Synchronisation complete");
            Ok(())
        }
    }
}
