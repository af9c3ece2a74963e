//! High-level pipeline: orchestrates discover → publish → commit for every
//! documentation folder in a repository.
//!
//! For each configured [`DocFolderKind`] the repository is walked once; every
//! record found is handed to [`publish::sync_record`] before the walk continues.
//!
//! # Error Handling
//! - A malformed README aborts the run, unless `abort_on_format_error` is off,
//!   in which case the folder is reported as failed like any other record.
//! - Platform and repository failures are confined to the record they hit,
//!   including failures to read a folder's README or sidecar.
//! - Sidecar conflicts are reported separately; the next run retries them.
//! - A failed folder listing ends the walk for that kind and fails the run.

use futures::{pin_mut, StreamExt};
use tracing::{error, info, warn};

use crate::config::{DocFolderKind, SynchroniseConfig};
use crate::contract::{Publisher, Repository};
use crate::discovery::Discovery;
use crate::error::SyncError;
use crate::publish::{self, PublishOptions, SyncOutcome};

/// Result of one run.
#[derive(Debug, Default)]
pub struct SynchroniseReport {
    pub records: Vec<RecordReport>,
    /// Walks that stopped early because the repository could not be listed.
    pub discovery_errors: Vec<String>,
}

#[derive(Debug)]
pub struct RecordReport {
    pub kind: String,
    pub location: String,
    pub status: RecordStatus,
}

#[derive(Debug)]
pub enum RecordStatus {
    Synced(SyncOutcome),
    /// Another writer touched the sidecar first.
    Conflict(String),
    Failed(String),
}

impl SynchroniseReport {
    pub fn failed(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.status, RecordStatus::Failed(_)))
            .count()
    }

    pub fn conflicts(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.status, RecordStatus::Conflict(_)))
            .count()
    }

    /// Records whose article was created or updated in this run.
    pub fn published(&self) -> usize {
        self.records
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    RecordStatus::Synced(SyncOutcome::Created { .. } | SyncOutcome::Updated { .. })
                )
            })
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.discovery_errors.is_empty()
    }
}

pub async fn synchronise<R, P>(
    config: &SynchroniseConfig,
    repo: &R,
    publisher: &P,
) -> Result<SynchroniseReport, SyncError>
where
    R: Repository + ?Sized,
    P: Publisher + ?Sized,
{
    info!(kinds = config.kinds.len(), "[SYNC] Starting synchronisation");
    let options = PublishOptions {
        organization_id: config.organization_id,
        cover_image: config.cover_image,
    };

    let mut report = SynchroniseReport::default();
    for kind in &config.kinds {
        synchronise_kind(config, kind, repo, publisher, &options, &mut report).await?;
    }

    info!(
        records = report.records.len(),
        published = report.published(),
        failed = report.failed(),
        conflicts = report.conflicts(),
        "[SYNC] Synchronisation finished"
    );
    Ok(report)
}

async fn synchronise_kind<R, P>(
    config: &SynchroniseConfig,
    kind: &DocFolderKind,
    repo: &R,
    publisher: &P,
    options: &PublishOptions,
    report: &mut SynchroniseReport,
) -> Result<(), SyncError>
where
    R: Repository + ?Sized,
    P: Publisher + ?Sized,
{
    info!(kind = %kind.name, marker = %kind.marker_suffix, "[SYNC] Scanning for documentation folders");
    let records = Discovery::new(repo, kind.clone()).into_stream();
    pin_mut!(records);

    while let Some(next) = records.next().await {
        let mut record = match next {
            Ok(Ok(record)) => record,
            Ok(Err(unreadable)) => {
                let status = if unreadable.error.is_conflict() {
                    warn!(location = %unreadable.location, error = %unreadable.error, "[SYNC] Sidecar conflict while loading, leaving for the next run");
                    RecordStatus::Conflict(unreadable.error.to_string())
                } else {
                    error!(location = %unreadable.location, error = %unreadable.error, "[SYNC][ERROR] Could not load folder");
                    RecordStatus::Failed(unreadable.error.to_string())
                };
                report.records.push(RecordReport {
                    kind: kind.name.clone(),
                    location: unreadable.location,
                    status,
                });
                continue;
            }
            Err(e) => {
                error!(kind = %kind.name, error = %e, "[SYNC][ERROR] Discovery failed");
                report.discovery_errors.push(format!("{}: {e}", kind.name));
                break;
            }
        };

        if !record.is_stale() {
            info!(record = %record, "[SYNC] No changes");
        } else {
            info!(record = %record, "[SYNC] Processing");
        }

        let status = match publish::sync_record(&mut record, repo, publisher, options).await {
            Ok(outcome) => {
                match &outcome {
                    SyncOutcome::Unchanged => {}
                    SyncOutcome::Created { slug, id } => {
                        info!(location = %record.location(), %slug, %id, "[SYNC] Article created")
                    }
                    SyncOutcome::Updated { slug, id } => {
                        info!(location = %record.location(), %slug, %id, "[SYNC] Article updated")
                    }
                }
                RecordStatus::Synced(outcome)
            }
            Err(e) if e.is_format() && config.abort_on_format_error => {
                error!(location = %record.location(), error = %e, "[SYNC][ERROR] Malformed README, aborting run");
                return Err(e);
            }
            Err(e) if e.is_conflict() => {
                warn!(location = %record.location(), error = %e, "[SYNC] Sidecar conflict, leaving for the next run");
                RecordStatus::Conflict(e.to_string())
            }
            Err(e) => {
                error!(location = %record.location(), error = %e, "[SYNC][ERROR] Record failed");
                RecordStatus::Failed(e.to_string())
            }
        };

        report.records.push(RecordReport {
            kind: kind.name.clone(),
            location: record.location().to_string(),
            status,
        });
    }
    Ok(())
}
