//! Breadth-first search for documentation folders.
//!
//! A documentation folder directly contains a README file and a marker
//! subfolder (for example `.blogpost`). Folders that do not qualify are searched
//! further; folders that do are not, so posts never nest inside posts.
//!
//! [`Discovery`] is a one-shot worklist: each call to [`Discovery::next`] walks
//! until it finds the next qualifying folder and turns it into a
//! [`PublishRecord`]. A fresh walk needs a fresh `Discovery`.
//!
//! Only a failed folder listing ends the walk. A qualifying folder whose
//! README or sidecar cannot be loaded is yielded as an [`UnreadableFolder`] and
//! the walk carries on with its siblings.

use std::collections::VecDeque;

use futures::stream::{self, Stream};
use tracing::{debug, info, warn};

use crate::config::DocFolderKind;
use crate::contract::{RepoEntry, Repository};
use crate::error::SyncError;
use crate::record::{PublishRecord, SidecarFile, SidecarState};

const README_NAME: &str = "readme.md";
const SIDECAR_PLACEHOLDER: &str = "{}";

/// The README entry of a folder listing, matched case-insensitively.
pub fn find_readme(entries: &[RepoEntry]) -> Option<&RepoEntry> {
    entries
        .iter()
        .find(|e| e.is_file() && e.name.eq_ignore_ascii_case(README_NAME))
}

/// The marker subfolder of a folder listing for the given kind.
pub fn find_marker<'a>(entries: &'a [RepoEntry], kind: &DocFolderKind) -> Option<&'a RepoEntry> {
    let suffix = kind.marker_suffix.to_lowercase();
    entries
        .iter()
        .find(|e| e.is_dir() && e.name.to_lowercase().ends_with(&suffix))
}

/// Whether a folder listing describes a documentation folder of this kind.
pub fn is_doc_folder(entries: &[RepoEntry], kind: &DocFolderKind) -> bool {
    find_readme(entries).is_some() && find_marker(entries, kind).is_some()
}

/// A documentation folder that was found but could not be turned into a record.
#[derive(Debug)]
pub struct UnreadableFolder {
    pub location: String,
    pub error: SyncError,
}

/// One qualifying folder: its record, or why it could not be loaded.
pub type Candidate = Result<PublishRecord, UnreadableFolder>;

/// Lazy breadth-first walk over a repository, yielding one record per
/// documentation folder.
pub struct Discovery<'r, R: Repository + ?Sized> {
    repo: &'r R,
    kind: DocFolderKind,
    queue: VecDeque<RepoEntry>,
    started: bool,
}

impl<'r, R: Repository + ?Sized> Discovery<'r, R> {
    /// Nothing is fetched until the first call to [`next`](Self::next).
    pub fn new(repo: &'r R, kind: DocFolderKind) -> Self {
        Self {
            repo,
            kind,
            queue: VecDeque::new(),
            started: false,
        }
    }

    /// Walk to the next documentation folder.
    ///
    /// Returns `Ok(None)` once the tree is exhausted, and `Err` only when a
    /// folder listing fails.
    pub async fn next(&mut self) -> Result<Option<Candidate>, SyncError> {
        if !self.started {
            self.started = true;
            debug!(kind = %self.kind.name, "[DISCOVERY] Listing repository root");
            self.queue.extend(self.repo.list_folder("").await?);
        }

        while let Some(entry) = self.queue.pop_front() {
            if !entry.is_dir() {
                continue;
            }
            let children = self.repo.list_folder(&entry.path).await?;
            if is_doc_folder(&children, &self.kind) {
                info!(kind = %self.kind.name, folder = %entry.path, "[DISCOVERY] Found documentation folder");
                let loaded = load_record(self.repo, &entry.path, &children, &self.kind).await;
                let candidate = match loaded {
                    Ok(record) => Ok(record),
                    Err(error) => {
                        warn!(kind = %self.kind.name, folder = %entry.path, error = %error, "[DISCOVERY] Could not load documentation folder");
                        Err(UnreadableFolder {
                            location: entry.path,
                            error,
                        })
                    }
                };
                return Ok(Some(candidate));
            }
            self.queue.extend(children);
        }

        debug!(kind = %self.kind.name, "[DISCOVERY] Walk complete");
        Ok(None)
    }

    /// The same walk as a stream of records.
    pub fn into_stream(self) -> impl Stream<Item = Result<Candidate, SyncError>> + 'r {
        stream::unfold(Some(self), |state| async move {
            let mut discovery = state?;
            match discovery.next().await {
                Ok(Some(candidate)) => Some((Ok(candidate), Some(discovery))),
                Ok(None) => None,
                // A failed listing ends the walk.
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

/// Build a record for a documentation folder from its listing.
///
/// The sidecar is created with `{}` when the marker folder does not hold one yet.
pub async fn load_record<R>(
    repo: &R,
    folder: &str,
    entries: &[RepoEntry],
    kind: &DocFolderKind,
) -> Result<PublishRecord, SyncError>
where
    R: Repository + ?Sized,
{
    let readme_entry = find_readme(entries).ok_or_else(|| SyncError::NotFound(format!("{folder}/README.md")))?;
    let marker = find_marker(entries, kind)
        .ok_or_else(|| SyncError::NotFound(format!("{folder}/*{}", kind.marker_suffix)))?;

    let readme_file = repo.read_file(&readme_entry.path).await?;
    let readme = readme_file.text()?;

    let marker_entries = repo.list_folder(&marker.path).await?;
    let existing = marker_entries
        .iter()
        .find(|e| e.is_file() && e.name.eq_ignore_ascii_case(&kind.sidecar_file));

    let sidecar = match existing {
        Some(entry) => {
            let file = repo.read_file(&entry.path).await?;
            // An undecodable sidecar is as good as an empty one.
            let state = file.text().map(|raw| SidecarState::parse(&raw)).unwrap_or_default();
            SidecarFile {
                path: entry.path.clone(),
                sha: file.sha,
                state,
            }
        }
        None => {
            let path = format!("{}/{}", marker.path, kind.sidecar_file);
            info!(sidecar = %path, "[DISCOVERY] Creating missing sidecar file");
            let message = format!("Create {} for {}", kind.sidecar_file, folder);
            let sha = repo.create_file(&path, &message, SIDECAR_PLACEHOLDER).await?;
            SidecarFile {
                path,
                sha,
                state: SidecarState::default(),
            }
        }
    };

    Ok(PublishRecord::new(folder, readme, readme_file.sha, sidecar))
}
