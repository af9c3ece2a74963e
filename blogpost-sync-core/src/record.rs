//! Publish state of one documentation folder.
//!
//! The durable form of a [`PublishRecord`] is the sidecar JSON file inside the
//! folder's marker subfolder:
//!
//! ```json
//! { "readme_sha": "<sha>", "dev_to": { "slug": "<slug>", "article_id": "<id>" } }
//! ```

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::contract::Repository;
use crate::error::SyncError;

/// Contents of a sidecar file. Missing or malformed fields read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidecarState {
    pub readme_sha: String,
    pub slug: String,
    pub article_id: String,
}

#[derive(Serialize)]
struct SidecarJson<'a> {
    readme_sha: &'a str,
    dev_to: DevToJson<'a>,
}

#[derive(Serialize)]
struct DevToJson<'a> {
    slug: &'a str,
    article_id: &'a str,
}

fn string_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

impl SidecarState {
    /// Lenient parse: anything that is not a JSON object yields the empty state.
    pub fn parse(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Sidecar is not valid JSON, treating as empty");
                return Self::default();
            }
        };
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let mut state = SidecarState {
            readme_sha: string_field(obj.get("readme_sha")),
            ..Default::default()
        };
        if let Some(dev_to) = obj.get("dev_to").and_then(Value::as_object) {
            state.slug = string_field(dev_to.get("slug"));
            state.article_id = string_field(dev_to.get("article_id"));
        }
        state
    }

    pub fn to_json(&self) -> String {
        let doc = SidecarJson {
            readme_sha: &self.readme_sha,
            dev_to: DevToJson {
                slug: &self.slug,
                article_id: &self.article_id,
            },
        };
        // Serializing borrowed strings into a Value-free struct cannot fail.
        serde_json::to_string_pretty(&doc).unwrap_or_default()
    }
}

/// Where a record's sidecar lives and the content sha it had when read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarFile {
    pub path: String,
    pub sha: String,
    pub state: SidecarState,
}

/// One documentation folder, its README and its last synchronised state.
#[derive(Debug, Clone)]
pub struct PublishRecord {
    location: String,
    readme: String,
    current_fingerprint: String,
    last_fingerprint: String,
    remote_slug: String,
    remote_id: String,
    sidecar_path: String,
    sidecar_sha: String,
}

impl PublishRecord {
    pub fn new(
        location: impl Into<String>,
        readme: impl Into<String>,
        current_fingerprint: impl Into<String>,
        sidecar: SidecarFile,
    ) -> Self {
        Self {
            location: location.into(),
            readme: readme.into(),
            current_fingerprint: current_fingerprint.into(),
            last_fingerprint: sidecar.state.readme_sha,
            remote_slug: sidecar.state.slug,
            remote_id: sidecar.state.article_id,
            sidecar_path: sidecar.path,
            sidecar_sha: sidecar.sha,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn readme(&self) -> &str {
        &self.readme
    }

    pub fn current_fingerprint(&self) -> &str {
        &self.current_fingerprint
    }

    pub fn last_fingerprint(&self) -> &str {
        &self.last_fingerprint
    }

    pub fn remote_slug(&self) -> &str {
        &self.remote_slug
    }

    pub fn remote_id(&self) -> &str {
        &self.remote_id
    }

    pub fn sidecar_path(&self) -> &str {
        &self.sidecar_path
    }

    /// The README changed since the last successful sync.
    pub fn is_stale(&self) -> bool {
        self.current_fingerprint != self.last_fingerprint
    }

    /// Both halves of the remote identity are known.
    pub fn is_published(&self) -> bool {
        !self.remote_slug.is_empty() && !self.remote_id.is_empty()
    }

    /// Remember the remote identity. Nothing is written until [`commit`](Self::commit).
    pub fn mark_published(&mut self, slug: impl Into<String>, id: impl Into<String>) {
        self.remote_slug = slug.into();
        self.remote_id = id.into();
    }

    /// Write the sidecar, advancing the last fingerprint to the current one.
    ///
    /// The write is conditional on the sidecar still having the sha it had when
    /// this record was built; otherwise [`SyncError::Conflict`] is returned and
    /// the record stays stale.
    pub async fn commit<R>(&mut self, repo: &R) -> Result<(), SyncError>
    where
        R: Repository + ?Sized,
    {
        let state = SidecarState {
            readme_sha: self.current_fingerprint.clone(),
            slug: self.remote_slug.clone(),
            article_id: self.remote_id.clone(),
        };
        let message = format!("Update {} after publishing {}", self.sidecar_path, self.location);

        match repo
            .update_file(&self.sidecar_path, &message, &state.to_json(), &self.sidecar_sha)
            .await
        {
            Ok(new_sha) => {
                info!(location = %self.location, sidecar = %self.sidecar_path, "[RECORD] Sidecar committed");
                self.sidecar_sha = new_sha;
                self.last_fingerprint = state.readme_sha;
                Ok(())
            }
            Err(e) => {
                warn!(location = %self.location, sidecar = %self.sidecar_path, error = %e, "[RECORD] Sidecar commit failed");
                Err(e)
            }
        }
    }
}

impl fmt::Display for PublishRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (sha: {}): dev.to: ", self.location, self.current_fingerprint)?;
        if self.is_published() {
            write!(f, "{}({})", self.remote_slug, self.remote_id)?;
        } else {
            write!(f, "none")?;
        }
        write!(f, ". Last sha: {}", self.last_fingerprint)
    }
}
