//! `load_config` module: merges an optional YAML settings file with secrets from
//! the environment into a validated [`AppConfig`].
//!
//! The YAML file holds only non-secret settings; every key is optional:
//!
//! ```yaml
//! timeout_secs: 30
//! github:
//!   api_base: https://api.github.com
//!   raw_base: https://raw.githubusercontent.com
//!   branch: main            # default: the repository's default branch
//! dev_to:
//!   api_base: https://dev.to/api
//! sync:
//!   cover_image: false
//!   abort_on_format_error: true
//!   kinds:
//!     - name: post
//!       marker_suffix: .blogpost
//!       sidecar_file: post.json
//! ```
//!
//! # Errors
//! Missing required environment variables, unreadable or invalid YAML and
//! invalid values all fail here, before any network call is made.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use blogpost_sync_core::config::{DocFolderKind, SynchroniseConfig};
use serde::Deserialize;
use tracing::{error, info};

pub const ENV_REPO: &str = "REPO";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_ACCESS_TOKEN";
pub const ENV_DEV_TO_API_KEY: &str = "DEV_TO_API_KEY";
pub const ENV_DEV_TO_ORGANIZATION_ID: &str = "DEV_TO_ORGANIZATION_ID";

const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const DEFAULT_GITHUB_RAW: &str = "https://raw.githubusercontent.com";
const DEFAULT_DEV_TO_API: &str = "https://dev.to/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    timeout_secs: Option<u64>,
    github: GitHubSection,
    dev_to: DevToSection,
    sync: SyncSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GitHubSection {
    api_base: Option<String>,
    raw_base: Option<String>,
    branch: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DevToSection {
    api_base: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SyncSection {
    kinds: Option<Vec<DocFolderKind>>,
    cover_image: Option<bool>,
    abort_on_format_error: Option<bool>,
}

pub struct GitHubSettings {
    /// `owner/name`.
    pub repo: String,
    pub token: String,
    pub api_base: String,
    pub raw_base: String,
    pub branch: Option<String>,
}

impl fmt::Debug for GitHubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubSettings")
            .field("repo", &self.repo)
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("raw_base", &self.raw_base)
            .field("branch", &self.branch)
            .finish()
    }
}

pub struct DevToSettings {
    pub api_key: String,
    pub api_base: String,
}

impl fmt::Debug for DevToSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DevToSettings")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug)]
pub struct AppConfig {
    pub github: GitHubSettings,
    pub dev_to: DevToSettings,
    pub sync: SynchroniseConfig,
    /// Applied to every HTTP call.
    pub timeout: Duration,
}

impl AppConfig {
    pub fn trace_loaded(&self) {
        info!(
            repo = %self.github.repo,
            branch = ?self.github.branch,
            github_api = %self.github.api_base,
            dev_to_api = %self.dev_to.api_base,
            timeout_secs = self.timeout.as_secs(),
            "Loaded AppConfig"
        );
        self.sync.trace_loaded();
    }
}

/// Accepts `owner/name` or a `https://github.com/owner/name[.git]` URL.
pub fn normalize_repo(raw: &str) -> Result<String> {
    let mut repo = raw.trim();
    for prefix in ["https://github.com/", "http://github.com/", "github.com/"] {
        if repo
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        {
            repo = &repo[prefix.len()..];
            break;
        }
    }
    let repo = repo.trim_end_matches('/');
    let repo = repo.strip_suffix(".git").unwrap_or(repo);

    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(repo.to_string())
        }
        _ => bail!("{ENV_REPO} must look like 'owner/name' or 'https://github.com/owner/name', got '{raw}'"),
    }
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            info!(var = name, "Required environment variable found");
            Ok(value.trim().to_string())
        }
        _ => {
            error!(var = name, "Required environment variable not set");
            bail!("{name} environment variable not set")
        }
    }
}

fn organization_from_env() -> Result<Option<i64>> {
    match std::env::var(ENV_DEV_TO_ORGANIZATION_ID) {
        Ok(raw) if !raw.trim().is_empty() => {
            let id = raw.trim().parse::<i64>().map_err(|e| {
                error!(error = ?e, raw = %raw, "DEV_TO_ORGANIZATION_ID is not an integer");
                anyhow::anyhow!("{ENV_DEV_TO_ORGANIZATION_ID} must be a valid integer: {e}")
            })?;
            Ok(Some(id))
        }
        _ => Ok(None),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    info!(config_path = ?path, "Loading configuration from file");
    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })
}

fn validate_kinds(kinds: &[DocFolderKind]) -> Result<()> {
    if kinds.is_empty() {
        bail!("sync.kinds must list at least one documentation folder kind");
    }
    for kind in kinds {
        if kind.marker_suffix.trim().is_empty() || kind.sidecar_file.trim().is_empty() {
            bail!(
                "documentation folder kind '{}' needs a marker_suffix and a sidecar_file",
                kind.name
            );
        }
    }
    Ok(())
}

/// Load settings from `path` (if given) and the environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let file = match path {
        Some(path) => read_file_config(path)?,
        None => {
            info!("No config file given, using defaults");
            FileConfig::default()
        }
    };

    let repo = normalize_repo(&required_env(ENV_REPO)?)?;
    let token = required_env(ENV_GITHUB_TOKEN)?;
    let api_key = required_env(ENV_DEV_TO_API_KEY)?;
    let organization_id = organization_from_env()?;

    let timeout_secs = file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        bail!("timeout_secs must be greater than zero");
    }

    let kinds = file.sync.kinds.unwrap_or_else(DocFolderKind::defaults);
    validate_kinds(&kinds).context("Invalid sync configuration")?;

    let config = AppConfig {
        github: GitHubSettings {
            repo,
            token,
            api_base: file
                .github
                .api_base
                .unwrap_or_else(|| DEFAULT_GITHUB_API.to_string()),
            raw_base: file
                .github
                .raw_base
                .unwrap_or_else(|| DEFAULT_GITHUB_RAW.to_string()),
            branch: file.github.branch.filter(|b| !b.trim().is_empty()),
        },
        dev_to: DevToSettings {
            api_key,
            api_base: file
                .dev_to
                .api_base
                .unwrap_or_else(|| DEFAULT_DEV_TO_API.to_string()),
        },
        sync: SynchroniseConfig {
            kinds,
            organization_id,
            cover_image: file.sync.cover_image.unwrap_or(false),
            abort_on_format_error: file.sync.abort_on_format_error.unwrap_or(true),
        },
        timeout: Duration::from_secs(timeout_secs),
    };
    config.trace_loaded();
    Ok(config)
}
