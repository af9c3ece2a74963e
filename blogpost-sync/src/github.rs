#![doc = "Repository integration: implements the core `Repository` trait on top of the GitHub REST contents API."]
//
//! # GitHub client
//!
//! - Construct [`GitHubClient`] with [`GitHubClient::connect`]; the default
//!   branch is looked up once unless configured.
//! - Folder listings and file reads go to `GET /repos/{repo}/contents/{path}?ref={branch}`.
//! - Writes go to `PUT /repos/{repo}/contents/{path}` with base64 content. Updates
//!   carry the expected blob sha; GitHub answers `409` when it no longer matches.
//! - Relative links resolve against `{raw_base}/{repo}/{branch}/{folder}/`.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use blogpost_sync_core::contract::{
    ContentEncoding, EntryKind, FileContent, RepoEntry, Repository,
};
use blogpost_sync_core::SyncError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::load_config::GitHubSettings;

const GITHUB_API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    name: String,
    path: String,
    sha: String,
    #[serde(rename = "type")]
    entry_type: String,
}

#[derive(Debug, Deserialize)]
struct ContentsFile {
    path: String,
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    default_branch: String,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutResponseContent,
}

#[derive(Debug, Deserialize)]
struct PutResponseContent {
    sha: String,
}

fn decode_error(path: &str, e: serde_json::Error) -> SyncError {
    SyncError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    }
}

/// Map a non-success GitHub status onto the sync error taxonomy.
pub fn status_error(status: u16, body: String, path: &str) -> SyncError {
    match status {
        404 => SyncError::NotFound(path.to_string()),
        409 => SyncError::Conflict {
            path: path.to_string(),
        },
        _ => SyncError::Repository { status, body },
    }
}

/// Turn GitHub's answers to a lost write race into [`SyncError::Conflict`].
///
/// Besides `409`, a stale sha on update comes back as `422 ... does not match`
/// and a create over a file that appeared meanwhile as `422 ... "sha" wasn't supplied`.
pub fn write_conflict(err: SyncError, path: &str) -> SyncError {
    match err {
        SyncError::Repository { status, ref body }
            if status == StatusCode::UNPROCESSABLE_ENTITY.as_u16()
                && (body.contains("does not match") || body.contains("wasn't supplied")) =>
        {
            SyncError::Conflict {
                path: path.to_string(),
            }
        }
        other => other,
    }
}

/// Parse a folder listing as returned by the contents API.
pub fn parse_listing(body: &str, path: &str) -> Result<Vec<RepoEntry>, SyncError> {
    let entries: Vec<ContentsEntry> =
        serde_json::from_str(body).map_err(|e| decode_error(path, e))?;
    Ok(entries
        .into_iter()
        .map(|e| RepoEntry {
            kind: if e.entry_type == "dir" {
                EntryKind::Directory
            } else {
                EntryKind::File
            },
            name: e.name,
            path: e.path,
            sha: e.sha,
        })
        .collect())
}

/// Parse a single file as returned by the contents API.
pub fn parse_file(body: &str, path: &str) -> Result<FileContent, SyncError> {
    let file: ContentsFile = serde_json::from_str(body).map_err(|e| decode_error(path, e))?;
    Ok(FileContent {
        path: file.path,
        content: file.content.unwrap_or_default(),
        encoding: ContentEncoding::from(file.encoding.as_deref().unwrap_or("")),
        sha: file.sha,
    })
}

pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    raw_base: String,
    repo: String,
    branch: String,
}

impl GitHubClient {
    /// Build the HTTP client and resolve the branch to work on.
    pub async fn connect(settings: &GitHubSettings, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", settings.token))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(concat!("blogpost-sync/", env!("CARGO_PKG_VERSION"))));
        headers.insert("x-github-api-version", HeaderValue::from_static(GITHUB_API_VERSION));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let mut client = GitHubClient {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            raw_base: settings.raw_base.trim_end_matches('/').to_string(),
            repo: settings.repo.clone(),
            branch: settings.branch.clone().unwrap_or_default(),
        };

        if client.branch.is_empty() {
            client.branch = client.fetch_default_branch().await?;
        }
        tracing::info!(repo = %client.repo, branch = %client.branch, "Initialized GitHubClient");
        Ok(client)
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    async fn fetch_default_branch(&self) -> Result<String, SyncError> {
        let url = format!("{}/repos/{}", self.api_base, self.repo);
        tracing::debug!(%url, "Fetching repository metadata");
        let response = self.http.get(&url).send().await?;
        let body = Self::success_body(response, &self.repo).await?;
        let info: RepoInfo = serde_json::from_str(&body).map_err(|e| decode_error(&self.repo, e))?;
        Ok(info.default_branch)
    }

    fn contents_url(&self, path: &str) -> Result<Url, SyncError> {
        let base = format!("{}/repos/{}/contents", self.api_base, self.repo);
        let mut url = Url::parse(&base).map_err(|e| SyncError::InvalidUrl(format!("{base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(base.clone()))?
            .pop_if_empty()
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    async fn get_contents(&self, path: &str) -> Result<String, SyncError> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("ref", &self.branch);
        let response = self.http.get(url).send().await?;
        Self::success_body(response, path).await
    }

    async fn put_contents(&self, path: &str, body: &PutContents<'_>) -> Result<String, SyncError> {
        let url = self.contents_url(path)?;
        let response = self.http.put(url).json(body).send().await?;
        let text = Self::success_body(response, path).await?;
        let parsed: PutResponse = serde_json::from_str(&text).map_err(|e| decode_error(path, e))?;
        Ok(parsed.content.sha)
    }

    async fn success_body(response: reqwest::Response, path: &str) -> Result<String, SyncError> {
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            tracing::error!(status = status.as_u16(), path, "GitHub request failed");
            Err(status_error(status.as_u16(), body, path))
        }
    }
}

#[async_trait]
impl Repository for GitHubClient {
    async fn list_folder(&self, path: &str) -> Result<Vec<RepoEntry>, SyncError> {
        tracing::debug!(path, "Listing folder");
        let body = self.get_contents(path).await?;
        parse_listing(&body, path)
    }

    async fn read_file(&self, path: &str) -> Result<FileContent, SyncError> {
        tracing::debug!(path, "Reading file");
        let body = self.get_contents(path).await?;
        parse_file(&body, path)
    }

    async fn create_file(
        &self,
        path: &str,
        message: &str,
        content: &str,
    ) -> Result<String, SyncError> {
        tracing::info!(path, "Creating file");
        let body = PutContents {
            message,
            content: base64::engine::general_purpose::STANDARD.encode(content.as_bytes()),
            branch: &self.branch,
            sha: None,
        };
        self.put_contents(path, &body)
            .await
            .map_err(|e| write_conflict(e, path))
    }

    async fn update_file(
        &self,
        path: &str,
        message: &str,
        content: &str,
        expected_sha: &str,
    ) -> Result<String, SyncError> {
        tracing::info!(path, expected_sha, "Updating file");
        let body = PutContents {
            message,
            content: base64::engine::general_purpose::STANDARD.encode(content.as_bytes()),
            branch: &self.branch,
            sha: Some(expected_sha),
        };
        self.put_contents(path, &body)
            .await
            .map_err(|e| write_conflict(e, path))
    }

    fn content_base_url(&self, folder: &str) -> Result<Url, SyncError> {
        raw_folder_url(&self.raw_base, &self.repo, &self.branch, folder)
    }
}

/// `{raw_base}/{repo}/{branch}/{folder}/`, with every segment percent-encoded.
pub fn raw_folder_url(raw_base: &str, repo: &str, branch: &str, folder: &str) -> Result<Url, SyncError> {
    let mut url = Url::parse(raw_base).map_err(|e| SyncError::InvalidUrl(format!("{raw_base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| SyncError::InvalidUrl(raw_base.to_string()))?
        .pop_if_empty()
        .extend(repo.split('/'))
        .extend(branch.split('/'))
        .extend(folder.split('/').filter(|s| !s.is_empty()))
        .push("");
    Ok(url)
}
