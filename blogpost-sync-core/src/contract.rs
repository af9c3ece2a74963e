//! # contract: interfaces to the repository host and the publishing platform
//!
//! This module defines the two collaborator traits the sync pipeline talks to,
//! plus the plain data types that cross those seams.
//!
//! ## Interface & Extensibility
//! - Implement [`Repository`] for a source-hosting backend (GitHub, a local fake, ...).
//! - Implement [`Publisher`] for a blogging platform (dev.to, ...).
//! - All network methods are async and return [`SyncError`].
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`, so consumers can generate
//!   deterministic mocks with the `test-export-mocks` feature.

use async_trait::async_trait;
use base64::Engine;
use mockall::automock;
use reqwest::Url;

use crate::error::SyncError;
use crate::payload::ArticleDocument;

/// Whether a listed repository entry is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
    /// Last path segment, e.g. `README.md`.
    pub name: String,
    /// Full path from the repository root, without a leading slash.
    pub path: String,
    pub kind: EntryKind,
    /// Content hash (git blob or tree sha).
    pub sha: String,
}

impl RepoEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// How the `content` of a fetched file is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Text,
    Base64,
}

impl From<&str> for ContentEncoding {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("base64") {
            ContentEncoding::Base64
        } else {
            ContentEncoding::Text
        }
    }
}

/// A fetched file, as returned by the repository host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub path: String,
    pub content: String,
    pub encoding: ContentEncoding,
    pub sha: String,
}

impl FileContent {
    /// Returns the file as UTF-8 text, decoding base64 payloads first.
    ///
    /// Line breaks inside base64 payloads are ignored, since hosts wrap them.
    pub fn text(&self) -> Result<String, SyncError> {
        match self.encoding {
            ContentEncoding::Text => Ok(self.content.clone()),
            ContentEncoding::Base64 => {
                let compact: String = self
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(compact.as_bytes())
                    .map_err(|e| SyncError::Decode {
                        path: self.path.clone(),
                        reason: e.to_string(),
                    })?;
                String::from_utf8(bytes).map_err(|e| SyncError::Decode {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Identity of an article on the publishing platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArticle {
    pub slug: String,
    pub id: String,
}

/// Read/write access to the repository that holds the documentation folders.
///
/// Paths are relative to the repository root; `""` is the root itself.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Repository: Send + Sync {
    /// List the direct children of a folder.
    async fn list_folder(&self, path: &str) -> Result<Vec<RepoEntry>, SyncError>;

    /// Fetch a single file.
    async fn read_file(&self, path: &str) -> Result<FileContent, SyncError>;

    /// Create a new file and return its content sha.
    async fn create_file(
        &self,
        path: &str,
        message: &str,
        content: &str,
    ) -> Result<String, SyncError>;

    /// Replace an existing file, but only if its current sha is `expected_sha`.
    ///
    /// Returns the new content sha, or [`SyncError::Conflict`] if the file
    /// changed since it was read.
    async fn update_file(
        &self,
        path: &str,
        message: &str,
        content: &str,
        expected_sha: &str,
    ) -> Result<String, SyncError>;

    /// Absolute URL (ending in `/`) that relative links inside `folder` resolve against.
    fn content_base_url(&self, folder: &str) -> Result<Url, SyncError>;
}

/// Create and update articles on a blogging platform.
///
/// Implementors own their credentials; callers only hand over documents.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Create a new (draft) article.
    async fn create_article(&self, doc: &ArticleDocument) -> Result<PublishedArticle, SyncError>;

    /// Replace the content of an existing article.
    async fn update_article(
        &self,
        article_id: &str,
        doc: &ArticleDocument,
    ) -> Result<PublishedArticle, SyncError>;
}
