#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine;
use blogpost_sync_core::contract::{
    ContentEncoding, EntryKind, FileContent, RepoEntry, Repository,
};
use blogpost_sync_core::SyncError;
use reqwest::Url;

/// In-memory repository: a flat map of file paths plus explicitly created folders.
///
/// Files are served base64-encoded with line wrapping, the way GitHub does.
#[derive(Default)]
pub struct MemoryRepository {
    files: Mutex<BTreeMap<String, String>>,
    dirs: Mutex<BTreeSet<String>>,
    pub listed: Mutex<Vec<String>>,
    pub writes: Mutex<Vec<String>>,
    /// Paths served with a payload that is not valid base64.
    corrupt: Mutex<BTreeSet<String>>,
    /// Paths another writer creates just before we do.
    raced: Mutex<BTreeSet<String>>,
}

pub fn sha_of(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.put(path, content);
        self
    }

    /// Add a file whose content cannot be decoded when read back.
    pub fn with_corrupt_file(self, path: &str) -> Self {
        self.put(path, "");
        self.corrupt.lock().unwrap().insert(path.to_string());
        self
    }

    /// Make the next create of `path` lose to a concurrent writer.
    pub fn with_create_race(self, path: &str) -> Self {
        self.raced.lock().unwrap().insert(path.to_string());
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.dirs.lock().unwrap().insert(path.to_string());
        self
    }

    /// Write a file behind the back of any record that already read it.
    pub fn put(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    fn children(&self, folder: &str) -> Vec<RepoEntry> {
        let prefix = if folder.is_empty() {
            String::new()
        } else {
            format!("{folder}/")
        };
        let mut out: BTreeMap<String, RepoEntry> = BTreeMap::new();

        let files = self.files.lock().unwrap();
        let dirs = self.dirs.lock().unwrap();
        let paths = files
            .keys()
            .map(|p| (p.clone(), true))
            .chain(dirs.iter().map(|p| (p.clone(), false)));

        for (path, is_file) in paths {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            let (name, nested) = match rest.split_once('/') {
                Some((head, _)) => (head, true),
                None => (rest, false),
            };
            let full = format!("{prefix}{name}");
            let kind = if nested || !is_file {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            let sha = match kind {
                EntryKind::File => sha_of(&files[&full]),
                EntryKind::Directory => sha_of(&format!("tree:{full}")),
            };
            out.entry(name.to_string()).or_insert(RepoEntry {
                name: name.to_string(),
                path: full,
                kind,
                sha,
            });
        }
        out.into_values().collect()
    }
}

fn wrap_base64(content: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(content.as_bytes());
    encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_folder(&self, path: &str) -> Result<Vec<RepoEntry>, SyncError> {
        self.listed.lock().unwrap().push(path.to_string());
        Ok(self.children(path))
    }

    async fn read_file(&self, path: &str) -> Result<FileContent, SyncError> {
        let content = self
            .file(path)
            .ok_or_else(|| SyncError::NotFound(path.to_string()))?;
        let encoded = if self.corrupt.lock().unwrap().contains(path) {
            "!!!not base64".to_string()
        } else {
            wrap_base64(&content)
        };
        Ok(FileContent {
            path: path.to_string(),
            content: encoded,
            encoding: ContentEncoding::Base64,
            sha: sha_of(&content),
        })
    }

    async fn create_file(
        &self,
        path: &str,
        _message: &str,
        content: &str,
    ) -> Result<String, SyncError> {
        if self.raced.lock().unwrap().remove(path) {
            self.put(path, "{}");
        }
        if self.file(path).is_some() {
            return Err(SyncError::Conflict {
                path: path.to_string(),
            });
        }
        self.writes.lock().unwrap().push(path.to_string());
        self.put(path, content);
        Ok(sha_of(content))
    }

    async fn update_file(
        &self,
        path: &str,
        _message: &str,
        content: &str,
        expected_sha: &str,
    ) -> Result<String, SyncError> {
        let current = self
            .file(path)
            .ok_or_else(|| SyncError::NotFound(path.to_string()))?;
        if sha_of(&current) != expected_sha {
            return Err(SyncError::Conflict {
                path: path.to_string(),
            });
        }
        self.writes.lock().unwrap().push(path.to_string());
        self.put(path, content);
        Ok(sha_of(content))
    }

    fn content_base_url(&self, folder: &str) -> Result<Url, SyncError> {
        Url::parse(&format!(
            "https://raw.githubusercontent.com/org/repo/main/{folder}/"
        ))
        .map_err(|e| SyncError::InvalidUrl(e.to_string()))
    }
}
