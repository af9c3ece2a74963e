use thiserror::Error;

/// Why a README could not be turned into an article.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("README is empty")]
    Empty,

    #[error("README does not start with a H1 (#) heading")]
    NotH1,

    #[error("README heading has no title text")]
    EmptyTitle,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to parse the README in '{folder}' to create a blog post: {source}")]
    Format {
        folder: String,
        #[source]
        source: FormatError,
    },

    #[error("publishing platform rejected the request (status {status}): {body}")]
    RemoteApi { status: u16, body: String },

    #[error("'{path}' changed since it was read; it will be retried on the next run")]
    Conflict { path: String },

    #[error("repository path not found: {0}")]
    NotFound(String),

    #[error("repository request failed (status {status}): {body}")]
    Repository { status: u16, body: String },

    #[error("could not decode '{path}': {reason}")]
    Decode { path: String, reason: String },

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl SyncError {
    /// A lost race on a sidecar commit. Recovery is a later run, not a retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::Conflict { .. })
    }

    pub fn is_format(&self) -> bool {
        matches!(self, SyncError::Format { .. })
    }
}
