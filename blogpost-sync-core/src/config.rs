use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A flavour of documentation folder.
///
/// Folders are recognised by a marker subfolder whose name ends with
/// `marker_suffix`; the marker folder holds the sidecar file named `sidecar_file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocFolderKind {
    pub name: String,
    pub marker_suffix: String,
    pub sidecar_file: String,
}

impl DocFolderKind {
    pub fn blog_post() -> Self {
        Self {
            name: "post".to_string(),
            marker_suffix: ".blogpost".to_string(),
            sidecar_file: "post.json".to_string(),
        }
    }

    pub fn series_page() -> Self {
        Self {
            name: "series".to_string(),
            marker_suffix: ".seriespage".to_string(),
            sidecar_file: "series.json".to_string(),
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::blog_post(), Self::series_page()]
    }

    pub fn trace_loaded(&self) {
        info!(
            kind = %self.name,
            marker_suffix = %self.marker_suffix,
            sidecar_file = %self.sidecar_file,
            "Loaded documentation folder kind"
        );
    }
}

/// Settings for one synchronisation run.
#[derive(Debug, Clone)]
pub struct SynchroniseConfig {
    pub kinds: Vec<DocFolderKind>,
    /// Publish under this organization on the platform, if set.
    pub organization_id: Option<i64>,
    /// Route a README's opening image to the article cover.
    pub cover_image: bool,
    /// Stop the whole run on a malformed README instead of skipping the folder.
    pub abort_on_format_error: bool,
}

impl Default for SynchroniseConfig {
    fn default() -> Self {
        Self {
            kinds: DocFolderKind::defaults(),
            organization_id: None,
            cover_image: false,
            abort_on_format_error: true,
        }
    }
}

impl SynchroniseConfig {
    pub fn trace_loaded(&self) {
        info!(
            kinds_count = self.kinds.len(),
            organization_id = ?self.organization_id,
            cover_image = self.cover_image,
            abort_on_format_error = self.abort_on_format_error,
            "Loaded SynchroniseConfig"
        );
        for kind in &self.kinds {
            kind.trace_loaded();
        }
        debug!(?self, "SynchroniseConfig loaded (full debug)");
    }
}
