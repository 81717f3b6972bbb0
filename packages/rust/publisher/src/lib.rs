//! Publishes the build documents to a GitHub repository through the
//! contents API, so static sites can fetch them from raw URLs.
//!
//! Each upload is independent: a failed or rejected write is logged and
//! reported, and the remaining targets are still attempted.

mod github;
pub mod page;

use std::path::PathBuf;

use serde::Serialize;

use gauntlet_shared::{GameMode, OutputSettings, PublishSettings};

pub use github::{GitHubPublisher, INDEX_FILE_NAME};

/// One local file and where it goes in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub local: PathBuf,
    /// Path inside the repository, e.g. `data/latest_builds.json`.
    pub remote_path: String,
    pub message: String,
}

impl PublishTarget {
    pub fn new(
        local: impl Into<PathBuf>,
        remote_path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            local: local.into(),
            remote_path: remote_path.into(),
            message: message.into(),
        }
    }
}

/// The latest document and the by-mode document for `mode`.
pub fn default_targets(
    output: &OutputSettings,
    publish: &PublishSettings,
    mode: GameMode,
) -> Vec<PublishTarget> {
    vec![
        PublishTarget::new(
            output.latest_path(),
            remote_path(publish, "latest_builds.json"),
            "Update latest Illuvium builds data",
        ),
        PublishTarget::new(
            output.mode_path(mode),
            remote_path(publish, &format!("{}_builds.json", mode.slug())),
            format!("Update {mode} builds data"),
        ),
    ]
}

/// Join a file name onto the configured data directory.
pub fn remote_path(publish: &PublishSettings, file_name: &str) -> String {
    let dir = publish.data_dir.trim_matches('/');
    if dir.is_empty() {
        file_name.to_string()
    } else {
        format!("{dir}/{file_name}")
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What happened to one remote path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedFile {
    pub remote_path: String,
    /// Stable `raw.githubusercontent.com` URL for the path.
    pub raw_url: String,
    /// URL returned by the API; `None` when the upload did not happen.
    pub download_url: Option<String>,
}

impl PublishedFile {
    pub fn succeeded(&self) -> bool {
        self.download_url.is_some()
    }
}

/// Outcome of a publish run, in upload order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub files: Vec<PublishedFile>,
}

impl PublishReport {
    pub fn uploaded(&self) -> impl Iterator<Item = &PublishedFile> {
        self.files.iter().filter(|f| f.succeeded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PublishedFile> {
        self.files.iter().filter(|f| !f.succeeded())
    }

    pub fn uploaded_count(&self) -> usize {
        self.uploaded().count()
    }
}
