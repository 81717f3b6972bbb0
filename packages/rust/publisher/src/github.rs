//! GitHub contents API client.

use std::path::Path;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use gauntlet_shared::{
    ApiToken, BuildsIndex, GauntletError, OutputDocument, PublishSettings, Result,
};

use crate::{PublishReport, PublishTarget, PublishedFile, remote_path};

/// File name of the published builds index.
pub const INDEX_FILE_NAME: &str = "builds_index.json";

const USER_AGENT: &str = concat!("gauntlet-publisher/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Deserialize)]
struct ExistingFile {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    download_url: Option<String>,
}

/// Writes files to one repository branch, creating or replacing them.
pub struct GitHubPublisher {
    client: Client,
    settings: PublishSettings,
    token: ApiToken,
}

impl GitHubPublisher {
    pub fn new(settings: PublishSettings, token: ApiToken, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GauntletError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            settings,
            token,
        })
    }

    /// `{api}/repos/{owner}/{repo}/contents/{path}`
    fn contents_url(&self, remote_path: &str) -> Result<Url> {
        let relative = format!(
            "repos/{}/{}/contents/{}",
            self.settings.owner,
            self.settings.repo,
            remote_path.trim_start_matches('/')
        );
        self.settings.api_base.join(&relative).map_err(|e| {
            GauntletError::config(format!(
                "invalid contents URL {}{relative}: {e}",
                self.settings.api_base
            ))
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(header::AUTHORIZATION, format!("token {}", self.token.expose()))
            .header(header::ACCEPT, ACCEPT)
    }

    /// Blob hash of the file currently at `remote_path` on the branch.
    ///
    /// Anything other than a 200 with a `sha` means "create": a missing file,
    /// an API error, and a transport failure all yield `None`.
    pub async fn file_sha(&self, remote_path: &str) -> Option<String> {
        let mut url = self.contents_url(remote_path).ok()?;
        url.query_pairs_mut().append_pair("ref", &self.settings.branch);

        let response = match self.authorized(self.client.get(url)).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(path = remote_path, error = %e, "could not look up existing file");
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            debug!(path = remote_path, status = %response.status(), "no existing file");
            return None;
        }

        match response.json::<ExistingFile>().await {
            Ok(existing) => Some(existing.sha),
            Err(e) => {
                warn!(path = remote_path, error = %e, "existing file response had no sha");
                None
            }
        }
    }

    /// Create or replace `remote_path` with `content`, returning the download URL.
    ///
    /// 409 and 422 (stale hash, conflicting path) are [`GauntletError::PublishConflict`];
    /// other non-success statuses are [`GauntletError::Api`].
    pub async fn put_file(&self, remote_path: &str, content: &[u8], message: &str) -> Result<String> {
        let url = self.contents_url(remote_path)?;
        let sha = self.file_sha(remote_path).await;
        debug!(path = remote_path, replacing = sha.is_some(), "uploading");

        let payload = PutContents {
            message,
            content: STANDARD.encode(content),
            branch: &self.settings.branch,
            sha,
        };

        let response = self
            .authorized(self.client.put(url.clone()))
            .json(&payload)
            .send()
            .await
            .map_err(|e| GauntletError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GauntletError::Transport(format!("{url}: failed to read body: {e}")))?;

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let parsed: PutResponse = serde_json::from_str(&body).map_err(|e| {
                    GauntletError::shape(format!("{url}: unexpected upload response: {e}"))
                })?;
                parsed.content.download_url.ok_or_else(|| {
                    GauntletError::shape(format!("{url}: upload response has no download_url"))
                })
            }
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(GauntletError::PublishConflict {
                    path: remote_path.to_string(),
                    status: status.as_u16(),
                    body,
                })
            }
            _ => Err(GauntletError::Api {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            }),
        }
    }

    /// Upload one local file. Never fails: a missing file or a rejected write
    /// is logged and yields `None`.
    #[instrument(skip_all, fields(local = %target.local.display(), remote = %target.remote_path))]
    pub async fn publish(&self, target: &PublishTarget) -> Option<String> {
        let content = match std::fs::read(&target.local) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "local file not found, skipping upload");
                return None;
            }
        };
        self.publish_bytes(&target.remote_path, &content, &target.message)
            .await
    }

    async fn publish_bytes(&self, remote_path: &str, content: &[u8], message: &str) -> Option<String> {
        match self.put_file(remote_path, content, message).await {
            Ok(download_url) => {
                info!(path = remote_path, %download_url, "uploaded");
                Some(download_url)
            }
            Err(e) => {
                error!(path = remote_path, error = %e, "upload failed");
                None
            }
        }
    }

    /// Derive the builds index from the latest document at `latest` and publish it.
    ///
    /// The index is never written locally.
    pub async fn publish_index(&self, latest: &Path) -> Option<String> {
        let remote = remote_path(&self.settings, INDEX_FILE_NAME);
        let document = match read_document(latest) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %latest.display(), error = %e, "cannot derive builds index");
                return None;
            }
        };

        let index = BuildsIndex::from_document(&document, Utc::now());
        let body = match serde_json::to_vec_pretty(&index) {
            Ok(b) => b,
            Err(e) => {
                error!(error = %e, "builds index serialization failed");
                return None;
            }
        };
        info!(total_builds = index.total_builds, "publishing builds index");
        self.publish_bytes(&remote, &body, "Update builds index").await
    }

    /// Publish every target in order, then the index derived from `latest`.
    #[instrument(skip_all, fields(owner = %self.settings.owner, repo = %self.settings.repo, targets = targets.len()))]
    pub async fn publish_all(&self, targets: &[PublishTarget], latest: &Path) -> PublishReport {
        let mut report = PublishReport::default();

        for target in targets {
            let download_url = self.publish(target).await;
            report.files.push(self.record(&target.remote_path, download_url));
        }

        let index_path = remote_path(&self.settings, INDEX_FILE_NAME);
        let download_url = self.publish_index(latest).await;
        report.files.push(self.record(&index_path, download_url));

        info!(
            uploaded = report.uploaded_count(),
            attempted = report.files.len(),
            "publish complete"
        );
        report
    }

    fn record(&self, remote_path: &str, download_url: Option<String>) -> PublishedFile {
        PublishedFile {
            remote_path: remote_path.to_string(),
            raw_url: self.settings.raw_url(remote_path),
            download_url,
        }
    }
}

fn read_document(path: &Path) -> Result<OutputDocument> {
    let content = std::fs::read_to_string(path).map_err(|e| GauntletError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| GauntletError::shape(format!("{}: not a builds document: {e}", path.display())))
}
