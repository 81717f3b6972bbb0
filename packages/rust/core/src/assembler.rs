//! Output document assembly and artifact writing.
//!
//! Takes the run's players and extracted builds, stamps them into an
//! [`OutputDocument`], and writes the local artifacts:
//!
//! ```text
//! <dir>/
//! ├── latest_illuvium_builds.json     canonical document
//! └── illuvium_builds_<mode>.json     builds played in the search mode
//! <mirror_dir>/
//! └── latest_illuvium_builds.json     best-effort copy for a static frontend
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use gauntlet_shared::{
    GameMode, GauntletError, LeaderboardEntry, OutputDocument, OutputSettings, Result,
    WinningBuild,
};

/// Where and what to write.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Path of the canonical document.
    pub latest_path: PathBuf,
    /// Directory receiving a copy of the canonical document, if any.
    pub mirror_dir: Option<PathBuf>,
    /// Path of the by-mode document.
    pub mode_path: PathBuf,
    /// Mode the by-mode document is restricted to.
    pub mode: GameMode,
}

impl OutputConfig {
    pub fn new(settings: &OutputSettings, mode: GameMode) -> Self {
        Self {
            latest_path: settings.latest_path(),
            mirror_dir: settings.mirror_dir.clone(),
            mode_path: settings.mode_path(mode),
            mode,
        }
    }

    /// Everything under `dir`, mirror at `dir/public`.
    pub fn in_dir(dir: &Path, mode: GameMode) -> Self {
        let settings = OutputSettings {
            dir: dir.to_path_buf(),
            mirror_dir: Some(dir.join("public")),
            ..OutputSettings::default()
        };
        Self::new(&settings, mode)
    }
}

/// Checksum and size of a written file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArtifactMeta {
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Files produced by one [`write_outputs`] call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WrittenArtifacts {
    pub latest: ArtifactMeta,
    /// `None` when no mirror is configured or the copy failed.
    pub mirror: Option<ArtifactMeta>,
    pub by_mode: ArtifactMeta,
}

/// Build the document for this run, timestamped now.
pub fn assemble(players: Vec<LeaderboardEntry>, builds: Vec<WinningBuild>) -> OutputDocument {
    assemble_at(players, builds, Utc::now())
}

/// Build the document with an explicit timestamp.
pub fn assemble_at(
    players: Vec<LeaderboardEntry>,
    builds: Vec<WinningBuild>,
    timestamp: DateTime<Utc>,
) -> OutputDocument {
    OutputDocument::new(timestamp, players, builds)
}

/// Write the canonical document, its mirror, and the by-mode variant.
///
/// Each file fully replaces the previous one. Only the mirror may fail
/// without failing the call.
#[instrument(skip_all, fields(latest = %config.latest_path.display(), builds = document.builds.len(), mode = %config.mode))]
pub fn write_outputs(document: &OutputDocument, config: &OutputConfig) -> Result<WrittenArtifacts> {
    let latest = write_json(&config.latest_path, document)?;

    let mirror = config.mirror_dir.as_ref().and_then(|dir| {
        let name = config
            .latest_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("latest_illuvium_builds.json"));
        match write_json(&dir.join(name), document) {
            Ok(meta) => {
                info!(path = %meta.path.display(), "mirrored latest builds");
                Some(meta)
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "could not mirror latest builds");
                None
            }
        }
    });

    let filtered = document.for_mode(config.mode);
    let by_mode = write_json(&config.mode_path, &filtered)?;

    info!(
        builds = document.builds.len(),
        mode_builds = filtered.builds.len(),
        path = %latest.path.display(),
        "output written"
    );

    Ok(WrittenArtifacts {
        latest,
        mirror,
        by_mode,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Write pretty-printed JSON atomically (temp file, then rename).
fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<ArtifactMeta> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| GauntletError::validation(format!("JSON serialization failed: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| GauntletError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| GauntletError::validation(format!("not a file path: {}", path.display())))?;
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, &json).map_err(|e| GauntletError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| GauntletError::io(path, e))?;

    let sha256 = format!("{:x}", Sha256::digest(json.as_bytes()));
    debug!(path = %path.display(), size = json.len(), "wrote JSON file");

    Ok(ArtifactMeta {
        path: path.to_path_buf(),
        sha256,
        size_bytes: json.len(),
    })
}
