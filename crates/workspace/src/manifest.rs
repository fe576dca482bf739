//! Run manifest (`run.json`), written next to the frames for inspection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use framereel_common::error::{FramereelError, FramereelResult};

use crate::scratch::Workspace;

/// File name of the manifest inside the workspace.
pub const MANIFEST_FILE: &str = "run.json";

/// How the capture phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureOutcome {
    /// The render logic set the sentinel title.
    Completed,
    /// The safety bound stopped the loop before the sentinel appeared.
    Truncated,
}

/// Record of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub episode: String,
    pub output_name: String,
    pub fps: u32,
    pub size: u32,
    pub max_frames: u32,

    /// Run start (RFC 3339).
    pub started_at: String,

    /// Frames on disk after capture.
    pub frames: u32,
    pub capture_outcome: CaptureOutcome,
    pub capture_secs: f64,

    /// Set once the encoder has produced and probed the artifact.
    #[serde(default)]
    pub artifact: Option<ArtifactRecord>,
}

/// Encoded artifact as recorded in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub size_bytes: u64,
}

impl RunManifest {
    /// Write the manifest into the workspace, replacing any previous one.
    pub fn save(&self, workspace: &Workspace) -> FramereelResult<PathBuf> {
        let path = workspace.root().join(MANIFEST_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?).map_err(|e| {
            FramereelError::workspace(format!("Failed to write {}: {e}", path.display()))
        })?;
        Ok(path)
    }

    pub fn load(workspace: &Workspace) -> FramereelResult<Self> {
        let path = workspace.root().join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            FramereelError::workspace(format!("Failed to read {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Manifest of the last run left in `workspace_dir`, if there is one.
    pub fn last_run(workspace_dir: &Path) -> FramereelResult<Option<Self>> {
        if !workspace_dir.join(MANIFEST_FILE).is_file() {
            return Ok(None);
        }
        let workspace = Workspace::open(workspace_dir)?;
        Self::load(&workspace).map(Some)
    }
}
