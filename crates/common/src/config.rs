//! Pipeline configuration.
//!
//! Every tunable of a run lives here. The struct is built once at startup
//! (defaults, then an optional config file, then CLI overrides) and is
//! read-only afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FramereelError, FramereelResult};

/// Highest frame count the 5-digit frame numbering can order correctly.
pub const MAX_NUMBERED_FRAMES: u32 = 99_999;

/// Global pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capture cadence, also the frame rate declared to the encoder.
    pub fps: u32,

    /// Edge of the square viewport in pixels (equals output resolution).
    pub size: u32,

    /// Safety bound on capture ticks.
    pub max_frames: u32,

    /// Wait after the document loads before the first tick (ms).
    pub settle_ms: u64,

    /// Emit a progress report every N frames.
    pub progress_every: u32,

    /// Title value the render logic sets once its animation has finished.
    pub sentinel: String,

    /// Directory of render-logic units (`<episode>.js`).
    pub episodes_dir: PathBuf,

    /// Shared render-surface template.
    pub template_path: PathBuf,

    /// Marker in the template replaced by the episode logic.
    pub template_marker: String,

    /// Fixed, tool-owned scratch directory. Recreated on every run.
    pub workspace_dir: PathBuf,

    /// Base directory for finished videos.
    pub output_dir: PathBuf,

    /// Constant prefix of every artifact filename.
    pub output_prefix: String,

    /// Explicit Chromium executable; autodetected when unset.
    pub browser: Option<PathBuf>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "framereel=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fps: 12,
            size: 1080,
            max_frames: 3000,
            settle_ms: 2000,
            progress_every: 60,
            sentinel: "DONE".to_string(),
            episodes_dir: PathBuf::from("episodes"),
            template_path: PathBuf::from("render").join("template.html"),
            template_marker: "/*__EPISODE__*/".to_string(),
            workspace_dir: std::env::temp_dir().join("framereel-frames"),
            output_dir: PathBuf::from("videos"),
            output_prefix: "framereel-".to_string(),
            browser: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl PipelineConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Unlike [`PipelineConfig::load`],
    /// a broken file is an error.
    pub fn load_from(path: &Path) -> FramereelResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FramereelError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            FramereelError::config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> FramereelResult<()> {
        if self.fps == 0 {
            return Err(FramereelError::config("fps must be at least 1"));
        }
        if self.fps > 1000 {
            return Err(FramereelError::config(format!(
                "fps {} exceeds 1000; the pacing interval would be zero",
                self.fps
            )));
        }
        if self.size < 16 || self.size % 2 != 0 {
            return Err(FramereelError::config(format!(
                "size must be an even number of pixels >= 16 (got {})",
                self.size
            )));
        }
        if self.max_frames == 0 || self.max_frames > MAX_NUMBERED_FRAMES {
            return Err(FramereelError::config(format!(
                "max_frames must be within 1..={MAX_NUMBERED_FRAMES} (got {})",
                self.max_frames
            )));
        }
        if self.progress_every == 0 {
            return Err(FramereelError::config("progress_every must be at least 1"));
        }
        if self.sentinel.is_empty() {
            return Err(FramereelError::config("sentinel must not be empty"));
        }
        if self.template_marker.is_empty() {
            return Err(FramereelError::config("template_marker must not be empty"));
        }
        Ok(())
    }

    /// Pacing sleep after each captured frame.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.fps.max(1) as u64)
    }

    /// Wait between document load and the first capture tick.
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("framereel").join("config.json")
}
