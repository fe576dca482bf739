//! Encoding a workspace into the run artifact.

use std::path::{Path, PathBuf};

use framereel_common::error::{FramereelError, FramereelResult};
use framereel_workspace::Workspace;

use crate::ffmpeg::{EncodeJob, EncodeProgressCallback, VideoEncoder};

/// Deterministic artifact path: `<output_dir>/<prefix><output_name>.<ext>`.
pub fn artifact_path(output_dir: &Path, prefix: &str, output_name: &str, ext: &str) -> PathBuf {
    output_dir.join(format!("{prefix}{output_name}.{ext}"))
}

/// A finished, probed video.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactReport {
    pub path: PathBuf,
    pub frames: u32,
    pub duration_secs: f64,
    pub size_bytes: u64,
}

impl ArtifactReport {
    pub fn rounded_duration_secs(&self) -> u64 {
        self.duration_secs.max(0.0).round() as u64
    }

    /// Size in mebibytes.
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Operator-facing one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}s, {:.2} MB)",
            self.path.display(),
            self.rounded_duration_secs(),
            self.size_mb()
        )
    }
}

/// Build the encode job for `frame_count` frames in `workspace`.
pub fn job_for_workspace(
    workspace: &Workspace,
    frame_count: u32,
    fps: u32,
    output_path: PathBuf,
) -> EncodeJob {
    EncodeJob {
        input_pattern: workspace.frame_pattern(),
        frame_count,
        fps,
        output_path,
    }
}

/// Encode the job's sequence, probe the result, and report it.
///
/// Any stale file at the output path is removed first, and the output is
/// removed again if encoding or probing fails, so a failed run never
/// leaves something that looks like a finished artifact.
pub fn encode_frames(
    encoder: &dyn VideoEncoder,
    job: &EncodeJob,
    progress: Option<EncodeProgressCallback>,
) -> FramereelResult<ArtifactReport> {
    if job.frame_count == 0 {
        return Err(FramereelError::encode(
            "No frames captured; nothing to encode",
        ));
    }
    if !encoder.is_available() {
        return Err(FramereelError::encode(format!(
            "Encoder backend '{}' is not available (expected it in PATH)",
            encoder.name()
        )));
    }

    if let Some(parent) = job.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    remove_artifact(&job.output_path)?;

    tracing::info!(
        backend = encoder.name(),
        frames = job.frame_count,
        fps = job.fps,
        output = %job.output_path.display(),
        "Starting encode"
    );

    let outcome = encoder
        .encode(job, progress)
        .and_then(|()| encoder.probe_duration(&job.output_path))
        .and_then(|duration_secs| {
            let size_bytes = std::fs::metadata(&job.output_path)
                .map_err(|e| {
                    FramereelError::encode(format!(
                        "Encoder reported success but {} is unreadable: {e}",
                        job.output_path.display()
                    ))
                })?
                .len();
            Ok((duration_secs, size_bytes))
        });

    match outcome {
        Ok((duration_secs, size_bytes)) => {
            let expected = job.expected_duration_secs();
            if (duration_secs - expected).abs() > 1.0 {
                tracing::warn!(
                    duration_secs,
                    expected_secs = expected,
                    "Probed duration differs from frame count at declared rate"
                );
            }
            Ok(ArtifactReport {
                path: job.output_path.clone(),
                frames: job.frame_count,
                duration_secs,
                size_bytes,
            })
        }
        Err(err) => {
            if let Err(cleanup) = remove_artifact(&job.output_path) {
                tracing::warn!(error = %cleanup, "Failed to remove partial artifact");
            }
            Err(err)
        }
    }
}

/// Remove the file at `path` if there is one.
pub fn remove_artifact(path: &Path) -> FramereelResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed existing artifact");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
