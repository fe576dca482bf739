//! The capture loop.
//!
//! One tick: read the surface title; stop if it is the sentinel; otherwise
//! capture a still into the next numbered frame file, then sleep one frame
//! interval. The sentinel check precedes the capture, so the frame that
//! flips the title is never recorded. Reaching `max_frames` without the
//! sentinel is a truncation, not a failure.

use std::time::Duration;

use framereel_common::clock::{FramePacer, RunClock};
use framereel_common::config::PipelineConfig;
use framereel_common::error::{FramereelError, FramereelResult};
use framereel_workspace::{CaptureOutcome, Workspace};

use crate::surface::RenderSurface;

/// Loop parameters, taken from the pipeline config.
#[derive(Debug, Clone)]
pub struct CaptureParams {
    pub frame_interval: Duration,
    pub max_frames: u32,
    pub sentinel: String,
    pub progress_every: u32,
}

impl CaptureParams {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            frame_interval: config.frame_interval(),
            max_frames: config.max_frames,
            sentinel: config.sentinel.clone(),
            progress_every: config.progress_every,
        }
    }
}

/// Periodic capture progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureProgress {
    pub frames: u32,
    pub elapsed_secs: f64,
}

/// Result of a finished capture phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSummary {
    /// Frames written, indices `0..frames`.
    pub frames: u32,
    pub elapsed_secs: f64,
    pub outcome: CaptureOutcome,
}

/// Capture frames from `surface` into `workspace` until the sentinel or the
/// safety bound.
pub async fn capture_frames(
    surface: &mut dyn RenderSurface,
    workspace: &Workspace,
    params: &CaptureParams,
    progress: Option<&(dyn Fn(CaptureProgress) + Send + Sync)>,
) -> FramereelResult<CaptureSummary> {
    let clock = RunClock::start();
    let pacer = FramePacer::new(params.frame_interval, params.progress_every);
    let mut outcome = CaptureOutcome::Truncated;
    let mut frame: u32 = 0;

    tracing::info!(
        max_frames = params.max_frames,
        interval_ms = pacer.interval().as_millis() as u64,
        "Capture started"
    );

    while frame < params.max_frames {
        if surface.title().await? == params.sentinel {
            outcome = CaptureOutcome::Completed;
            break;
        }

        let png = surface.capture_png().await?;
        let path = workspace.frame_path(frame);
        tokio::fs::write(&path, png).await.map_err(|e| {
            FramereelError::capture(format!("Failed to write {}: {e}", path.display()))
        })?;
        frame += 1;

        pacer.wait().await;

        if pacer.should_report(frame) {
            let report = CaptureProgress {
                frames: frame,
                elapsed_secs: clock.elapsed_secs(),
            };
            tracing::debug!(frames = report.frames, elapsed_secs = report.elapsed_secs, "Capture progress");
            if let Some(cb) = progress {
                cb(report);
            }
        }
    }

    let summary = CaptureSummary {
        frames: frame,
        elapsed_secs: clock.elapsed_secs(),
        outcome,
    };

    match outcome {
        CaptureOutcome::Completed => tracing::info!(
            frames = summary.frames,
            elapsed_secs = summary.elapsed_secs,
            "Capture completed on sentinel"
        ),
        CaptureOutcome::Truncated => tracing::warn!(
            frames = summary.frames,
            elapsed_secs = summary.elapsed_secs,
            "Sentinel never observed; capture truncated at max_frames"
        ),
    }

    Ok(summary)
}
