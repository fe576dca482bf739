//! Run session management.
//!
//! A run moves strictly forward through
//! `Idle → Preparing → Rendering → Capturing → Encoding → Done`.
//! Any failure moves it to `Failed`, which is final: the operator re-runs
//! the whole pipeline. Nothing is retried.

use std::path::PathBuf;
use std::sync::Arc;

use framereel_common::clock::RunClock;
use framereel_common::config::PipelineConfig;
use framereel_common::error::{FramereelError, FramereelResult};
use framereel_encoder::{
    artifact_path, encode_frames, job_for_workspace, remove_artifact, ArtifactReport,
    EncodeProgress, EncodeProgressCallback, VideoEncoder,
};
use framereel_workspace::{prepare_run, ArtifactRecord, RunManifest, RunRequest, Workspace};

use crate::capture::{capture_frames, CaptureParams, CaptureProgress, CaptureSummary};
use crate::surface::{RenderSurface, SurfaceLauncher};

/// State of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Session created but not started.
    Idle,
    /// Resolving the episode and recreating the workspace.
    Preparing,
    /// Launching the rendering environment and loading the document.
    Rendering,
    /// Capture loop running.
    Capturing,
    /// Encoder running over the captured frames.
    Encoding,
    /// Artifact written and probed.
    Done,
    /// A stage failed; the run is abandoned.
    Failed,
}

/// Something worth telling the operator about.
#[derive(Debug, Clone)]
pub enum RunEvent {
    StateChanged(RunState),
    CaptureProgress(CaptureProgress),
    CaptureFinished(CaptureSummary),
    EncodeProgress(EncodeProgress),
}

/// Observer for run events.
pub type RunObserver = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub workspace: PathBuf,
    pub capture: CaptureSummary,
    pub artifact: ArtifactReport,
}

/// One pipeline run for one episode.
pub struct RunSession {
    config: PipelineConfig,
    request: RunRequest,
    state: RunState,
    observer: Option<RunObserver>,
}

impl RunSession {
    /// Create a session. The config is validated here, before any side
    /// effect of the run.
    pub fn new(config: PipelineConfig, request: RunRequest) -> FramereelResult<Self> {
        config.validate()?;
        request.check_output_name()?;
        Ok(Self {
            config,
            request,
            state: RunState::Idle,
            observer: None,
        })
    }

    /// Receive [`RunEvent`]s while the run progresses.
    pub fn with_observer(mut self, observer: RunObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Current session state.
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn request(&self) -> &RunRequest {
        &self.request
    }

    /// Path the artifact will be written to.
    pub fn artifact_path(&self) -> PathBuf {
        artifact_path(
            &self.config.output_dir,
            &self.config.output_prefix,
            &self.request.output_name,
            framereel_encoder::DEFAULT_SETTINGS.extension,
        )
    }

    /// Drive the run to `Done` or `Failed`.
    pub async fn run(
        &mut self,
        launcher: &dyn SurfaceLauncher,
        encoder: &dyn VideoEncoder,
    ) -> FramereelResult<RunReport> {
        if self.state != RunState::Idle {
            return Err(FramereelError::capture("Session already started"));
        }

        let result = self.run_stages(launcher, encoder).await;
        match &result {
            Ok(report) => {
                self.transition(RunState::Done);
                tracing::info!(
                    artifact = %report.artifact.path.display(),
                    frames = report.capture.frames,
                    duration_secs = report.artifact.duration_secs,
                    "Run finished"
                );
            }
            Err(e) => {
                tracing::error!(stage = ?self.state, error = %e, "Run failed");
                // Once encoding started, a failed run must not leave a
                // finished-looking artifact behind.
                if self.state == RunState::Encoding {
                    if let Err(cleanup) = remove_artifact(&self.artifact_path()) {
                        tracing::warn!(error = %cleanup, "Failed to remove artifact of failed run");
                    }
                }
                self.transition(RunState::Failed);
            }
        }
        result
    }

    async fn run_stages(
        &mut self,
        launcher: &dyn SurfaceLauncher,
        encoder: &dyn VideoEncoder,
    ) -> FramereelResult<RunReport> {
        self.transition(RunState::Preparing);
        let workspace = prepare_run(&self.config, &self.request)?;
        remove_artifact(&self.artifact_path())?;
        let clock = RunClock::start();

        self.transition(RunState::Rendering);
        tracing::info!(launcher = launcher.name(), "Launching render surface");
        let mut surface = launcher
            .launch(
                &workspace.document_path(),
                self.config.size,
                self.config.settle_interval(),
            )
            .await?;

        self.transition(RunState::Capturing);
        let capture = self.capture(surface.as_mut(), &workspace).await;
        if let Err(e) = surface.shutdown().await {
            tracing::warn!(error = %e, "Render surface teardown failed");
        }
        drop(surface);
        let capture = capture?;
        self.emit(RunEvent::CaptureFinished(capture));

        workspace.verify_sequence(capture.frames)?;
        let mut manifest = self.manifest(&clock, &capture);
        manifest.save(&workspace)?;

        self.transition(RunState::Encoding);
        let job = job_for_workspace(
            &workspace,
            capture.frames,
            self.config.fps,
            self.artifact_path(),
        );
        let artifact = encode_frames(encoder, &job, self.encode_progress())?;

        manifest.artifact = Some(ArtifactRecord {
            path: artifact.path.clone(),
            duration_secs: artifact.duration_secs,
            size_bytes: artifact.size_bytes,
        });
        manifest.save(&workspace)?;

        Ok(RunReport {
            workspace: workspace.root().to_path_buf(),
            capture,
            artifact,
        })
    }

    async fn capture(
        &self,
        surface: &mut dyn RenderSurface,
        workspace: &Workspace,
    ) -> FramereelResult<CaptureSummary> {
        let params = CaptureParams::from_config(&self.config);
        match self.observer.clone() {
            Some(observer) => {
                let forward = move |p: CaptureProgress| observer(RunEvent::CaptureProgress(p));
                capture_frames(surface, workspace, &params, Some(&forward)).await
            }
            None => capture_frames(surface, workspace, &params, None).await,
        }
    }

    fn encode_progress(&self) -> Option<EncodeProgressCallback> {
        let observer = self.observer.clone()?;
        Some(Box::new(move |p: EncodeProgress| {
            observer(RunEvent::EncodeProgress(p))
        }))
    }

    fn manifest(&self, clock: &RunClock, capture: &CaptureSummary) -> RunManifest {
        RunManifest {
            episode: self.request.episode.clone(),
            output_name: self.request.output_name.clone(),
            fps: self.config.fps,
            size: self.config.size,
            max_frames: self.config.max_frames,
            started_at: clock.epoch_wall().to_string(),
            frames: capture.frames,
            capture_outcome: capture.outcome,
            capture_secs: capture.elapsed_secs,
            artifact: None,
        }
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = ?self.state, to = ?next, "Run state change");
        self.state = next;
        self.emit(RunEvent::StateChanged(next));
    }

    fn emit(&self, event: RunEvent) {
        if let Some(observer) = &self.observer {
            observer(event);
        }
    }
}
