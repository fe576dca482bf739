use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use framereel_capture_engine::{RenderSurface, RunEvent, RunSession, RunState, SurfaceLauncher};
use framereel_common::config::PipelineConfig;
use framereel_common::error::{FramereelError, FramereelResult};
use framereel_encoder::{EncodeJob, EncodeProgressCallback, VideoEncoder};
use framereel_workspace::{CaptureOutcome, RunManifest, RunRequest, Workspace};

const TEMPLATE: &str = "<html><script>/*__EPISODE__*/</script></html>";

#[derive(Clone, Default)]
struct SurfaceScript {
    /// Title turns into the sentinel on this tick; `None` never.
    done_at: Option<u32>,
    /// Screenshot fails on this tick.
    fail_capture_at: Option<u32>,
    shut_down: Arc<AtomicBool>,
}

struct ScriptedSurface {
    script: SurfaceScript,
    tick: u32,
}

#[async_trait::async_trait]
impl RenderSurface for ScriptedSurface {
    async fn title(&mut self) -> FramereelResult<String> {
        let done = self.script.done_at.map(|n| self.tick >= n).unwrap_or(false);
        Ok(if done { "DONE" } else { "" }.to_string())
    }

    async fn capture_png(&mut self) -> FramereelResult<Vec<u8>> {
        if self.script.fail_capture_at == Some(self.tick) {
            return Err(FramereelError::capture("Screenshot failed: target closed"));
        }
        self.tick += 1;
        Ok(b"\x89PNG".to_vec())
    }

    async fn shutdown(&mut self) -> FramereelResult<()> {
        self.script.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedLauncher {
    script: SurfaceScript,
    fail: bool,
    launched_with: Mutex<Option<(PathBuf, u32)>>,
}

impl ScriptedLauncher {
    fn new(script: SurfaceScript) -> Self {
        Self {
            script,
            fail: false,
            launched_with: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl SurfaceLauncher for ScriptedLauncher {
    async fn launch(
        &self,
        document: &Path,
        size: u32,
        settle: Duration,
    ) -> FramereelResult<Box<dyn RenderSurface>> {
        if self.fail {
            return Err(FramereelError::environment(
                "Failed to launch browser: no executable",
            ));
        }
        *self.launched_with.lock().unwrap() = Some((document.to_path_buf(), size));
        tokio::time::sleep(settle).await;
        Ok(Box::new(ScriptedSurface {
            script: self.script.clone(),
            tick: 0,
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct RecordingEncoder {
    fail: bool,
    /// Block the post-encode manifest update by turning `run.json` into a
    /// directory.
    block_manifest: bool,
    encoded_frames: AtomicU32,
    calls: AtomicU32,
}

impl VideoEncoder for RecordingEncoder {
    fn encode(
        &self,
        job: &EncodeJob,
        _progress: Option<EncodeProgressCallback>,
    ) -> FramereelResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FramereelError::encode(
                "ffmpeg failed (status exit status: 1): Invalid data",
            ));
        }
        let workspace = Workspace::open(job.input_pattern.parent().unwrap())?;
        let frames = workspace.frames()?.len() as u32;
        assert_eq!(frames, job.frame_count);
        self.encoded_frames.store(frames, Ordering::SeqCst);
        std::fs::write(&job.output_path, vec![7u8; 4096])?;
        if self.block_manifest {
            let manifest = workspace.root().join("run.json");
            std::fs::remove_file(&manifest)?;
            std::fs::create_dir(&manifest)?;
        }
        Ok(())
    }

    fn probe_duration(&self, _path: &Path) -> FramereelResult<f64> {
        Ok(self.encoded_frames.load(Ordering::SeqCst) as f64 / 12.0)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn fixture(tag: &str) -> (PathBuf, PipelineConfig) {
    let root = std::env::temp_dir().join(format!("framereel_it_session_{tag}"));
    let _ = std::fs::remove_dir_all(&root);
    std::fs::create_dir_all(root.join("episodes")).unwrap();
    std::fs::create_dir_all(root.join("render")).unwrap();
    std::fs::write(root.join("render").join("template.html"), TEMPLATE).unwrap();
    std::fs::write(root.join("episodes").join("intro.js"), "document.title='DONE'").unwrap();

    let config = PipelineConfig {
        episodes_dir: root.join("episodes"),
        template_path: root.join("render").join("template.html"),
        workspace_dir: root.join("scratch"),
        output_dir: root.join("videos"),
        ..PipelineConfig::default()
    };
    (root, config)
}

fn frame_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("frame_"))
        .collect();
    names.sort();
    names
}

#[tokio::test(start_paused = true)]
async fn sentinel_at_tick_45_captures_exactly_45_frames() {
    let (root, config) = fixture("tick45");
    let script = SurfaceScript {
        done_at: Some(45),
        ..SurfaceScript::default()
    };
    let launcher = ScriptedLauncher::new(script.clone());
    let encoder = RecordingEncoder::default();

    let mut session = RunSession::new(config.clone(), RunRequest::new("intro", None)).unwrap();
    let report = session.run(&launcher, &encoder).await.unwrap();

    assert_eq!(session.state(), RunState::Done);
    assert_eq!(report.capture.frames, 45);
    assert_eq!(report.capture.outcome, CaptureOutcome::Completed);

    let names = frame_names(&config.workspace_dir);
    assert_eq!(names.len(), 45);
    assert_eq!(names.first().unwrap(), "frame_00000.png");
    assert_eq!(names.last().unwrap(), "frame_00044.png");

    assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(encoder.encoded_frames.load(Ordering::SeqCst), 45);
    assert!(script.shut_down.load(Ordering::SeqCst));

    let expected = config.output_dir.join("framereel-intro.mp4");
    assert_eq!(report.artifact.path, expected);
    assert!(expected.exists());
    assert_eq!(report.artifact.size_bytes, 4096);

    let (document, size) = launcher.launched_with.lock().unwrap().clone().unwrap();
    assert_eq!(document, config.workspace_dir.join("index.html"));
    assert_eq!(size, 1080);
    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test(start_paused = true)]
async fn missing_sentinel_truncates_at_bound_and_still_encodes() {
    let (root, config) = fixture("bound");
    let launcher = ScriptedLauncher::new(SurfaceScript::default());
    let encoder = RecordingEncoder::default();

    let mut session = RunSession::new(config.clone(), RunRequest::new("intro", None)).unwrap();
    let report = session.run(&launcher, &encoder).await.unwrap();

    assert_eq!(session.state(), RunState::Done);
    assert_eq!(report.capture.frames, 3000);
    assert_eq!(report.capture.outcome, CaptureOutcome::Truncated);
    assert_eq!(encoder.encoded_frames.load(Ordering::SeqCst), 3000);
    assert_eq!(report.artifact.rounded_duration_secs(), 250);

    let manifest = RunManifest::load(&Workspace::open(&config.workspace_dir).unwrap()).unwrap();
    assert_eq!(manifest.capture_outcome, CaptureOutcome::Truncated);
    assert_eq!(manifest.frames, 3000);
    assert!(manifest.artifact.is_some());
    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test(start_paused = true)]
async fn output_name_selects_artifact_path() {
    let (root, config) = fixture("output-name");
    let launcher = ScriptedLauncher::new(SurfaceScript {
        done_at: Some(3),
        ..SurfaceScript::default()
    });
    let encoder = RecordingEncoder::default();

    let request = RunRequest::new("intro", Some("teaser".to_string()));
    let mut session = RunSession::new(config.clone(), request).unwrap();
    assert_eq!(
        session.artifact_path(),
        config.output_dir.join("framereel-teaser.mp4")
    );
    let report = session.run(&launcher, &encoder).await.unwrap();
    assert_eq!(report.artifact.path, config.output_dir.join("framereel-teaser.mp4"));
    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test(start_paused = true)]
async fn unknown_episode_fails_without_workspace() {
    let (root, config) = fixture("unknown");
    let launcher = ScriptedLauncher::new(SurfaceScript::default());
    let encoder = RecordingEncoder::default();

    let mut session = RunSession::new(config.clone(), RunRequest::new("nope", None)).unwrap();
    let err = session.run(&launcher, &encoder).await.unwrap_err();

    assert!(err.is_precondition());
    assert!(err.to_string().contains("intro"));
    assert_eq!(session.state(), RunState::Failed);
    assert!(!config.workspace_dir.exists());
    assert!(launcher.launched_with.lock().unwrap().is_none());
    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test(start_paused = true)]
async fn launch_failure_is_fatal_and_leaves_no_artifact() {
    let (root, config) = fixture("launch-fail");
    let stale = config.output_dir.join("framereel-intro.mp4");
    std::fs::create_dir_all(&config.output_dir).unwrap();
    std::fs::write(&stale, b"old run").unwrap();

    let launcher = ScriptedLauncher {
        fail: true,
        ..ScriptedLauncher::new(SurfaceScript::default())
    };
    let encoder = RecordingEncoder::default();

    let mut session = RunSession::new(config.clone(), RunRequest::new("intro", None)).unwrap();
    let err = session.run(&launcher, &encoder).await.unwrap_err();

    assert!(matches!(err, FramereelError::Environment { .. }));
    assert_eq!(session.state(), RunState::Failed);
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 0);
    assert!(!stale.exists());
    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test(start_paused = true)]
async fn capture_failure_still_tears_surface_down() {
    let (root, config) = fixture("capture-fail");
    let script = SurfaceScript {
        fail_capture_at: Some(10),
        ..SurfaceScript::default()
    };
    let launcher = ScriptedLauncher::new(script.clone());
    let encoder = RecordingEncoder::default();

    let mut session = RunSession::new(config.clone(), RunRequest::new("intro", None)).unwrap();
    let err = session.run(&launcher, &encoder).await.unwrap_err();

    assert!(matches!(err, FramereelError::Capture { .. }));
    assert_eq!(session.state(), RunState::Failed);
    assert!(script.shut_down.load(Ordering::SeqCst));
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 0);
    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test(start_paused = true)]
async fn encode_failure_is_surfaced_verbatim() {
    let (root, config) = fixture("encode-fail");
    let launcher = ScriptedLauncher::new(SurfaceScript {
        done_at: Some(5),
        ..SurfaceScript::default()
    });
    let encoder = RecordingEncoder {
        fail: true,
        ..RecordingEncoder::default()
    };

    let mut session = RunSession::new(config.clone(), RunRequest::new("intro", None)).unwrap();
    let err = session.run(&launcher, &encoder).await.unwrap_err();

    assert!(err.to_string().contains("Invalid data"));
    assert_eq!(session.state(), RunState::Failed);
    assert!(!config.output_dir.join("framereel-intro.mp4").exists());
    // Frames stay behind for inspection.
    assert_eq!(frame_names(&config.workspace_dir).len(), 5);
    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test(start_paused = true)]
async fn failure_after_encoding_removes_artifact() {
    let (root, config) = fixture("manifest-blocked");
    let launcher = ScriptedLauncher::new(SurfaceScript {
        done_at: Some(6),
        ..SurfaceScript::default()
    });
    let encoder = RecordingEncoder {
        block_manifest: true,
        ..RecordingEncoder::default()
    };

    let mut session = RunSession::new(config.clone(), RunRequest::new("intro", None)).unwrap();
    let err = session.run(&launcher, &encoder).await.unwrap_err();

    assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
    assert!(err.to_string().contains("run.json"));
    assert_eq!(session.state(), RunState::Failed);
    assert!(!config.output_dir.join("framereel-intro.mp4").exists());
    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test(start_paused = true)]
async fn states_advance_in_order() {
    let (root, config) = fixture("states");
    let launcher = ScriptedLauncher::new(SurfaceScript {
        done_at: Some(130),
        ..SurfaceScript::default()
    });
    let encoder = RecordingEncoder::default();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let mut session = RunSession::new(config.clone(), RunRequest::new("intro", None))
        .unwrap()
        .with_observer(Arc::new(move |event: RunEvent| sink.lock().unwrap().push(event)));
    session.run(&launcher, &encoder).await.unwrap();

    let events = events.lock().unwrap();
    let states: Vec<RunState> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::StateChanged(s) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            RunState::Preparing,
            RunState::Rendering,
            RunState::Capturing,
            RunState::Encoding,
            RunState::Done,
        ]
    );

    let progress: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::CaptureProgress(p) => Some(p.frames),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![60, 120]);
    assert!(events
        .iter()
        .any(|e| matches!(e, RunEvent::CaptureFinished(s) if s.frames == 130)));
    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test(start_paused = true)]
async fn session_cannot_be_rerun() {
    let (root, config) = fixture("rerun");
    let launcher = ScriptedLauncher::new(SurfaceScript {
        done_at: Some(2),
        ..SurfaceScript::default()
    });
    let encoder = RecordingEncoder::default();

    let mut session = RunSession::new(config, RunRequest::new("intro", None)).unwrap();
    session.run(&launcher, &encoder).await.unwrap();
    assert!(session.run(&launcher, &encoder).await.is_err());
    assert_eq!(session.state(), RunState::Done);
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn invalid_config_is_rejected_before_running() {
    let config = PipelineConfig {
        fps: 0,
        ..PipelineConfig::default()
    };
    let err = RunSession::new(config, RunRequest::new("intro", None))
        .err()
        .expect("config must be rejected");
    assert!(err.is_precondition());
}

#[test]
fn output_name_with_path_components_is_rejected() {
    let request = RunRequest::new("intro", Some("../escape".to_string()));
    let err = RunSession::new(PipelineConfig::default(), request)
        .err()
        .expect("output name must be rejected");
    assert!(err.is_precondition());
}
