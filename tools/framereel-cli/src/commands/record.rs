//! Capture an episode and encode it.

use std::sync::Arc;

use framereel_capture_engine::browser::ChromeLauncher;
use framereel_capture_engine::{RunEvent, RunSession, RunState};
use framereel_common::config::PipelineConfig;
use framereel_encoder::{EncodeStage, FfmpegEncoder};
use framereel_workspace::{CaptureOutcome, RunRequest};

pub async fn run(
    config: PipelineConfig,
    episode: String,
    output: Option<String>,
) -> anyhow::Result<()> {
    let launcher = ChromeLauncher::new(config.browser.clone());
    let encoder = FfmpegEncoder::new();

    println!("Recording episode: {episode}");
    println!("  FPS: {}", config.fps);
    println!("  Size: {}x{}", config.size, config.size);
    println!("  Max frames: {}", config.max_frames);
    println!("  Workspace: {}", config.workspace_dir.display());

    let request = RunRequest::new(episode, output);
    let mut session = RunSession::new(config, request)?.with_observer(Arc::new(print_event));
    println!(
        "  Output: {} -> {}",
        session.request().output_name,
        session.artifact_path().display()
    );
    println!();

    let report = session.run(&launcher, &encoder).await?;

    println!();
    println!("Video saved to: {}", report.artifact.summary());
    println!("Frames kept in: {}", report.workspace.display());
    Ok(())
}

fn print_event(event: RunEvent) {
    match event {
        RunEvent::StateChanged(RunState::Rendering) => println!("Loading render document..."),
        RunEvent::StateChanged(RunState::Capturing) => println!("Capturing frames..."),
        RunEvent::StateChanged(RunState::Encoding) => println!("Encoding..."),
        RunEvent::StateChanged(_) => {}
        RunEvent::CaptureProgress(p) => {
            println!("  Captured {} frames ({:.1}s)", p.frames, p.elapsed_secs)
        }
        RunEvent::CaptureFinished(summary) => match summary.outcome {
            CaptureOutcome::Completed => println!(
                "Animation finished: {} frames in {:.1}s",
                summary.frames, summary.elapsed_secs
            ),
            CaptureOutcome::Truncated => println!(
                "Stopped at the frame limit ({} frames) without seeing the end of the animation",
                summary.frames
            ),
        },
        RunEvent::EncodeProgress(p) if p.stage == EncodeStage::Complete => {
            println!("  Encoded {} frames", p.frames_encoded)
        }
        RunEvent::EncodeProgress(_) => {}
    }
}
