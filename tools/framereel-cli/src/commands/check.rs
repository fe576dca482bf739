//! Check system capabilities.

use framereel_capture_engine::browser::detect_browser;
use framereel_common::config::{config_file_path, PipelineConfig};
use framereel_encoder::FfmpegEncoder;
use framereel_workspace::{CaptureOutcome, EpisodeCatalog, RunManifest};

pub fn run(config: &PipelineConfig) -> anyhow::Result<()> {
    println!("Framereel System Check");
    println!("{}", "=".repeat(50));

    let encoder = FfmpegEncoder::new();
    let ffmpeg_ok = framereel_encoder::VideoEncoder::is_available(&encoder);
    let ffprobe_ok = encoder.probe_available();
    report(ffmpeg_ok, "ffmpeg", "in PATH");
    report(ffprobe_ok, "ffprobe", "in PATH");

    let browser = config.browser.clone().or_else(detect_browser);
    let browser_ok = match &browser {
        Some(path) => {
            println!("[OK] Browser: {}", path.display());
            true
        }
        None => {
            println!("[MISSING] Browser: no Chromium-family executable found");
            false
        }
    };

    let template_ok = config.template_path.is_file();
    report(
        template_ok,
        "Template",
        &config.template_path.display().to_string(),
    );

    let episodes = EpisodeCatalog::new(&config.episodes_dir).list();
    println!(
        "[{}] Episodes: {} in {}",
        if episodes.is_empty() { "WARN" } else { "OK" },
        episodes.len(),
        config.episodes_dir.display()
    );

    let config_path = config_file_path();
    println!(
        "     Config: {} ({})",
        config_path.display(),
        if config_path.exists() { "found" } else { "defaults" }
    );
    println!(
        "     Encoding: {} {} crf {} {} at {} fps, {}x{}",
        encoder.settings().codec,
        encoder.settings().preset,
        encoder.settings().crf,
        encoder.settings().pixel_format,
        config.fps,
        config.size,
        config.size
    );

    match RunManifest::last_run(&config.workspace_dir) {
        Ok(Some(last)) => {
            let outcome = match last.capture_outcome {
                CaptureOutcome::Completed => "completed",
                CaptureOutcome::Truncated => "truncated",
            };
            let artifact = last
                .artifact
                .map(|a| a.path.display().to_string())
                .unwrap_or_else(|| "no artifact".to_string());
            println!(
                "     Last run: {} at {}, {} frames ({outcome}), {artifact}",
                last.episode, last.started_at, last.frames
            );
        }
        Ok(None) => println!("     Last run: none"),
        Err(e) => println!("[WARN] Last run: unreadable manifest ({e})"),
    }

    println!();
    if ffmpeg_ok && ffprobe_ok && browser_ok && template_ok {
        println!("All required tools are available. Framereel is ready.");
    } else {
        println!("Some required tools are missing. See above.");
    }
    Ok(())
}

fn report(ok: bool, what: &str, detail: &str) {
    if ok {
        println!("[OK] {what}: {detail}");
    } else {
        println!("[MISSING] {what}: {detail}");
    }
}
