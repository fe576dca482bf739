//! Encoder backends and the ffmpeg/ffprobe implementation.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use framereel_common::error::{FramereelError, FramereelResult};

/// An encode request over a captured frame sequence.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    /// Zero-padded input pattern, e.g. `<workspace>/frame_%05d.png`.
    pub input_pattern: PathBuf,

    /// Number of frames in the sequence (indices `0..frame_count`).
    pub frame_count: u32,

    /// Declared frame rate of the sequence.
    pub fps: u32,

    /// Output file path.
    pub output_path: PathBuf,
}

impl EncodeJob {
    /// Duration the encoded video should have, defined by frame count alone.
    pub fn expected_duration_secs(&self) -> f64 {
        if self.fps == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.fps as f64
    }
}

/// Progress callback for encoding.
pub type EncodeProgressCallback = Box<dyn Fn(EncodeProgress) + Send>;

/// Encode progress report.
#[derive(Debug, Clone)]
pub struct EncodeProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames encoded so far.
    pub frames_encoded: u64,

    /// Total frames to encode.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: EncodeStage,
}

/// Stages of an encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStage {
    Encoding,
    Finalizing,
    Complete,
}

/// Trait for encoder backends.
pub trait VideoEncoder: Send {
    /// Encode the job's frame sequence into `job.output_path`.
    fn encode(&self, job: &EncodeJob, progress: Option<EncodeProgressCallback>)
        -> FramereelResult<()>;

    /// Read back the duration of an encoded file, in seconds.
    fn probe_duration(&self, path: &Path) -> FramereelResult<f64>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Fixed encoding parameters. Not configurable per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    pub codec: &'static str,
    pub preset: &'static str,
    pub crf: u8,
    pub pixel_format: &'static str,
    pub extension: &'static str,
}

/// H.264 in MP4, 4:2:0, tuned for sharp flat-colour animation.
pub const DEFAULT_SETTINGS: EncodeSettings = EncodeSettings {
    codec: "libx264",
    preset: "medium",
    crf: 18,
    pixel_format: "yuv420p",
    extension: "mp4",
};

impl Default for EncodeSettings {
    fn default() -> Self {
        DEFAULT_SETTINGS
    }
}

impl EncodeSettings {
    fn codec_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.to_string(),
            "-preset".to_string(),
            self.preset.to_string(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]
    }
}

/// Encoder that shells out to `ffmpeg` and `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: String,
    ffprobe: String,
    settings: EncodeSettings,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    /// Use `ffmpeg` and `ffprobe` from `PATH`.
    pub fn new() -> Self {
        Self::with_binaries("ffmpeg", "ffprobe")
    }

    pub fn with_binaries(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            settings: EncodeSettings::default(),
        }
    }

    pub fn settings(&self) -> &EncodeSettings {
        &self.settings
    }

    /// Whether `ffprobe` can be run.
    pub fn probe_available(&self) -> bool {
        command_exists(&self.ffprobe)
    }

    /// Full ffmpeg argument list for `job`.
    pub fn build_args(&self, job: &EncodeJob) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-framerate".to_string(),
            job.fps.to_string(),
            "-start_number".to_string(),
            "0".to_string(),
            "-i".to_string(),
            job.input_pattern.to_string_lossy().into_owned(),
            "-frames:v".to_string(),
            job.frame_count.to_string(),
        ];
        args.extend(self.settings.codec_args());
        args.extend([
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
            job.output_path.to_string_lossy().into_owned(),
        ]);
        args
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn encode(
        &self,
        job: &EncodeJob,
        progress: Option<EncodeProgressCallback>,
    ) -> FramereelResult<()> {
        let args = self.build_args(job);
        tracing::debug!(?args, "Running ffmpeg");
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = std::time::Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| FramereelError::encode(format!("Failed to start {}: {e}", self.ffmpeg)))?;

        tracing::info!(
            pid = child.id(),
            frames = job.frame_count,
            fps = job.fps,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FramereelError::encode("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FramereelError::encode("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut state = ProgressState::default();
        loop {
            line.clear();
            let bytes = reader.read_line(&mut line).map_err(|e| {
                FramereelError::encode(format!("Failed reading ffmpeg progress: {e}"))
            })?;
            if bytes == 0 {
                break;
            }

            if let Some((key, value)) = line.trim().split_once('=') {
                state.update(key, value);
                if key == "progress" {
                    if let Some(cb) = &progress {
                        cb(progress_report(
                            &state,
                            job.frame_count as u64,
                            start.elapsed().as_secs_f64(),
                        ));
                    }
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| FramereelError::encode(format!("Failed to wait on ffmpeg: {e}")))?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(FramereelError::encode(format!(
                "ffmpeg failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        if let Some(cb) = &progress {
            cb(EncodeProgress {
                progress: 1.0,
                frames_encoded: job.frame_count as u64,
                total_frames: job.frame_count as u64,
                eta_secs: 0.0,
                stage: EncodeStage::Complete,
            });
        }

        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            output = %job.output_path.display(),
            "ffmpeg finished"
        );
        Ok(())
    }

    fn probe_duration(&self, path: &Path) -> FramereelResult<f64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| FramereelError::probe(format!("Failed to start {}: {e}", self.ffprobe)))?;

        if !output.status.success() {
            return Err(FramereelError::probe(format!(
                "ffprobe failed (status {}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }

    fn is_available(&self) -> bool {
        command_exists(&self.ffmpeg)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Parse ffprobe's bare `format=duration` output.
pub fn parse_duration(raw: &str) -> FramereelResult<f64> {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| FramereelError::probe("ffprobe reported no duration"))?;
    let secs: f64 = line
        .parse()
        .map_err(|_| FramereelError::probe(format!("Unparsable duration from ffprobe: {line:?}")))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(FramereelError::probe(format!(
            "Invalid duration from ffprobe: {secs}"
        )));
    }
    Ok(secs)
}

/// Whether `binary` resolves to something runnable.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg("command -v \"$1\" >/dev/null 2>&1")
        .arg("sh")
        .arg(binary)
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    frame: u64,
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            "frame" => {
                if let Ok(frame) = value.trim().parse::<u64>() {
                    self.frame = frame;
                }
            }
            // ffmpeg reports microseconds under both keys.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.trim().parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value.trim() == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(state: &ProgressState, total_frames: u64, elapsed_secs: f64) -> EncodeProgress {
    let progress = if total_frames == 0 {
        0.0
    } else {
        (state.frame as f64 / total_frames as f64).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    EncodeProgress {
        progress: if state.complete { 1.0 } else { progress },
        frames_encoded: state.frame.min(total_frames),
        total_frames,
        eta_secs,
        stage: if state.complete {
            EncodeStage::Finalizing
        } else {
            EncodeStage::Encoding
        },
    }
}
