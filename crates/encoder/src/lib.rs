//! Framereel Encoder
//!
//! Turns a captured frame sequence into a single video file and reports
//! what came out.
//!
//! # Pipeline Architecture
//!
//! ```text
//! <workspace>/frame_00000.png ─┐
//! <workspace>/frame_00001.png ─┤
//!            ...               ├── ffmpeg (-framerate FPS) ──► <output_dir>/<prefix><name>.mp4
//! <workspace>/frame_NNNNN.png ─┘                                      │
//!                                                                     ▼
//!                                                        ffprobe ──► duration, size
//! ```

pub mod artifact;
pub mod ffmpeg;

pub use artifact::*;
pub use ffmpeg::*;
