//! Framereel Capture Engine
//!
//! Drives a headless render surface through an episode's animation,
//! captures one numbered still per tick, and hands the sequence to the
//! encoder once the episode signals completion.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        RunSession                         │
//! │  Preparing ──► Rendering ──► Capturing ──► Encoding ──► Done
//! │      │             │             │             │          │
//! │      ▼             ▼             ▼             ▼          │
//! │  workspace    SurfaceLauncher  capture loop  VideoEncoder │
//! │  (index.html) (Chromium)      (frame_NNNNN)  (ffmpeg)     │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod capture;
pub mod session;
pub mod surface;

pub use capture::*;
pub use session::*;
pub use surface::*;
