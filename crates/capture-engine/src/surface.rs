//! Render surface contracts.
//!
//! The capture loop only needs two things from a rendering environment:
//! the current title text and a still image of the viewport. Keeping that
//! behind a trait lets the loop and the run session be driven by scripted
//! surfaces in tests.

use std::path::Path;
use std::time::Duration;

use framereel_common::error::FramereelResult;

/// A live, loaded rendering environment.
#[async_trait::async_trait]
pub trait RenderSurface: Send {
    /// Current title text. A missing title reads as the empty string.
    async fn title(&mut self) -> FramereelResult<String>;

    /// PNG still of the full viewport.
    async fn capture_png(&mut self) -> FramereelResult<Vec<u8>>;

    /// Tear the environment down. The surface is not used afterwards.
    async fn shutdown(&mut self) -> FramereelResult<()>;
}

/// Launches rendering environments.
#[async_trait::async_trait]
pub trait SurfaceLauncher: Send + Sync {
    /// Start an environment with a `size`×`size` viewport, load `document`
    /// from the local filesystem, and wait `settle` before returning.
    async fn launch(
        &self,
        document: &Path,
        size: u32,
        settle: Duration,
    ) -> FramereelResult<Box<dyn RenderSurface>>;

    /// Launcher name, for logs.
    fn name(&self) -> &str;
}
