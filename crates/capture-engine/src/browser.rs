//! Headless Chromium render surface over the DevTools protocol.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use framereel_common::error::{FramereelError, FramereelResult};

use crate::surface::{RenderSurface, SurfaceLauncher};

/// Executables tried, in order, when no browser is configured.
const BROWSER_CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

/// Find a Chromium-family executable in `PATH`.
pub fn detect_browser() -> Option<PathBuf> {
    BROWSER_CANDIDATES
        .iter()
        .find(|candidate| framereel_encoder::command_exists(candidate))
        .map(PathBuf::from)
}

/// Launches headless Chromium.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    executable: Option<PathBuf>,
}

impl ChromeLauncher {
    /// `executable` overrides browser autodetection.
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }

    fn browser_config(&self, size: u32) -> FramereelResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(size, size)
            .viewport(Viewport {
                width: size,
                height: size,
                device_scale_factor: Some(1.0),
                ..Viewport::default()
            })
            .arg("--hide-scrollbars")
            .arg("--mute-audio")
            .arg("--allow-file-access-from-files");

        if let Some(executable) = self.executable.clone().or_else(detect_browser) {
            builder = builder.chrome_executable(executable);
        }
        // Chromium refuses to start its sandbox as root (containers, CI).
        if running_as_root() {
            builder = builder.arg("--no-sandbox");
        }

        builder
            .build()
            .map_err(|e| FramereelError::environment(format!("Invalid browser config: {e}")))
    }
}

#[async_trait::async_trait]
impl SurfaceLauncher for ChromeLauncher {
    async fn launch(
        &self,
        document: &Path,
        size: u32,
        settle: Duration,
    ) -> FramereelResult<Box<dyn RenderSurface>> {
        let document = document.canonicalize().map_err(|e| {
            FramereelError::environment(format!(
                "Render document {} is not accessible: {e}",
                document.display()
            ))
        })?;
        let url = format!("file://{}", document.display());

        let config = self.browser_config(size)?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FramereelError::environment(format!("Failed to launch browser: {e}")))?;

        // The stream ends when the connection closes; individual errors are
        // usually unrecognized protocol events and must not stop the page.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!(error = %e, "DevTools handler error");
                }
            }
        });

        tracing::info!(%url, size, "Browser launched; loading document");

        let page = match load_page(&browser, &url).await {
            Ok(page) => page,
            Err(err) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                return Err(err);
            }
        };

        tracing::debug!(settle_ms = settle.as_millis() as u64, "Waiting for first paint");
        tokio::time::sleep(settle).await;

        Ok(Box::new(ChromeSurface {
            browser,
            page,
            handler_task: Some(handler_task),
        }))
    }

    fn name(&self) -> &str {
        "chromium"
    }
}

async fn load_page(browser: &Browser, url: &str) -> FramereelResult<Page> {
    let page = browser
        .new_page(url)
        .await
        .map_err(|e| FramereelError::environment(format!("Failed to open {url}: {e}")))?;
    page.wait_for_navigation()
        .await
        .map_err(|e| FramereelError::environment(format!("Failed to load {url}: {e}")))?;
    Ok(page)
}

/// A loaded page in a headless Chromium instance.
pub struct ChromeSurface {
    browser: Browser,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
}

#[async_trait::async_trait]
impl RenderSurface for ChromeSurface {
    async fn title(&mut self) -> FramereelResult<String> {
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| FramereelError::environment(format!("Failed to read page title: {e}")))?;
        Ok(title.unwrap_or_default())
    }

    async fn capture_png(&mut self) -> FramereelResult<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| FramereelError::capture(format!("Screenshot failed: {e}")))
    }

    async fn shutdown(&mut self) -> FramereelResult<()> {
        let Some(handler_task) = self.handler_task.take() else {
            return Ok(());
        };

        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            tracing::warn!(error = %e, "Browser process did not exit cleanly");
        }
        if let Err(e) = handler_task.await {
            tracing::warn!(error = %e, "DevTools handler task join failed");
        }
        closed
            .map(|_| ())
            .map_err(|e| FramereelError::environment(format!("Failed to close browser: {e}")))?;

        tracing::info!("Browser torn down");
        Ok(())
    }
}

#[cfg(unix)]
fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}
