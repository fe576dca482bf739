//! Framereel Workspace Preparer
//!
//! Turns a run request into a ready-to-render scratch directory:
//! - **Catalog:** resolves an episode identifier to its render-logic unit
//! - **Compose:** splices the unit into the shared render-surface template
//! - **Scratch:** recreates the fixed workspace and names captured frames
//! - **Manifest:** records what a run did, next to its frames
//!
//! ```text
//! episodes/<name>.js ──┐
//!                      ├── compose ──► <workspace>/index.html
//! render/template.html ┘
//!                          capture ──► <workspace>/frame_00000.png ...
//!                                      <workspace>/run.json
//! ```

pub mod catalog;
pub mod compose;
pub mod manifest;
pub mod scratch;

pub use catalog::*;
pub use compose::*;
pub use manifest::*;
pub use scratch::*;

use framereel_common::config::PipelineConfig;
use framereel_common::error::{FramereelError, FramereelResult};

/// Resolve the request's episode, compose its document, and recreate the
/// scratch workspace.
///
/// Every precondition (episode exists, template and logic readable, marker
/// present) is checked before the workspace is touched.
pub fn prepare_run(config: &PipelineConfig, request: &RunRequest) -> FramereelResult<Workspace> {
    let catalog = EpisodeCatalog::new(&config.episodes_dir);
    let logic_path = catalog.resolve(&request.episode)?;

    let template = std::fs::read_to_string(&config.template_path).map_err(|e| {
        FramereelError::workspace(format!(
            "Failed to read template {}: {e}",
            config.template_path.display()
        ))
    })?;
    let logic = std::fs::read_to_string(&logic_path).map_err(|e| {
        FramereelError::workspace(format!(
            "Failed to read episode {}: {e}",
            logic_path.display()
        ))
    })?;

    let document = compose_document(&template, &config.template_marker, &logic)?;

    tracing::info!(
        episode = %request.episode,
        logic = %logic_path.display(),
        workspace = %config.workspace_dir.display(),
        "Preparing workspace"
    );
    Workspace::prepare(&config.workspace_dir, &document)
}
