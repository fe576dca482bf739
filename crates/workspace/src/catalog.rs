//! Episode lookup.
//!
//! An episode is a render-logic unit stored as `<episodes_dir>/<name>.js`.
//! The set of valid identifiers is whatever the directory holds at the
//! moment of the lookup.

use std::path::{Path, PathBuf};

use framereel_common::error::{FramereelError, FramereelResult};

/// File extension of render-logic units.
pub const EPISODE_EXTENSION: &str = "js";

/// What to record and what to call the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Episode identifier.
    pub episode: String,

    /// Artifact name; defaults to the episode identifier.
    pub output_name: String,
}

impl RunRequest {
    pub fn new(episode: impl Into<String>, output_name: Option<String>) -> Self {
        let episode = episode.into();
        let output_name = output_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| episode.clone());
        Self {
            episode,
            output_name,
        }
    }

    /// The output name becomes a file name in the output directory, so it
    /// must not contain path components.
    pub fn check_output_name(&self) -> FramereelResult<()> {
        if is_plain_identifier(&self.output_name) {
            Ok(())
        } else {
            Err(FramereelError::config(format!(
                "Output name '{}' must be a plain file name",
                self.output_name
            )))
        }
    }
}

/// Directory of render-logic units.
#[derive(Debug, Clone)]
pub struct EpisodeCatalog {
    dir: PathBuf,
}

impl EpisodeCatalog {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sorted identifiers of every unit in the directory.
    ///
    /// A missing or unreadable directory yields an empty list; the caller
    /// reports that as "no known episodes".
    pub fn list(&self) -> Vec<String> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %self.dir.display(), error = %e, "Episode directory not readable");
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .map(|ext| ext == EPISODE_EXTENSION)
                    .unwrap_or(false)
            })
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        names
    }

    /// Path of the named unit, or `EpisodeNotFound` listing the known ones.
    pub fn resolve(&self, name: &str) -> FramereelResult<PathBuf> {
        if is_plain_identifier(name) {
            let path = self.dir.join(format!("{name}.{EPISODE_EXTENSION}"));
            if path.is_file() {
                return Ok(path);
            }
        }
        Err(FramereelError::episode_not_found(name, self.list()))
    }
}

/// Identifiers name a file inside the catalog, never a path out of it.
fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}
