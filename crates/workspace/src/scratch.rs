//! The scratch workspace: composed document plus the captured frames.
//!
//! The workspace lives at a single tool-owned path. It is destroyed and
//! recreated at the start of every run and deliberately left in place after
//! the run so the frames can be inspected.

use std::path::{Path, PathBuf};

use framereel_common::error::{FramereelError, FramereelResult};

/// File name of the composed render document.
pub const DOCUMENT_FILE: &str = "index.html";

/// Input pattern handed to the encoder. Must agree with [`frame_file_name`].
pub const FRAME_PATTERN: &str = "frame_%05d.png";

const FRAME_PREFIX: &str = "frame_";
const FRAME_SUFFIX: &str = ".png";

/// Zero-padded file name of the frame captured on tick `index`.
pub fn frame_file_name(index: u32) -> String {
    format!("{FRAME_PREFIX}{index:05}{FRAME_SUFFIX}")
}

/// Inverse of [`frame_file_name`]; `None` for anything that is not a frame.
pub fn parse_frame_index(file_name: &str) -> Option<u32> {
    let digits = file_name
        .strip_prefix(FRAME_PREFIX)?
        .strip_suffix(FRAME_SUFFIX)?;
    if digits.len() < 5 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// A prepared scratch directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Destroy `root` if it exists, recreate it empty, and write the
    /// composed document into it.
    pub fn prepare(root: impl AsRef<Path>, document: &str) -> FramereelResult<Self> {
        let root = root.as_ref().to_path_buf();

        if root.exists() {
            tracing::debug!(path = %root.display(), "Removing previous workspace");
            std::fs::remove_dir_all(&root).map_err(|e| {
                FramereelError::workspace(format!(
                    "Failed to remove previous workspace {}: {e}",
                    root.display()
                ))
            })?;
        }
        std::fs::create_dir_all(&root).map_err(|e| {
            FramereelError::workspace(format!(
                "Failed to create workspace {}: {e}",
                root.display()
            ))
        })?;

        let workspace = Self { root };
        std::fs::write(workspace.document_path(), document).map_err(|e| {
            FramereelError::workspace(format!("Failed to write render document: {e}"))
        })?;
        Ok(workspace)
    }

    /// Open an existing workspace without touching its contents.
    pub fn open(root: impl AsRef<Path>) -> FramereelResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(FramereelError::workspace(format!(
                "Workspace {} does not exist",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self) -> PathBuf {
        self.root.join(DOCUMENT_FILE)
    }

    pub fn frame_path(&self, index: u32) -> PathBuf {
        self.root.join(frame_file_name(index))
    }

    /// Encoder input pattern for this workspace.
    pub fn frame_pattern(&self) -> PathBuf {
        self.root.join(FRAME_PATTERN)
    }

    /// Indices of the frames currently on disk, ascending.
    pub fn frame_indices(&self) -> FramereelResult<Vec<u32>> {
        let mut indices: Vec<u32> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().and_then(parse_frame_index))
            .collect();
        indices.sort_unstable();
        Ok(indices)
    }

    /// Frame paths currently on disk, in index order.
    pub fn frames(&self) -> FramereelResult<Vec<PathBuf>> {
        Ok(self
            .frame_indices()?
            .into_iter()
            .map(|index| self.frame_path(index))
            .collect())
    }

    /// Check that the frames on disk are exactly `0..expected`.
    pub fn verify_sequence(&self, expected: u32) -> FramereelResult<()> {
        let indices = self.frame_indices()?;
        for (position, index) in indices.iter().enumerate() {
            let position = position as u32;
            if *index != position {
                return Err(FramereelError::workspace(format!(
                    "Frame sequence has a gap: expected {} but found {}",
                    frame_file_name(position),
                    frame_file_name(*index)
                )));
            }
        }
        if indices.len() as u32 != expected {
            return Err(FramereelError::workspace(format!(
                "Expected {expected} frames in {}, found {}",
                self.root.display(),
                indices.len()
            )));
        }
        Ok(())
    }
}
