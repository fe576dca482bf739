//! Error types shared across Framereel crates.

/// Top-level error type for Framereel operations.
#[derive(Debug, thiserror::Error)]
pub enum FramereelError {
    #[error("Unknown episode '{name}'. Known episodes: {}", known_list(.known))]
    EpisodeNotFound { name: String, known: Vec<String> },

    #[error("Workspace error: {message}")]
    Workspace { message: String },

    #[error("Rendering environment error: {message}")]
    Environment { message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Probe error: {message}")]
    Probe { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FramereelError.
pub type FramereelResult<T> = Result<T, FramereelError>;

impl FramereelError {
    pub fn episode_not_found(name: impl Into<String>, known: Vec<String>) -> Self {
        Self::EpisodeNotFound {
            name: name.into(),
            known,
        }
    }

    pub fn workspace(msg: impl Into<String>) -> Self {
        Self::Workspace {
            message: msg.into(),
        }
    }

    pub fn environment(msg: impl Into<String>) -> Self {
        Self::Environment {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error was raised before any side effect of a run.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::EpisodeNotFound { .. } | Self::Config { .. })
    }
}

fn known_list(known: &[String]) -> String {
    if known.is_empty() {
        "(none)".to_string()
    } else {
        known.join(", ")
    }
}
