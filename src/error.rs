//! Error types shared by every layer of the recommender

/// Everything that can go wrong between loading a roster and answering a request.
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("Cannot fit an encoder on an empty roster")]
    EmptyRoster,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Artifact unavailable at '{path}': {message}")]
    ArtifactUnavailable { path: String, message: String },

    #[error("Invalid roster row {row}: {message}")]
    InvalidRoster { row: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RecommendError {
    /// Stable machine-readable name, used as the `error` field of HTTP failures.
    pub fn kind(&self) -> &'static str {
        match self {
            RecommendError::EmptyRoster => "empty_roster",
            RecommendError::InvalidInput(_) => "invalid_input",
            RecommendError::ArtifactUnavailable { .. } => "artifact_unavailable",
            RecommendError::InvalidRoster { .. } => "invalid_roster",
            RecommendError::Config(_) => "config",
        }
    }

    pub(crate) fn unavailable(path: impl AsRef<std::path::Path>, message: impl std::fmt::Display) -> Self {
        RecommendError::ArtifactUnavailable {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecommendError>;
