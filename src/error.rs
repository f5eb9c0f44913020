//! Error types for Pitwall.

use serde::Serialize;
use thiserror::Error;

/// The outbound collaborator a provider failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Embedding,
    VectorStore,
    Generation,
    LiveData,
    Source,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Embedding => "embedding",
            Stage::VectorStore => "vector_store",
            Stage::Generation => "generation",
            Stage::LiveData => "live_data",
            Stage::Source => "source",
        };
        f.write_str(name)
    }
}

/// Library-level error type for Pitwall operations.
#[derive(Error, Debug)]
pub enum PitwallError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{stage} provider unavailable: {message}")]
    ProviderUnavailable { stage: Stage, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Disabled: {0}")]
    Disabled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl PitwallError {
    /// Shorthand for a provider failure at `stage`.
    pub fn unavailable(stage: Stage, message: impl Into<String>) -> Self {
        PitwallError::ProviderUnavailable {
            stage,
            message: message.into(),
        }
    }

    /// Stable snake_case kind used in error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            PitwallError::InvalidConfiguration(_) => "invalid_configuration",
            PitwallError::ProviderUnavailable { .. } => "provider_unavailable",
            PitwallError::NotFound(_) => "not_found",
            PitwallError::Disabled(_) => "disabled",
            PitwallError::Io(_)
            | PitwallError::Json(_)
            | PitwallError::TomlParse(_)
            | PitwallError::Database(_) => "internal",
        }
    }

    /// The provider stage, if this is a provider failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PitwallError::ProviderUnavailable { stage, .. } => Some(*stage),
            PitwallError::Database(_) => Some(Stage::VectorStore),
            _ => None,
        }
    }
}

/// Result type alias for Pitwall operations.
pub type Result<T> = std::result::Result<T, PitwallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = PitwallError::unavailable(Stage::Embedding, "timed out");
        assert_eq!(err.kind(), "provider_unavailable");
        assert_eq!(err.stage(), Some(Stage::Embedding));
        assert_eq!(err.to_string(), "embedding provider unavailable: timed out");

        assert_eq!(PitwallError::NotFound("ns".into()).kind(), "not_found");
        assert_eq!(PitwallError::Disabled("x".into()).stage(), None);
    }
}
