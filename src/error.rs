//! Error types for Laer.

use thiserror::Error;

/// Library-level error type for Laer operations.
#[derive(Error, Debug)]
pub enum LaerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    #[error("Artifact channel error: {0}")]
    Artifact(String),

    #[error("Artifact store error: {0}")]
    ArtifactStore(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Weather lookup failed: {0}")]
    Weather(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Laer operations.
pub type Result<T> = std::result::Result<T, LaerError>;
