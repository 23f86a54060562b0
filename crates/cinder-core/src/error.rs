//! Error types for Cinder

use thiserror::Error;

/// The main error type for Cinder operations
#[derive(Debug, Error)]
pub enum CinderError {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Emitter not found: {0}")]
    EmitterNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),

    #[error("Audio error: {0}")]
    AudioError(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

/// Result type alias for Cinder operations
pub type Result<T> = std::result::Result<T, CinderError>;

impl From<toml::de::Error> for CinderError {
    fn from(err: toml::de::Error) -> Self {
        CinderError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for CinderError {
    fn from(err: toml::ser::Error) -> Self {
        CinderError::TomlSerError(err.to_string())
    }
}
