//! Error types for pkgjson

use thiserror::Error;

/// Result type alias for pkgjson operations
pub type Result<T> = std::result::Result<T, PkgJsonError>;

/// Main error type for pkgjson
///
/// Remote and data problems are not represented here: those degrade to a
/// logged skip. These variants cover what actually stops a run.
#[derive(Error, Debug)]
pub enum PkgJsonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Run failed: {0}")]
    RunFailed(String),
}

impl PkgJsonError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a run failure
    pub fn run_failed(msg: impl Into<String>) -> Self {
        Self::RunFailed(msg.into())
    }
}
