//! Error types for the Canopy tree synchronization engine.

use crate::object::ObjectId;
use thiserror::Error;

/// Errors surfaced by construction and configuration paths.
///
/// Synchronization itself never returns these: resolution problems degrade
/// to "tree unchanged" and are only logged.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("No async runtime available to drive resolutions: {0}")]
    NoRuntime(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid object model: {0}")]
    Fixture(String),

    #[error("Object not found: {0}")]
    UnknownObject(ObjectId),

    #[error("Resolutions did not settle within {0} ms")]
    Timeout(u64),

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a `composition` capability to produce children.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("Composition rejected: {0}")]
    Rejected(String),

    #[error("Composition unavailable for {0}")]
    Unavailable(ObjectId),
}

impl From<config::ConfigError> for TreeError {
    fn from(err: config::ConfigError) -> Self {
        TreeError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for TreeError {
    fn from(err: toml::de::Error) -> Self {
        TreeError::Fixture(err.to_string())
    }
}

impl From<serde_json::Error> for TreeError {
    fn from(err: serde_json::Error) -> Self {
        TreeError::Fixture(err.to_string())
    }
}
