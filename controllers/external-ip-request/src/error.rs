//! Binary-specific error types.

use apiserver::ApiError;
use registry::SelectorError;
use thiserror::Error;

/// Errors that can occur while running manifests through the adapter.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Manifest file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest or output YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Label or field selector did not parse
    #[error("Invalid selector: {0}")]
    Selector(#[from] SelectorError),

    /// REST adapter error
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}
