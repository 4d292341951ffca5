//! Registry errors

use thiserror::Error;

/// Errors reported by an ExternalIPRequest registry.
///
/// "Not present" on a get is not an error; registries return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A request with this name already exists in the namespace
    #[error("ExternalIPRequest already exists: {0}")]
    AlreadyExists(String),

    /// The request to update or delete does not exist
    #[error("ExternalIPRequest not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency check failed
    #[error("Conflict on {name}: {message}")]
    Conflict {
        /// Name of the conflicting request
        name: String,
        /// What the store observed
        message: String,
    },

    /// The call could not be served as asked (missing namespace, bad version, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The change stream failed
    #[error("Watch error: {0}")]
    Watch(String),

    /// Backend failure
    #[error("Registry error: {0}")]
    Internal(String),
}
