//! API-level errors

use registry::RegistryError;
use thiserror::Error;

/// Errors surfaced by the REST adapter.
///
/// Registry failures are passed through untouched in [`ApiError::Registry`].
/// A missing object on get is not an error (`Ok(None)`).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The object conflicts with the request (namespace mismatch)
    #[error("{kind} \"{name}\" cannot be handled: {message}")]
    Conflict {
        /// Resource kind, e.g. `externaliprequest`
        kind: &'static str,
        /// Name (or namespace) the conflict was reported against
        name: String,
        /// Human readable cause
        message: String,
    },

    /// Registry error, unchanged
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Object vanished between the write and the read-back
    #[error("{kind} \"{name}\" not found")]
    NotFound {
        /// Resource kind
        kind: &'static str,
        /// Object name
        name: String,
    },

    /// The dispatched operation was aborted before completing
    #[error("operation cancelled")]
    Cancelled,

    /// The dispatched operation panicked
    #[error("operation failed: {0}")]
    TaskFailed(String),
}

impl ApiError {
    /// Builds a conflict error
    pub fn conflict(kind: &'static str, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether this is a [`ApiError::Conflict`]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
