//! Error types for hibernation passes.
//!
//! Waiting is never an error: a pass that cannot make progress yet returns
//! [`HibernationOutcome::Waiting`](crate::control::phase::HibernationOutcome).
//! Everything in [`HibernationError`] is fatal for the current pass and is
//! handed back to the caller, which retries by scheduling another pass.

use thiserror::Error;

/// Errors reported by the object API when acting on a single object.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ObjectError {
    /// The object does not exist (already deleted or never created).
    #[error("{name} not found")]
    NotFound { name: String },

    /// Any other API failure.
    #[error("api error: {message}")]
    Api { message: String },
}

impl ObjectError {
    /// Create a NotFound error for the named object.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create an Api error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Check if this error means the object is already gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Fatal conditions for a single hibernation pass.
#[derive(Debug, Error)]
pub enum HibernationError {
    /// The stop probe could not determine instance state.
    #[error("cannot observe instance state: {message}")]
    Observation { message: String },

    /// Deleting an instance failed for a reason other than NotFound.
    #[error("cannot delete instance {instance} for cluster hibernation: {source}")]
    DeleteFailed {
        instance: String,
        #[source]
        source: ObjectError,
    },

    /// A snapshot could not be loaded or is inconsistent.
    #[error("invalid snapshot: {message}")]
    InvalidSnapshot { message: String },
}

impl HibernationError {
    /// Create an Observation error.
    pub fn observation(message: impl Into<String>) -> Self {
        Self::Observation {
            message: message.into(),
        }
    }

    /// Create a DeleteFailed error for the named instance.
    pub fn delete_failed(instance: impl Into<String>, source: ObjectError) -> Self {
        Self::DeleteFailed {
            instance: instance.into(),
            source,
        }
    }

    /// Create an InvalidSnapshot error.
    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            message: message.into(),
        }
    }

    /// Name of the instance this error is about, if any.
    pub fn instance(&self) -> Option<&str> {
        match self {
            Self::DeleteFailed { instance, .. } => Some(instance),
            _ => None,
        }
    }
}

/// Result type using HibernationError.
pub type HibernationResult<T> = Result<T, HibernationError>;
