//! Unified error types for the Rebus core.
//!
//! Errors raised by the platform seam live here together with the error type
//! handlers return. Registry, publish and reload errors are defined in
//! `rebus-framework`.

use thiserror::Error;

// =============================================================================
// Platform Errors
// =============================================================================

/// Errors reported by a [`Platform`](crate::Platform) implementation.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// A remote request failed.
    #[error("platform request '{operation}' failed: {reason}")]
    Request {
        /// The operation that was attempted (e.g. `"replace_remote_commands"`).
        operation: &'static str,
        /// Reason for failure.
        reason: String,
    },

    /// The requested scope (guild) could not be fetched.
    #[error("scope '{0}' not found")]
    ScopeNotFound(String),

    /// The interaction has already been acknowledged.
    #[error("interaction '{0}' already acknowledged")]
    AlreadyAcknowledged(String),

    /// The platform connection is not available.
    #[error("platform not connected")]
    NotConnected,
}

impl PlatformError {
    /// Creates a request error for the given operation.
    pub fn request(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Request {
            operation,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Handler Errors
// =============================================================================

/// Errors returned by command and component handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A required option was not present on the interaction.
    #[error("missing required option '{0}'")]
    MissingOption(String),

    /// The handler does not implement the requested capability.
    #[error("handler does not support {0}")]
    Unsupported(&'static str),

    /// A shared service the handler needs was not provided to the runtime.
    #[error("service '{0}' is not available")]
    ServiceNotFound(&'static str),

    /// A platform call made by the handler failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Custom handler error.
    #[error("{0}")]
    Custom(String),

    /// Error raised by an external collaborator (persistence, generator, ...).
    #[error(transparent)]
    External(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Creates a custom handler error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Result type for handler operations.
pub type HandlerResult<T> = Result<T, HandlerError>;
