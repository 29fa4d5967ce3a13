//! Error types for the Rebus framework.

use rebus_core::PlatformError;
use thiserror::Error;

/// A single handler definition could not be loaded.
///
/// Discovery logs these and skips the offending definition; they never abort
/// the whole scan.
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    /// The handler constructor failed.
    #[error("failed to construct handler '{origin}': {reason}")]
    Construct {
        /// Where the definition came from.
        origin: String,
        /// Reason for failure.
        reason: String,
    },

    /// An identity pattern could not be compiled.
    #[error("invalid identity pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Reason for failure.
        reason: String,
    },
}

impl DiscoveryError {
    /// Creates a construction error.
    pub fn construct(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Construct {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}

/// Publishing a command set to the platform failed.
#[derive(Debug, Clone, Error)]
pub enum PublishError {
    /// The application-global set could not be replaced.
    #[error("failed to publish global commands: {0}")]
    Global(#[source] PlatformError),

    /// A scope's set could not be replaced.
    #[error("failed to publish commands to scope '{scope_id}': {source}")]
    Scoped {
        /// The scope that failed.
        scope_id: String,
        /// Underlying platform error.
        #[source]
        source: PlatformError,
    },
}

/// A hot-reload was aborted.
#[derive(Debug, Clone, Error)]
pub enum ReloadError {
    /// Another reload is already running.
    #[error("a reload is already in progress")]
    InProgress,

    /// The remote global command set could not be cleared.
    #[error("failed to clear global commands: {0}")]
    ClearGlobal(#[source] PlatformError),

    /// A scope's remote command set could not be cleared.
    #[error("failed to clear commands of scope '{scope_id}': {source}")]
    ClearScope {
        /// The scope that failed.
        scope_id: String,
        /// Underlying platform error.
        #[source]
        source: PlatformError,
    },
}

/// Result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Result type for publish operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Result type for reload operations.
pub type ReloadResult<T> = Result<T, ReloadError>;
