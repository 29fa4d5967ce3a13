//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that stop the runtime from booting.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// No platform token is configured.
    #[error("Missing bot token: set `bot.token` or REBUS_BOT__TOKEN")]
    MissingToken,

    /// The builder was not given a platform to talk to.
    #[error("No platform configured for the runtime")]
    MissingPlatform,

    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
