//! Configuration for the Rebus runtime.
//!
//! Layered TOML plus `REBUS_*` environment loading, and validation of the
//! bot, puzzle and logging sections.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, PROFILE_ENV, profile_name};
pub use schema::{
    BotConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PuzzleConfig, RebusConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
