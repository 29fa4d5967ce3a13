//! Rebus Runtime - boot and lifecycle for the Rebus puzzle bot.
//!
//! This crate provides:
//! - The [`Rebus`] runtime, which owns the handler registry, publisher,
//!   dispatcher and reload coordinator
//! - Layered configuration (`rebus.toml`, profiles, `REBUS_*` variables)
//! - Logging setup from the `[logging]` section
//! - Graceful shutdown with ordered cleanup hooks
//!
//! ```ignore
//! use rebus_runtime::Rebus;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let rebus = Rebus::builder()
//!         .profile("production")
//!         .platform(platform)
//!         .build()?;
//!
//!     // Discovers handlers, publishes them and runs until Ctrl+C
//!     rebus.run().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, PuzzleConfig, RebusConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::init_from_config;
pub use runtime::{Rebus, RebusBuilder, shutdown_signal};

// Re-export tracing for use by other crates
pub use tracing;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
