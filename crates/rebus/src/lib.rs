//! # Rebus
//!
//! A daily emoji-puzzle bot built on a hot-reloadable interaction dispatch
//! core.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐     ┌────────────┐     ┌──────────────────────────┐
//! │ Platform │────▶│ Dispatcher │────▶│ /puzzle, hint: (linked)  │──▶ PuzzleStore
//! │ (stdio)  │◀────│            │────▶│ /setup (scoped, config)  │──▶ PuzzleStore
//! └──────────┘     └────────────┘     └──────────────────────────┘
//!       ▲                 ▲
//!       └── Publisher ────┴── ReloadCoordinator
//! ```
//!
//! - **Core** (`rebus-core`): interactions, replies, command schema and the
//!   platform seam
//! - **Framework** (`rebus-framework`): handler registry, dispatcher,
//!   publisher and hot reload
//! - **Runtime** (`rebus-runtime`): configuration, logging and lifecycle
//! - **Puzzle** ([`puzzle`]): the game handlers and their store
//! - **Stdio** ([`stdio`]): a JSON-lines platform for running without a chat
//!   protocol
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rebus::prelude::*;
//!
//! let store: Arc<dyn PuzzleStore> = Arc::new(InMemoryPuzzleStore::new());
//! let (platform, _output) = StdioPlatform::new();
//!
//! let rebus = Rebus::builder()
//!     .platform(Arc::new(platform))
//!     .service::<dyn PuzzleStore>(store)
//!     .build()?;
//! rebus.run().await;
//! ```
//!
//! ## Features
//!
//! - `toml-config`: Load `rebus.toml` files (default)
//! - `json-log`: Enable the JSON log format

pub use rebus_core as core;
pub use rebus_framework as framework;
pub use rebus_runtime as runtime;

pub mod puzzle;
pub mod stdio;

/// Prelude module for convenient imports.
pub mod prelude {
    // Runtime - main entry point
    pub use rebus_runtime::{PuzzleConfig, Rebus, RebusConfig, shutdown_signal};

    // Handlers and discovery
    pub use rebus_framework::{
        CommandHandler, ComponentHandler, HandlerContext, IdentitySpec, LinkedSource, SourceSet,
        TableSource, command, component, register_command, register_component,
    };

    // Interaction model and replies
    pub use rebus_core::{
        CommandSpec, Embed, HandlerError, HandlerReply, HandlerResult, Interaction, OptionSpec,
        Platform, reply, reply_embed,
    };

    // Puzzle game
    pub use crate::puzzle::{InMemoryPuzzleStore, PuzzleStore, setup_source};
    pub use crate::stdio::StdioPlatform;
}
