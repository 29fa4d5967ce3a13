//! # Rebus Framework
//!
//! Handler registry, component identity matching, interaction dispatch,
//! remote publishing and hot reload.
//!
//! This layer provides:
//! - [`CommandHandler`] / [`ComponentHandler`] traits plus closure-backed
//!   builders ([`command`], [`component`])
//! - Link-time handler registration ([`register_command!`],
//!   [`register_component!`]) and swappable sources ([`TableSource`])
//! - The [`HandlerRegistry`] with global and per-scope partitions
//! - The [`InteractionDispatcher`], also usable as a `tower::Service`
//! - The [`Publisher`] and the [`ReloadCoordinator`]
//! - A type-keyed [`Services`] map for state shared with handlers

pub mod context;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod matcher;
pub mod publisher;
pub mod registry;
pub mod reload;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use linkme;

pub use context::HandlerContext;
pub use discovery::{
    CommandDefinition, ComponentDefinition, HandlerDefinition, HandlerSource, LinkedSource,
    SourceSet, TableSource,
};
pub use dispatcher::{DispatchOutcome, InteractionDispatcher};
pub use error::{
    DiscoveryError, DiscoveryResult, PublishError, PublishResult, ReloadError, ReloadResult,
};
pub use handler::{
    BoxedCommand, BoxedComponent, CommandHandler, CommandScope, ComponentHandler, FnCommand,
    FnComponent, command, component,
};
pub use matcher::{IdentityKey, IdentitySpec};
pub use publisher::{PublishReport, Publisher};
pub use registry::{CommandRegistry, ComponentRegistry, DiscoveryReport, HandlerRegistry};
pub use reload::{ReloadCoordinator, ReloadReport};
pub use services::Services;
