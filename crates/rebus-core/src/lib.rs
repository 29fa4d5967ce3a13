//! # Rebus Core
//!
//! The interaction model and platform seams of the Rebus puzzle bot.
//!
//! This crate defines the data that flows through the dispatch core and the
//! interfaces of the collaborators the core depends on, without any registry
//! or routing logic:
//!
//! - **Interactions**: inbound events and their acknowledgement state
//!   ([`Interaction`], [`InteractionKind`])
//! - **Replies**: handler output and its normalized form ([`HandlerReply`],
//!   [`ReplyEnvelope`])
//! - **Command schema**: what gets published to the platform ([`CommandSpec`])
//! - **Platform seam**: reply and registration primitives ([`Platform`])
//! - **Error tracking**: the capture sink ([`ErrorTracker`])
//!
//! ```text
//! ┌──────────┐  Interaction  ┌────────────┐  HandlerReply  ┌─────────┐
//! │ Platform │──────────────▶│ Dispatcher │◀───────────────│ Handler │
//! │          │◀──────────────│            │───────────────▶│         │
//! └──────────┘ ReplyEnvelope └────────────┘   Interaction  └─────────┘
//! ```

pub mod command;
pub mod error;
pub mod interaction;
pub mod platform;
pub mod reply;
pub mod tracking;

pub use command::{
    CommandSpec, DEFAULT_DM_PERMISSION, DEFAULT_MEMBER_PERMISSIONS, OptionKind, OptionSpec,
    Permissions, RegisteredCommand,
};
pub use error::{HandlerError, HandlerResult, PlatformError, PlatformResult};
pub use interaction::{
    CommandData, CommandOptionValue, ComponentData, Interaction, InteractionKind, ModalData, User,
};
pub use platform::{AutocompleteChoice, BoxedPlatform, Platform, RemoteScope};
pub use reply::{Attachment, Embed, HandlerReply, ReplyEnvelope, colors, reply, reply_embed};
pub use tracking::{BoxedTracker, CaptureContext, ErrorTracker, TracingTracker, TrackingId};

/// Prelude for common imports.
pub mod prelude {
    pub use super::command::{CommandSpec, OptionSpec, Permissions};
    pub use super::error::{HandlerError, HandlerResult};
    pub use super::interaction::{Interaction, InteractionKind, User};
    pub use super::reply::{Embed, HandlerReply, ReplyEnvelope, reply, reply_embed};
}
