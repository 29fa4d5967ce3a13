//! The chat-platform seam.
//!
//! The core never speaks the chat protocol itself. Everything it needs from
//! the platform (reply primitives, bulk command registration, scope lookup
//! and the global-command check used to disambiguate scoped commands) is
//! expressed by the [`Platform`] trait and injected at startup.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::command::{CommandSpec, RegisteredCommand};
use crate::error::PlatformResult;
use crate::interaction::Interaction;
use crate::reply::ReplyEnvelope;

/// A remote scope (guild) as returned by [`Platform::fetch_scope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteScope {
    pub id: String,
    pub name: String,
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteChoice {
    pub name: String,
    pub value: serde_json::Value,
}

impl AutocompleteChoice {
    /// Creates a choice whose value equals its display name.
    pub fn text(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: serde_json::Value::String(name.clone()),
            name,
        }
    }
}

/// Capabilities the dispatch core requires from the chat platform.
///
/// Implementations must be cheap to share; the runtime holds a single
/// [`BoxedPlatform`] and clones the `Arc` into every component.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Sends the initial reply to an interaction.
    async fn send_initial_reply(
        &self,
        interaction: &Interaction,
        reply: &ReplyEnvelope,
    ) -> PlatformResult<()>;

    /// Replaces the content of a previously deferred reply.
    async fn edit_deferred_reply(
        &self,
        interaction: &Interaction,
        reply: &ReplyEnvelope,
    ) -> PlatformResult<()>;

    /// Acknowledges an interaction without content; the final reply is
    /// delivered later through [`edit_deferred_reply`](Self::edit_deferred_reply).
    async fn defer_reply(&self, interaction: &Interaction, ephemeral: bool) -> PlatformResult<()>;

    /// Answers an autocomplete request.
    async fn respond_autocomplete(
        &self,
        interaction: &Interaction,
        choices: &[AutocompleteChoice],
    ) -> PlatformResult<()>;

    /// Returns `true` if `command_id` belongs to the application-global
    /// command set.
    fn is_globally_registered(&self, command_id: &str) -> bool;

    /// Replaces the remote command set of a scope with exactly `commands`.
    ///
    /// `None` targets the application-global set.
    async fn replace_remote_commands(
        &self,
        scope_id: Option<&str>,
        commands: &[CommandSpec],
    ) -> PlatformResult<Vec<RegisteredCommand>>;

    /// Fetches a scope by id.
    async fn fetch_scope(&self, scope_id: &str) -> PlatformResult<RemoteScope>;
}

/// Shared platform handle.
pub type BoxedPlatform = Arc<dyn Platform>;
