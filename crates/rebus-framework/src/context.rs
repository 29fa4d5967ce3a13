//! Handler execution context.
//!
//! A [`HandlerContext`] is created by the dispatcher for every interaction it
//! routes to a handler. It bundles the shared interaction with the platform
//! handle, so handlers can read options, defer slow replies and answer
//! autocomplete requests without reaching for globals. Shared state is
//! looked up from the [`Services`] map with [`HandlerContext::service`].

use std::sync::Arc;

use crate::services::Services;
use rebus_core::{
    AutocompleteChoice, BoxedPlatform, CommandData, HandlerError, HandlerResult, Interaction,
    PlatformError, User,
};

/// The context object passed to command and component handlers.
#[derive(Clone)]
pub struct HandlerContext {
    interaction: Arc<Interaction>,
    platform: BoxedPlatform,
    services: Arc<Services>,
}

impl HandlerContext {
    /// Creates a context for one interaction.
    pub fn new(interaction: Arc<Interaction>, platform: BoxedPlatform) -> Self {
        Self {
            interaction,
            platform,
            services: Arc::new(Services::new()),
        }
    }

    /// Attaches the shared services.
    pub fn with_services(mut self, services: Arc<Services>) -> Self {
        self.services = services;
        self
    }

    /// Returns the interaction being handled.
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Returns the acting user.
    pub fn user(&self) -> &User {
        &self.interaction.user
    }

    /// Returns the guild the interaction happened in.
    pub fn guild_id(&self) -> Option<&str> {
        self.interaction.guild_id.as_deref()
    }

    /// Returns the command payload, if this is a command or autocomplete.
    pub fn command(&self) -> Option<&CommandData> {
        self.interaction.command()
    }

    /// Returns the custom id, if this is a component or modal submission.
    pub fn custom_id(&self) -> Option<&str> {
        self.interaction.custom_id()
    }

    /// Returns a required string option or [`HandlerError::MissingOption`].
    pub fn required_string(&self, name: &str) -> HandlerResult<&str> {
        self.command()
            .and_then(|data| data.string(name))
            .ok_or_else(|| HandlerError::MissingOption(name.to_string()))
    }

    /// Defers the reply.
    ///
    /// After deferring, the dispatcher delivers the handler's reply by
    /// editing the deferred response.
    pub async fn defer(&self, ephemeral: bool) -> HandlerResult<()> {
        if self.interaction.is_deferred() || self.interaction.is_replied() {
            return Err(PlatformError::AlreadyAcknowledged(self.interaction.id.clone()).into());
        }
        self.platform
            .defer_reply(&self.interaction, ephemeral)
            .await?;
        self.interaction.mark_deferred();
        Ok(())
    }

    /// Answers an autocomplete request.
    pub async fn respond_autocomplete(&self, choices: &[AutocompleteChoice]) -> HandlerResult<()> {
        self.platform
            .respond_autocomplete(&self.interaction, choices)
            .await?;
        Ok(())
    }

    /// Returns a shared service or [`HandlerError::ServiceNotFound`].
    pub fn service<T: ?Sized + Send + Sync + 'static>(&self) -> HandlerResult<Arc<T>> {
        self.services
            .get::<T>()
            .ok_or(HandlerError::ServiceNotFound(std::any::type_name::<T>()))
    }

    /// Returns the platform handle.
    pub fn platform(&self) -> &BoxedPlatform {
        &self.platform
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("interaction", &self.interaction.id)
            .field("kind", &self.interaction.kind.as_str())
            .finish_non_exhaustive()
    }
}
