//! Interaction dispatcher.
//!
//! The [`InteractionDispatcher`] receives every inbound [`Interaction`],
//! resolves the handler through the registry and delivers the normalized
//! reply. Each interaction ends in exactly one [`DispatchOutcome`]:
//!
//! 1. Autocomplete requests go to the command's `autocomplete`. Failures are
//!    logged and never shown to the user.
//! 2. Interactions outside a cached guild get an ephemeral "not available"
//!    reply when repliable, and are dropped otherwise.
//! 3. Commands and components are resolved; a missing handler produces a
//!    fallback reply instead of an error.
//! 4. The handler's reply is sent as the initial reply, or as an edit when
//!    the handler deferred.
//! 5. Any failure in 3-4 is captured once with the acting user, logged, and
//!    answered with an ephemeral error reply carrying the tracking id.
//!
//! The dispatcher also implements [`tower::Service`], so it can sit under
//! ordinary tower layers.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tracing::{Instrument, error, info, info_span, warn};

use rebus_core::{
    BoxedPlatform, BoxedTracker, CaptureContext, CommandData, HandlerError, HandlerReply,
    HandlerResult, Interaction, InteractionKind, ReplyEnvelope, TrackingId,
};

use crate::context::HandlerContext;
use crate::registry::HandlerRegistry;
use crate::services::Services;

/// Reply to interactions that happen outside a cached guild.
pub const NOT_AVAILABLE_TEXT: &str = "This command is not available in this context.";

/// Reply when a clicked component has no handler.
pub const MISSING_COMPONENT_TEXT: &str = "This component no longer exists.";

/// Reply when an invoked command has no handler.
pub fn missing_command_text(name: &str) -> String {
    format!("The command '{name}' does not exist. It may have been recently removed.")
}

/// Reply when a handler failed.
pub fn error_text(id: &TrackingId) -> String {
    format!("⚠️ An unexpected error occurred. (ID: `{id}`)")
}

/// Terminal state of one dispatched interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// An initial reply was sent.
    Replied,
    /// The handler deferred and its reply was delivered as an edit.
    EditedDeferred,
    /// Nothing was sent in reply to the interaction's payload.
    Dropped,
    /// The handler (or reply delivery) failed; the error was captured.
    Errored(TrackingId),
}

/// Routes interactions to registered handlers.
#[derive(Clone)]
pub struct InteractionDispatcher {
    registry: Arc<HandlerRegistry>,
    platform: BoxedPlatform,
    tracker: BoxedTracker,
    services: Arc<Services>,
}

impl InteractionDispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, platform: BoxedPlatform, tracker: BoxedTracker) -> Self {
        Self {
            registry,
            platform,
            tracker,
            services: Arc::new(Services::new()),
        }
    }

    /// Shares `services` with every handler context.
    pub fn with_services(mut self, services: Arc<Services>) -> Self {
        self.services = services;
        self
    }

    fn context(&self, interaction: &Arc<Interaction>) -> HandlerContext {
        HandlerContext::new(Arc::clone(interaction), Arc::clone(&self.platform))
            .with_services(Arc::clone(&self.services))
    }

    /// Dispatches one interaction to completion.
    pub async fn dispatch(&self, interaction: Arc<Interaction>) -> DispatchOutcome {
        let span = info_span!(
            "dispatch",
            interaction_id = %interaction.id,
            kind = interaction.kind.as_str()
        );
        self.dispatch_inner(interaction).instrument(span).await
    }

    async fn dispatch_inner(&self, interaction: Arc<Interaction>) -> DispatchOutcome {
        if let InteractionKind::Autocomplete(data) = &interaction.kind {
            self.autocomplete(&interaction, data).await;
            return DispatchOutcome::Dropped;
        }

        if !interaction.in_cached_guild() {
            if interaction.is_repliable() {
                let reply = ReplyEnvelope::ephemeral(NOT_AVAILABLE_TEXT);
                match self.platform.send_initial_reply(&interaction, &reply).await {
                    Ok(()) => interaction.mark_replied(),
                    Err(e) => warn!(error = %e, "Failed to send not-available reply"),
                }
            }
            return DispatchOutcome::Dropped;
        }

        match self.route(&interaction).await {
            Ok(outcome) => outcome,
            Err(e) => DispatchOutcome::Errored(self.handle_error(&interaction, &e).await),
        }
    }

    async fn route(&self, interaction: &Arc<Interaction>) -> HandlerResult<DispatchOutcome> {
        let ctx = self.context(interaction);

        let reply = match &interaction.kind {
            InteractionKind::Command(data) => self.run_command(&ctx, data).await?,
            InteractionKind::Component(_) | InteractionKind::ModalSubmit(_) => {
                self.run_component(&ctx).await?
            }
            _ => HandlerReply::Nothing,
        };

        self.deliver(interaction, reply).await
    }

    async fn run_command(&self, ctx: &HandlerContext, data: &CommandData) -> HandlerResult<HandlerReply> {
        let is_global = self.platform.is_globally_registered(&data.command_id);
        let Some(handler) = self
            .registry
            .commands
            .get(&data.name, ctx.guild_id(), is_global)
        else {
            warn!(
                context = "interaction",
                command = %data.name,
                guild_id = ctx.guild_id().unwrap_or("-"),
                "Command not found or not registered for guild"
            );
            return Ok(ReplyEnvelope::ephemeral(missing_command_text(&data.name)).into());
        };

        info!(
            context = "interaction",
            "Executing command: /{} for user {} - In guild: {}",
            data.name,
            ctx.user().tag(),
            ctx.guild_id().unwrap_or("-")
        );
        handler.execute(ctx).await
    }

    async fn run_component(&self, ctx: &HandlerContext) -> HandlerResult<HandlerReply> {
        let custom_id = ctx.custom_id().unwrap_or_default();
        info!(
            context = "interaction",
            "Handling component interaction with customId: {} - In guild: {}",
            custom_id,
            ctx.guild_id().unwrap_or("-")
        );

        match self.registry.components.find(custom_id) {
            Some(handler) => handler.execute(ctx).await,
            None => {
                warn!(context = "interaction", custom_id, "Component not found");
                Ok(ReplyEnvelope::ephemeral(MISSING_COMPONENT_TEXT).into())
            }
        }
    }

    async fn deliver(&self, interaction: &Interaction, reply: HandlerReply) -> HandlerResult<DispatchOutcome> {
        let Some(envelope) = reply.into_envelope() else {
            return Ok(DispatchOutcome::Dropped);
        };
        if !interaction.is_repliable() {
            return Ok(DispatchOutcome::Dropped);
        }

        if interaction.is_deferred() {
            self.platform
                .edit_deferred_reply(interaction, &envelope)
                .await?;
            Ok(DispatchOutcome::EditedDeferred)
        } else {
            self.platform
                .send_initial_reply(interaction, &envelope)
                .await?;
            interaction.mark_replied();
            Ok(DispatchOutcome::Replied)
        }
    }

    async fn autocomplete(&self, interaction: &Arc<Interaction>, data: &CommandData) {
        let guild_id = interaction.guild_id.as_deref().unwrap_or("-");
        let is_global = self.platform.is_globally_registered(&data.command_id);
        let Some(handler) = self.registry.commands.get(
            &data.name,
            interaction.guild_id.as_deref(),
            is_global,
        ) else {
            error!(guild_id, command = %data.name, "Autocomplete failed: command not found");
            return;
        };

        let ctx = self.context(interaction);
        if let Err(e) = handler.autocomplete(&ctx).await {
            error!(guild_id, command = %data.name, error = %e, "Autocomplete failed");
        }
    }

    async fn handle_error(&self, interaction: &Interaction, err: &HandlerError) -> TrackingId {
        let id = self.tracker.capture(
            err,
            &CaptureContext::user(&interaction.user.id, interaction.guild_id.clone()),
        );
        error!(
            guild_id = interaction.guild_id.as_deref().unwrap_or("-"),
            tracking_id = %id,
            error = %err,
            "Error handling interaction"
        );

        if interaction.is_repliable() {
            let reply = ReplyEnvelope::ephemeral(error_text(&id));
            let sent = if interaction.is_replied() || interaction.is_deferred() {
                self.platform.edit_deferred_reply(interaction, &reply).await
            } else {
                self.platform.send_initial_reply(interaction, &reply).await
            };
            if let Err(e) = sent {
                error!(
                    guild_id = interaction.guild_id.as_deref().unwrap_or("-"),
                    error = %e,
                    "Failed to send error reply"
                );
            }
        }

        id
    }
}

impl std::fmt::Debug for InteractionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionDispatcher")
            .field("commands", &self.registry.commands.len())
            .field("components", &self.registry.components.len())
            .finish()
    }
}

impl tower::Service<Arc<Interaction>> for InteractionDispatcher {
    type Response = DispatchOutcome;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<DispatchOutcome, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, interaction: Arc<Interaction>) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.dispatch(interaction).await) })
    }
}
