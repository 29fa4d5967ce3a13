//! Handler traits for commands and components.
//!
//! Command handlers are keyed by name and carry the [`CommandSpec`] that is
//! published to the platform. Component handlers are keyed by an
//! [`IdentitySpec`] matched against the custom id of the clicked component.
//!
//! Both can be implemented directly on a struct, or built from async
//! closures with [`command`] and [`component`]:
//!
//! ```rust,ignore
//! use rebus_framework::handler::{command, CommandScope};
//! use rebus_core::CommandSpec;
//!
//! let ping = command(CommandSpec::new("ping", "Ping"), |_ctx| async { Ok("pong") })
//!     .scoped(["G1"]);
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use rebus_core::{CommandSpec, HandlerError, HandlerReply, HandlerResult};

use crate::context::HandlerContext;
use crate::matcher::IdentitySpec;

// ============================================================================
// CommandScope
// ============================================================================

/// Where a command is registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommandScope {
    /// Application-global command.
    #[default]
    Global,
    /// Command registered only in the listed scopes (guilds).
    Scoped(Vec<String>),
}

impl CommandScope {
    /// Creates a scoped variant from any list of ids.
    pub fn scoped<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Scoped(ids.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Handler traits
// ============================================================================

/// A slash-command handler.
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    /// The schema published to the platform.
    fn spec(&self) -> &CommandSpec;

    /// The registry key; defaults to the spec name.
    fn name(&self) -> &str {
        &self.spec().name
    }

    /// Where the command is registered.
    fn scope(&self) -> CommandScope {
        CommandScope::Global
    }

    /// Runs the command.
    async fn execute(&self, ctx: &HandlerContext) -> HandlerResult<HandlerReply>;

    /// Answers an autocomplete request for one of the command's options.
    async fn autocomplete(&self, _ctx: &HandlerContext) -> HandlerResult<()> {
        Err(HandlerError::Unsupported("autocomplete"))
    }
}

/// A message-component handler.
#[async_trait]
pub trait ComponentHandler: Send + Sync + 'static {
    /// The custom ids this handler answers to.
    fn identity(&self) -> &IdentitySpec;

    /// Handles the component interaction.
    async fn execute(&self, ctx: &HandlerContext) -> HandlerResult<HandlerReply>;
}

/// Shared command handler.
pub type BoxedCommand = Arc<dyn CommandHandler>;

/// Shared component handler.
pub type BoxedComponent = Arc<dyn ComponentHandler>;

// ============================================================================
// Closure-backed handlers
// ============================================================================

type ExecuteFn = Arc<dyn Fn(HandlerContext) -> BoxFuture<'static, HandlerResult<HandlerReply>> + Send + Sync>;
type AutocompleteFn = Arc<dyn Fn(HandlerContext) -> BoxFuture<'static, HandlerResult<()>> + Send + Sync>;

fn erase_execute<F, Fut, R>(f: F) -> ExecuteFn
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<R>> + Send + 'static,
    R: Into<HandlerReply>,
{
    Arc::new(move |ctx| {
        let fut = f(ctx);
        Box::pin(async move { fut.await.map(Into::into) })
    })
}

/// A command handler backed by async closures.
#[derive(Clone)]
pub struct FnCommand {
    spec: CommandSpec,
    scope: CommandScope,
    execute: ExecuteFn,
    autocomplete: Option<AutocompleteFn>,
}

impl FnCommand {
    /// Restricts the command to the given scopes (builder pattern).
    pub fn scoped<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = CommandScope::scoped(ids);
        self
    }

    /// Sets the autocomplete callback (builder pattern).
    pub fn with_autocomplete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        self.autocomplete = Some(Arc::new(move |ctx| Box::pin(f(ctx))));
        self
    }
}

#[async_trait]
impl CommandHandler for FnCommand {
    fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    fn scope(&self) -> CommandScope {
        self.scope.clone()
    }

    async fn execute(&self, ctx: &HandlerContext) -> HandlerResult<HandlerReply> {
        (self.execute)(ctx.clone()).await
    }

    async fn autocomplete(&self, ctx: &HandlerContext) -> HandlerResult<()> {
        match &self.autocomplete {
            Some(f) => f(ctx.clone()).await,
            None => Err(HandlerError::Unsupported("autocomplete")),
        }
    }
}

impl std::fmt::Debug for FnCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCommand")
            .field("name", &self.spec.name)
            .field("scope", &self.scope)
            .field("autocomplete", &self.autocomplete.is_some())
            .finish()
    }
}

/// A component handler backed by an async closure.
#[derive(Clone)]
pub struct FnComponent {
    identity: IdentitySpec,
    execute: ExecuteFn,
}

#[async_trait]
impl ComponentHandler for FnComponent {
    fn identity(&self) -> &IdentitySpec {
        &self.identity
    }

    async fn execute(&self, ctx: &HandlerContext) -> HandlerResult<HandlerReply> {
        (self.execute)(ctx.clone()).await
    }
}

impl std::fmt::Debug for FnComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnComponent")
            .field("identity", &self.identity.to_string())
            .finish()
    }
}

/// Builds a global command handler from an async closure.
pub fn command<F, Fut, R>(spec: CommandSpec, f: F) -> FnCommand
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<R>> + Send + 'static,
    R: Into<HandlerReply>,
{
    FnCommand {
        spec,
        scope: CommandScope::Global,
        execute: erase_execute(f),
        autocomplete: None,
    }
}

/// Builds a component handler from an async closure.
pub fn component<F, Fut, R>(identity: impl Into<IdentitySpec>, f: F) -> FnComponent
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<R>> + Send + 'static,
    R: Into<HandlerReply>,
{
    FnComponent {
        identity: identity.into(),
        execute: erase_execute(f),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPlatform;
    use rebus_core::{CommandData, Interaction, InteractionKind, User};

    fn ctx() -> HandlerContext {
        let interaction = Interaction::new(
            "i-1",
            InteractionKind::Command(CommandData::new("c-1", "ping")),
            User::new("u-1", "alice"),
            Some("G1".into()),
        );
        HandlerContext::new(Arc::new(interaction), Arc::new(RecordingPlatform::new()))
    }

    #[test]
    fn test_closure_reply_is_normalized() {
        let ping = command(CommandSpec::new("ping", "Ping"), |_ctx| async { Ok("pong") });
        assert_eq!(ping.name(), "ping");
        assert_eq!(ping.scope(), CommandScope::Global);

        let reply = tokio_test::block_on(ping.execute(&ctx())).unwrap();
        assert!(matches!(reply, HandlerReply::Text(ref text) if text == "pong"));
    }

    #[test]
    fn test_autocomplete_defaults_to_unsupported() {
        let plain = command(CommandSpec::new("ping", "Ping"), |_ctx| async { Ok(()) });
        let err = tokio_test::block_on(plain.autocomplete(&ctx())).unwrap_err();
        assert!(matches!(err, HandlerError::Unsupported("autocomplete")));

        let themed = plain
            .with_autocomplete(|_ctx| async { Ok(()) })
            .scoped(["G1", "G2"]);
        assert!(tokio_test::block_on(themed.autocomplete(&ctx())).is_ok());
        assert_eq!(themed.scope(), CommandScope::scoped(["G1", "G2"]));
    }
}
