//! Line-delimited JSON platform.
//!
//! [`StdioPlatform`] lets the dispatch core run without a chat protocol:
//! interactions are read one JSON object per line by the binary, and every
//! platform call made by the core is written back as one JSON line.
//!
//! Output lines look like:
//!
//! ```text
//! {"interaction_id":"i-1","delivery":"initial","reply":{"content":"pong","ephemeral":false}}
//! {"interaction_id":"i-2","delivery":"defer","ephemeral":true}
//! {"interaction_id":"i-3","delivery":"autocomplete","choices":[{"name":"Space","value":"Space"}]}
//! {"registered":"global","commands":[{"id":"global:puzzle","name":"puzzle"}]}
//! ```

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::debug;

use rebus_core::{
    AutocompleteChoice, CommandSpec, Interaction, Platform, PlatformError, PlatformResult,
    RegisteredCommand, RemoteScope, ReplyEnvelope,
};

/// Platform that reports every call as a JSON line on a channel.
pub struct StdioPlatform {
    out: mpsc::UnboundedSender<String>,
    global_ids: RwLock<HashSet<String>>,
}

impl StdioPlatform {
    /// Creates the platform together with the receiving end of its output.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (out, rx) = mpsc::unbounded_channel();
        let platform = Self {
            out,
            global_ids: RwLock::new(HashSet::new()),
        };
        (platform, rx)
    }

    fn emit(&self, operation: &'static str, line: Value) -> PlatformResult<()> {
        self.out
            .send(line.to_string())
            .map_err(|_| PlatformError::request(operation, "output closed"))
    }

    fn reply(&self, interaction: &Interaction, delivery: &str, reply: &ReplyEnvelope) -> PlatformResult<()> {
        self.emit(
            "reply",
            json!({
                "interaction_id": interaction.id,
                "delivery": delivery,
                "reply": reply,
            }),
        )
    }
}

#[async_trait]
impl Platform for StdioPlatform {
    async fn send_initial_reply(
        &self,
        interaction: &Interaction,
        reply: &ReplyEnvelope,
    ) -> PlatformResult<()> {
        self.reply(interaction, "initial", reply)
    }

    async fn edit_deferred_reply(
        &self,
        interaction: &Interaction,
        reply: &ReplyEnvelope,
    ) -> PlatformResult<()> {
        self.reply(interaction, "edit", reply)
    }

    async fn defer_reply(&self, interaction: &Interaction, ephemeral: bool) -> PlatformResult<()> {
        self.emit(
            "defer_reply",
            json!({
                "interaction_id": interaction.id,
                "delivery": "defer",
                "ephemeral": ephemeral,
            }),
        )
    }

    async fn respond_autocomplete(
        &self,
        interaction: &Interaction,
        choices: &[AutocompleteChoice],
    ) -> PlatformResult<()> {
        self.emit(
            "respond_autocomplete",
            json!({
                "interaction_id": interaction.id,
                "delivery": "autocomplete",
                "choices": choices,
            }),
        )
    }

    fn is_globally_registered(&self, command_id: &str) -> bool {
        self.global_ids.read().contains(command_id)
    }

    async fn replace_remote_commands(
        &self,
        scope_id: Option<&str>,
        commands: &[CommandSpec],
    ) -> PlatformResult<Vec<RegisteredCommand>> {
        let prefix = scope_id.unwrap_or("global");
        let registered: Vec<RegisteredCommand> = commands
            .iter()
            .map(|spec| RegisteredCommand {
                id: format!("{prefix}:{}", spec.name),
                name: spec.name.clone(),
            })
            .collect();

        if scope_id.is_none() {
            *self.global_ids.write() = registered.iter().map(|c| c.id.clone()).collect();
        }
        debug!(scope = prefix, count = registered.len(), "Replacing remote commands");

        self.emit(
            "replace_remote_commands",
            json!({
                "registered": prefix,
                "commands": registered,
            }),
        )?;
        Ok(registered)
    }

    async fn fetch_scope(&self, scope_id: &str) -> PlatformResult<RemoteScope> {
        Ok(RemoteScope {
            id: scope_id.to_string(),
            name: format!("stdio scope {scope_id}"),
        })
    }
}

impl std::fmt::Debug for StdioPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioPlatform")
            .field("global_commands", &self.global_ids.read().len())
            .field("closed", &self.out.is_closed())
            .finish()
    }
}
