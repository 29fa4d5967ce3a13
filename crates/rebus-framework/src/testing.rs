//! Recording fakes shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use rebus_core::{
    AutocompleteChoice, CaptureContext, CommandSpec, ErrorTracker, Interaction, Platform,
    PlatformError, PlatformResult, RegisteredCommand, RemoteScope, ReplyEnvelope, TrackingId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Initial,
    Edit,
}

#[derive(Default)]
pub struct RecordingPlatform {
    remote: Mutex<HashMap<Option<String>, Vec<CommandSpec>>>,
    global_ids: Mutex<HashSet<String>>,
    unfetchable: Mutex<HashSet<String>>,
    fail_global: AtomicBool,
    fail_replies: AtomicBool,
    replace_calls: AtomicUsize,
    pub replies: Mutex<Vec<(String, Delivery, ReplyEnvelope)>>,
    pub deferred: Mutex<Vec<String>>,
    pub autocompletes: Mutex<Vec<Vec<AutocompleteChoice>>>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_remote(&self, scope: Option<&str>, names: &[&str]) {
        let specs = names.iter().map(|n| CommandSpec::new(*n, *n)).collect();
        self.remote.lock().insert(scope.map(str::to_string), specs);
    }

    pub fn remote_specs(&self, scope: Option<&str>) -> Vec<CommandSpec> {
        self.remote
            .lock()
            .get(&scope.map(str::to_string))
            .cloned()
            .unwrap_or_default()
    }

    pub fn remote_names(&self, scope: Option<&str>) -> Vec<String> {
        self.remote_specs(scope).into_iter().map(|s| s.name).collect()
    }

    pub fn fail_scope(&self, scope_id: &str) {
        self.unfetchable.lock().insert(scope_id.to_string());
    }

    pub fn fail_global(&self) {
        self.fail_global.store(true, Ordering::SeqCst);
    }

    pub fn fail_replies(&self) {
        self.fail_replies.store(true, Ordering::SeqCst);
    }

    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    pub fn reply_count(&self) -> usize {
        self.replies.lock().len()
    }

    pub fn last_reply(&self) -> Option<(Delivery, ReplyEnvelope)> {
        self.replies
            .lock()
            .last()
            .map(|(_, delivery, envelope)| (*delivery, envelope.clone()))
    }

    fn record(&self, interaction: &Interaction, delivery: Delivery, reply: &ReplyEnvelope) -> PlatformResult<()> {
        self.replies
            .lock()
            .push((interaction.id.clone(), delivery, reply.clone()));
        if self.fail_replies.load(Ordering::SeqCst) {
            return Err(PlatformError::request("reply", "rejected"));
        }
        Ok(())
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn send_initial_reply(
        &self,
        interaction: &Interaction,
        reply: &ReplyEnvelope,
    ) -> PlatformResult<()> {
        self.record(interaction, Delivery::Initial, reply)
    }

    async fn edit_deferred_reply(
        &self,
        interaction: &Interaction,
        reply: &ReplyEnvelope,
    ) -> PlatformResult<()> {
        self.record(interaction, Delivery::Edit, reply)
    }

    async fn defer_reply(&self, interaction: &Interaction, _ephemeral: bool) -> PlatformResult<()> {
        self.deferred.lock().push(interaction.id.clone());
        Ok(())
    }

    async fn respond_autocomplete(
        &self,
        _interaction: &Interaction,
        choices: &[AutocompleteChoice],
    ) -> PlatformResult<()> {
        self.autocompletes.lock().push(choices.to_vec());
        Ok(())
    }

    fn is_globally_registered(&self, command_id: &str) -> bool {
        self.global_ids.lock().contains(command_id)
    }

    async fn replace_remote_commands(
        &self,
        scope_id: Option<&str>,
        commands: &[CommandSpec],
    ) -> PlatformResult<Vec<RegisteredCommand>> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        if scope_id.is_none() && self.fail_global.load(Ordering::SeqCst) {
            return Err(PlatformError::request("replace_remote_commands", "rejected"));
        }

        let prefix = scope_id.unwrap_or("global");
        let registered: Vec<RegisteredCommand> = commands
            .iter()
            .map(|spec| RegisteredCommand {
                id: format!("{prefix}:{}", spec.name),
                name: spec.name.clone(),
            })
            .collect();

        if scope_id.is_none() {
            *self.global_ids.lock() = registered.iter().map(|c| c.id.clone()).collect();
        }
        self.remote
            .lock()
            .insert(scope_id.map(str::to_string), commands.to_vec());
        Ok(registered)
    }

    async fn fetch_scope(&self, scope_id: &str) -> PlatformResult<RemoteScope> {
        if self.unfetchable.lock().contains(scope_id) {
            return Err(PlatformError::ScopeNotFound(scope_id.to_string()));
        }
        Ok(RemoteScope {
            id: scope_id.to_string(),
            name: format!("Guild {scope_id}"),
        })
    }
}

#[derive(Default)]
pub struct RecordingTracker {
    pub captured: Mutex<Vec<(String, CaptureContext)>>,
}

impl RecordingTracker {
    pub fn count(&self) -> usize {
        self.captured.lock().len()
    }
}

impl ErrorTracker for RecordingTracker {
    fn capture(
        &self,
        error: &(dyn std::error::Error + 'static),
        context: &CaptureContext,
    ) -> TrackingId {
        let mut captured = self.captured.lock();
        captured.push((error.to_string(), context.clone()));
        TrackingId::new(format!("t-{}", captured.len()))
    }
}
