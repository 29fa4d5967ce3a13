//! Inbound interaction model.
//!
//! An [`Interaction`] is one user-triggered event delivered by the chat
//! platform: a slash-command invocation, an autocomplete request, a component
//! click or a modal submission. The dispatcher classifies it through
//! [`InteractionKind`] and tracks its acknowledgement state (deferred /
//! replied) so that exactly one reply path is used per event.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// User
// ============================================================================

/// The user that triggered an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Platform identifier of the user.
    pub id: String,
    /// Display tag of the user.
    pub name: String,
}

impl User {
    /// Creates a new user.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Returns the user's display tag.
    pub fn tag(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Command payloads
// ============================================================================

/// A single option value supplied with a command invocation.
///
/// Subcommands and subcommand groups carry no `value` and nest their own
/// options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandOptionValue {
    /// Option name.
    pub name: String,
    /// Option value, absent for subcommands and groups.
    #[serde(default)]
    pub value: Option<Value>,
    /// Nested options.
    #[serde(default)]
    pub options: Vec<CommandOptionValue>,
    /// Whether this option is the one being autocompleted.
    #[serde(default)]
    pub focused: bool,
}

impl CommandOptionValue {
    /// Creates a leaf option with the given value.
    pub fn value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Creates a subcommand (or group) option wrapping nested options.
    pub fn nested(name: impl Into<String>, options: Vec<CommandOptionValue>) -> Self {
        Self {
            name: name.into(),
            options,
            ..Default::default()
        }
    }

    /// Marks this option as focused for autocomplete.
    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }
}

/// Payload of a command or autocomplete interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    /// Platform identifier of the registered command.
    pub command_id: String,
    /// Command name.
    pub name: String,
    /// Supplied options.
    #[serde(default)]
    pub options: Vec<CommandOptionValue>,
}

impl CommandData {
    /// Creates command data without options.
    pub fn new(command_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            command_id: command_id.into(),
            name: name.into(),
            options: Vec::new(),
        }
    }

    /// Adds an option (builder pattern).
    pub fn with_option(mut self, option: CommandOptionValue) -> Self {
        self.options.push(option);
        self
    }

    /// Returns the invoked subcommand group, if any.
    pub fn subcommand_group(&self) -> Option<&str> {
        let first = self.options.first()?;
        let nested_is_sub = first
            .options
            .first()
            .is_some_and(|o| o.value.is_none());
        (first.value.is_none() && nested_is_sub).then_some(first.name.as_str())
    }

    /// Returns the invoked subcommand, looking through a group if present.
    pub fn subcommand(&self) -> Option<&str> {
        let first = self.options.first().filter(|o| o.value.is_none())?;
        match first.options.first() {
            Some(inner) if inner.value.is_none() => Some(inner.name.as_str()),
            _ => Some(first.name.as_str()),
        }
    }

    /// Finds a leaf option by name anywhere in the option tree.
    pub fn option(&self, name: &str) -> Option<&Value> {
        fn walk<'a>(options: &'a [CommandOptionValue], name: &str) -> Option<&'a Value> {
            options.iter().find_map(|o| match &o.value {
                Some(v) if o.name == name => Some(v),
                Some(_) => None,
                None => walk(&o.options, name),
            })
        }
        walk(&self.options, name)
    }

    /// Returns a string option by name.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.option(name).and_then(Value::as_str)
    }

    /// Returns an integer option by name.
    pub fn integer(&self, name: &str) -> Option<i64> {
        self.option(name).and_then(Value::as_i64)
    }

    /// Returns a boolean option by name.
    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.option(name).and_then(Value::as_bool)
    }

    /// Returns the focused option of an autocomplete request.
    pub fn focused(&self) -> Option<&CommandOptionValue> {
        fn walk(options: &[CommandOptionValue]) -> Option<&CommandOptionValue> {
            options
                .iter()
                .find_map(|o| if o.focused { Some(o) } else { walk(&o.options) })
        }
        walk(&self.options)
    }
}

/// Payload of a message-component interaction (button, select menu).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentData {
    /// Developer-defined identifier of the component.
    pub custom_id: String,
    /// Selected values for select menus.
    #[serde(default)]
    pub values: Vec<String>,
}

/// Payload of a modal submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalData {
    /// Developer-defined identifier of the modal.
    pub custom_id: String,
    /// Submitted text fields keyed by their custom id.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

// ============================================================================
// InteractionKind
// ============================================================================

/// Classification of an inbound interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionKind {
    /// Slash-command invocation.
    Command(CommandData),
    /// Autocomplete request for a command option.
    Autocomplete(CommandData),
    /// Message component (button, select menu).
    Component(ComponentData),
    /// Modal submission.
    ModalSubmit(ModalData),
    /// Platform ping or any other non-actionable interaction.
    Ping,
}

impl InteractionKind {
    /// Short name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command(_) => "command",
            Self::Autocomplete(_) => "autocomplete",
            Self::Component(_) => "component",
            Self::ModalSubmit(_) => "modal_submit",
            Self::Ping => "ping",
        }
    }
}

// ============================================================================
// Interaction
// ============================================================================

/// One inbound interaction event.
///
/// Acknowledgement state is tracked with atomics so the interaction can be
/// shared (`Arc<Interaction>`) between the dispatcher and the handler it
/// invokes; a handler that defers marks the interaction, and the dispatcher
/// then edits the deferred reply instead of sending an initial one.
#[derive(Debug, Serialize, Deserialize)]
pub struct Interaction {
    /// Platform identifier of the interaction.
    pub id: String,
    /// Interaction payload.
    #[serde(flatten)]
    pub kind: InteractionKind,
    /// The acting user.
    pub user: User,
    /// The guild (scope) the interaction happened in, if any.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Whether the guild is known to the bot's cache.
    #[serde(default = "default_cached")]
    pub guild_cached: bool,
    #[serde(skip)]
    deferred: AtomicBool,
    #[serde(skip)]
    replied: AtomicBool,
}

fn default_cached() -> bool {
    true
}

impl Interaction {
    /// Creates a new interaction in the given guild.
    pub fn new(
        id: impl Into<String>,
        kind: InteractionKind,
        user: User,
        guild_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            user,
            guild_id,
            guild_cached: true,
            deferred: AtomicBool::new(false),
            replied: AtomicBool::new(false),
        }
    }

    /// Marks the guild as unknown to the bot's cache (builder pattern).
    pub fn uncached(mut self) -> Self {
        self.guild_cached = false;
        self
    }

    /// Returns the command payload for command and autocomplete interactions.
    pub fn command(&self) -> Option<&CommandData> {
        match &self.kind {
            InteractionKind::Command(data) | InteractionKind::Autocomplete(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the custom id for component and modal interactions.
    pub fn custom_id(&self) -> Option<&str> {
        match &self.kind {
            InteractionKind::Component(data) => Some(&data.custom_id),
            InteractionKind::ModalSubmit(data) => Some(&data.custom_id),
            _ => None,
        }
    }

    /// Returns `true` if the interaction happened inside a guild known to the
    /// bot's cache.
    pub fn in_cached_guild(&self) -> bool {
        self.guild_id.is_some() && self.guild_cached
    }

    /// Returns `true` if the platform accepts a message reply for this
    /// interaction.
    pub fn is_repliable(&self) -> bool {
        !matches!(
            self.kind,
            InteractionKind::Autocomplete(_) | InteractionKind::Ping
        )
    }

    /// Returns `true` once the reply has been deferred.
    pub fn is_deferred(&self) -> bool {
        self.deferred.load(Ordering::SeqCst)
    }

    /// Returns `true` once an initial reply has been sent.
    pub fn is_replied(&self) -> bool {
        self.replied.load(Ordering::SeqCst)
    }

    /// Records that the reply was deferred.
    pub fn mark_deferred(&self) {
        self.deferred.store(true, Ordering::SeqCst);
    }

    /// Records that an initial reply was sent.
    pub fn mark_replied(&self) {
        self.replied.store(true, Ordering::SeqCst);
    }
}
