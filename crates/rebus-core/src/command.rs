//! Command schema published to the platform.
//!
//! A [`CommandSpec`] is the static description of one slash command: its
//! name, description, option tree and permission defaults. Handlers expose
//! their spec, and the publisher sends [`CommandSpec::build`]ed copies to the
//! platform when replacing a scope's remote command set.

use serde::{Deserialize, Serialize};

// ============================================================================
// Permissions
// ============================================================================

/// Member permission bit set required to use a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub u64);

impl Permissions {
    /// No permission required.
    pub const NONE: Self = Self(0);
    /// Manage guild permission.
    pub const MANAGE_GUILD: Self = Self(1 << 5);
    /// Administrator permission.
    pub const ADMINISTRATOR: Self = Self(1 << 3);

    /// Returns `true` if all bits of `other` are set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Permissions applied when a command does not set its own.
pub const DEFAULT_MEMBER_PERMISSIONS: Permissions = Permissions::MANAGE_GUILD;

/// DM availability applied when a command does not set its own.
pub const DEFAULT_DM_PERMISSION: bool = true;

// ============================================================================
// Options
// ============================================================================

/// The type of a command option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    Subcommand,
    SubcommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Number,
    Attachment,
}

/// One option in a command's option tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub autocomplete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSpec>,
}

impl OptionSpec {
    /// Creates an option of the given kind.
    pub fn new(kind: OptionKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: false,
            autocomplete: false,
            max_value: None,
            options: Vec::new(),
        }
    }

    /// Creates a subcommand.
    pub fn subcommand(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::Subcommand, name, description)
    }

    /// Creates a subcommand group.
    pub fn group(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::SubcommandGroup, name, description)
    }

    /// Creates a string option.
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::String, name, description)
    }

    /// Marks the option as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Enables autocomplete for the option.
    pub fn autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }

    /// Sets the maximum numeric value.
    pub fn max_value(mut self, max: f64) -> Self {
        self.max_value = Some(max);
        self
    }

    /// Adds a nested option.
    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }
}

// ============================================================================
// CommandSpec
// ============================================================================

/// Static description of a slash command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<Permissions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dm_permission: Option<bool>,
}

impl CommandSpec {
    /// Creates a command spec without options.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
            default_member_permissions: None,
            dm_permission: None,
        }
    }

    /// Adds an option (builder pattern).
    pub fn option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    /// Sets the default member permissions.
    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.default_member_permissions = Some(permissions);
        self
    }

    /// Sets whether the command is usable in DMs.
    pub fn dm_permission(mut self, allowed: bool) -> Self {
        self.dm_permission = Some(allowed);
        self
    }

    /// Returns the spec sent to the platform, with permission defaults
    /// filled in where unset.
    pub fn build(&self) -> CommandSpec {
        let mut built = self.clone();
        built
            .default_member_permissions
            .get_or_insert(DEFAULT_MEMBER_PERMISSIONS);
        built.dm_permission.get_or_insert(DEFAULT_DM_PERMISSION);
        built
    }
}

/// A command as acknowledged by the platform after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredCommand {
    /// Platform-assigned command id.
    pub id: String,
    /// Command name.
    pub name: String,
}
