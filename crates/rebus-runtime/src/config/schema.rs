//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RebusConfig {
    /// Bot credentials and registration scopes.
    #[serde(default)]
    pub bot: BotConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Gameplay settings.
    #[serde(default)]
    pub puzzle: PuzzleConfig,
}

// =============================================================================
// Bot
// =============================================================================

/// Credentials and registration scopes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BotConfig {
    /// Platform token. Required at boot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Application id the commands are registered under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,

    /// Scopes (guilds) that receive the development-only commands.
    #[serde(default)]
    pub dev_scope_ids: Vec<String>,
}

impl BotConfig {
    /// Returns the token if one is set and non-blank.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

// =============================================================================
// Puzzle
// =============================================================================

/// Gameplay limits and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleConfig {
    /// Guesses allowed per puzzle before the game is over.
    #[serde(default = "default_max_guesses")]
    pub max_guesses: u32,

    /// Hints a player may reveal per puzzle.
    #[serde(default = "default_hints_allowed")]
    pub hints_allowed: u32,

    /// Points awarded for a correct guess.
    #[serde(default = "default_correct_reward")]
    pub correct_reward: u32,

    /// Points deducted when a player runs out of guesses.
    #[serde(default = "default_game_over_penalty")]
    pub game_over_penalty: u32,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            max_guesses: default_max_guesses(),
            hints_allowed: default_hints_allowed(),
            correct_reward: default_correct_reward(),
            game_over_penalty: default_game_over_penalty(),
        }
    }
}

fn default_max_guesses() -> u32 {
    5
}

fn default_hints_allowed() -> u32 {
    2
}

fn default_correct_reward() -> u32 {
    10
}

fn default_game_over_penalty() -> u32 {
    3
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` otherwise.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Per-module level overrides, e.g. `rebus_framework = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line in log lines.
    #[serde(default)]
    pub file_location: bool,

    /// Path used when `output = "file"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    /// Rotated daily files kept when logging to a file.
    #[serde(default = "default_max_files")]
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            filters: BTreeMap::new(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            max_files: default_max_files(),
        }
    }
}

fn default_max_files() -> u32 {
    5
}
