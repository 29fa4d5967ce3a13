//! Configuration validation utilities.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, LogOutput, LoggingConfig, PuzzleConfig, RebusConfig};

/// Most hints a puzzle can carry; more cannot be revealed.
pub const MAX_HINTS: u32 = 3;

/// Validates the entire configuration.
///
/// The token is not checked here; the runtime builder reports a missing
/// token separately so that config files without secrets stay valid.
pub fn validate_config(config: &RebusConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_puzzle_config(&config.puzzle)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for id in &bot.dev_scope_ids {
        if id.trim().is_empty() {
            return Err(ConfigError::validation("Scope ids must not be empty"));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Scope id '{id}' must not contain whitespace"
            )));
        }
        if !seen.insert(id.as_str()) {
            return Err(ConfigError::validation(format!(
                "Scope id '{id}' is listed more than once"
            )));
        }
    }

    if let Some(app_id) = &bot.application_id
        && app_id.trim().is_empty()
    {
        return Err(ConfigError::missing_field("bot.application_id"));
    }

    Ok(())
}

fn validate_puzzle_config(puzzle: &PuzzleConfig) -> ConfigResult<()> {
    if puzzle.max_guesses == 0 {
        return Err(ConfigError::validation(
            "puzzle.max_guesses must be greater than 0",
        ));
    }

    if puzzle.hints_allowed > MAX_HINTS {
        return Err(ConfigError::validation(format!(
            "puzzle.hints_allowed must be at most {MAX_HINTS}"
        )));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        if logging.file_path.is_none() {
            return Err(ConfigError::missing_field("logging.file_path"));
        }
        if logging.max_files == 0 {
            return Err(ConfigError::validation(
                "logging.max_files must be greater than 0",
            ));
        }
    }

    for module in logging.filters.keys() {
        if module.trim().is_empty() || module.contains('=') {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: '{module}'"
            )));
        }
    }

    Ok(())
}
