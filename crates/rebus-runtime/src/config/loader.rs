//! Layered configuration loading with figment.
//!
//! Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. `rebus.<profile>.toml` next to the base file
//! 3. the base file: an explicit [`ConfigLoader::file`], or the first
//!    `rebus.toml` / `config.toml` found in the search directories
//! 4. `REBUS_*` variables, `__` separating sections
//!    (`REBUS_PUZZLE__MAX_GUESSES=6` sets `puzzle.max_guesses`)
//! 5. values merged with [`ConfigLoader::merge`]
//!
//! The profile comes from `REBUS_PROFILE` unless set explicitly; `dev` and
//! `prod` are short for `development` and `production`.

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use figment::providers::{Env, Serialized};
use tracing::{debug, info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::RebusConfig;

/// Environment variable selecting the profile.
pub const PROFILE_ENV: &str = "REBUS_PROFILE";

const FILE_NAMES: &[&str] = &["rebus.toml", "config.toml"];

/// Canonical form of a profile name.
pub fn profile_name(raw: &str) -> String {
    match raw.trim().to_lowercase().as_str() {
        "" | "dev" | "development" => "development".to_string(),
        "prod" | "production" => "production".to_string(),
        other => other.to_string(),
    }
}

/// Builds a [`RebusConfig`] from files, the environment and overrides.
pub struct ConfigLoader {
    profile: String,
    search_paths: Vec<PathBuf>,
    file: Option<PathBuf>,
    env: bool,
    overrides: Figment,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            profile: profile_name(&std::env::var(PROFILE_ENV).unwrap_or_default()),
            search_paths: Vec::new(),
            file: None,
            env: true,
            overrides: Figment::new(),
        }
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile_name(&profile.into());
        self
    }

    /// Adds a directory searched for `rebus.toml`.
    ///
    /// With no search directory the current directory and the user config
    /// directory (`~/.config/rebus` on Linux) are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Loads this file instead of searching; it must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Ignores `REBUS_*` variables.
    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    /// Merges `config` over every other source.
    pub fn merge(mut self, config: RebusConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    pub fn load(self) -> ConfigResult<RebusConfig> {
        let mut figment = Figment::from(Serialized::defaults(RebusConfig::default()));

        figment = match &self.file {
            Some(path) if !path.exists() => return Err(ConfigError::FileNotFound(path.clone())),
            Some(path) => {
                info!(path = %path.display(), "Loading configuration file");
                merge_file(figment, path)?
            }
            None => self.search(figment),
        };

        if self.env {
            figment = figment.merge(Env::prefixed("REBUS_").ignore(&["PROFILE"]).split("__"));
        }

        let config: RebusConfig = figment.merge(self.overrides).extract()?;
        debug!(
            profile = %self.profile,
            logging_level = %config.logging.level,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("rebus")))
            .collect()
    }

    /// Merges the profile variant and the first base file found.
    fn search(&self, mut figment: Figment) -> Figment {
        for dir in self.search_dirs() {
            for name in FILE_NAMES {
                let base = dir.join(name);
                if !base.exists() {
                    continue;
                }
                let variant = dir.join(name.replace(".toml", &format!(".{}.toml", self.profile)));
                if variant.exists() {
                    debug!(path = %variant.display(), "Loading profile configuration");
                    figment = merge_toml(figment, &variant);
                }
                info!(path = %base.display(), "Loading configuration file");
                return merge_toml(figment, &base);
            }
        }
        warn!("No configuration file found, using defaults");
        figment
    }
}

fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    match path.extension().and_then(|e| e.to_str()) {
        #[cfg(feature = "toml-config")]
        Some("toml") => Ok(merge_toml(figment, path)),
        other => Err(ConfigError::UnsupportedFormat(other.unwrap_or_default().to_string())),
    }
}

#[cfg(feature = "toml-config")]
fn merge_toml(figment: Figment, path: &Path) -> Figment {
    figment.merge(Toml::file(path))
}

#[cfg(not(feature = "toml-config"))]
fn merge_toml(figment: Figment, path: &Path) -> Figment {
    warn!(path = %path.display(), "TOML support disabled, skipping file");
    figment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rebus-config-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let config = ConfigLoader::new()
            .search_path(temp_dir("empty"))
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level.as_str(), "info");
        assert_eq!(config.puzzle.max_guesses, 5);
        assert!(config.bot.token().is_none());
    }

    #[test]
    fn test_profile_file_is_overridden_by_base_file() {
        let dir = temp_dir("profile");
        std::fs::write(dir.join("rebus.toml"), "[puzzle]\nmax_guesses = 7\n").unwrap();
        std::fs::write(
            dir.join("rebus.production.toml"),
            "[puzzle]\nmax_guesses = 9\nhints_allowed = 1\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .profile("prod")
            .search_path(&dir)
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.puzzle.max_guesses, 7);
        assert_eq!(config.puzzle.hints_allowed, 1);
    }

    #[test]
    fn test_programmatic_override_wins() {
        let mut overrides = RebusConfig::default();
        overrides.logging.level = LogLevel::Debug;
        overrides.bot.token = Some("t".into());

        let config = ConfigLoader::new()
            .search_path(temp_dir("override"))
            .without_env()
            .merge(overrides)
            .load()
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.bot.token(), Some("t"));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .file("/definitely/not/here/rebus.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let path = temp_dir("format").join("rebus.yaml");
        std::fs::write(&path, "puzzle: {}\n").unwrap();
        let err = ConfigLoader::new().file(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "yaml"));
    }

    #[test]
    fn test_profile_names() {
        assert_eq!(profile_name("prod"), "production");
        assert_eq!(profile_name(" Dev "), "development");
        assert_eq!(profile_name(""), "development");
        assert_eq!(profile_name("staging"), "staging");
    }
}
