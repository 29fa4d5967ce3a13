//! Identity matching for component routing.
//!
//! Every component handler declares an [`IdentitySpec`] describing which
//! custom ids it answers to. When a component interaction arrives, the
//! registry walks its handlers in registration order and picks the **first**
//! one whose spec matches the interaction's custom id:
//!
//! | Spec                        | Matches when                     |
//! |-----------------------------|----------------------------------|
//! | [`IdentitySpec::Exact`]     | `token == value`                 |
//! | [`IdentitySpec::Prefix`]    | `token.starts_with(value)`       |
//! | [`IdentitySpec::Suffix`]    | `token.ends_with(value)`         |
//! | [`IdentitySpec::Contains`]  | `token.contains(value)`          |
//! | [`IdentitySpec::Pattern`]   | the regex finds a match in token |
//!
//! There is no priority system: insertion order is the only tie-break.
//!
//! # Example
//!
//! ```rust
//! use rebus_framework::matcher::{IdentitySpec, find_first};
//!
//! let specs = [
//!     (IdentitySpec::prefix("hint:"), "hint"),
//!     (IdentitySpec::contains(":"), "fallback"),
//! ];
//! let hit = find_first(specs.iter().map(|(s, v)| (s, *v)), "hint:42");
//! assert_eq!(hit, Some("hint"));
//! ```

use std::fmt;

use regex::Regex;

use crate::error::{DiscoveryError, DiscoveryResult};

/// The matching rule attached to a component handler.
#[derive(Debug, Clone)]
pub enum IdentitySpec {
    /// Matches one custom id exactly.
    Exact(String),
    /// Matches custom ids starting with the value.
    Prefix(String),
    /// Matches custom ids ending with the value.
    Suffix(String),
    /// Matches custom ids containing the value.
    Contains(String),
    /// Matches custom ids the regex finds a match in.
    Pattern(Regex),
}

impl IdentitySpec {
    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact(value.into())
    }

    pub fn prefix(value: impl Into<String>) -> Self {
        Self::Prefix(value.into())
    }

    pub fn suffix(value: impl Into<String>) -> Self {
        Self::Suffix(value.into())
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self::Contains(value.into())
    }

    /// Compiles a pattern spec.
    pub fn pattern(pattern: &str) -> DiscoveryResult<Self> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|e| DiscoveryError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    /// Returns `true` if `token` satisfies this spec.
    ///
    /// Each call is independent; pattern specs keep no search state between
    /// calls.
    pub fn matches(&self, token: &str) -> bool {
        match self {
            Self::Exact(value) => token == value,
            Self::Prefix(value) => token.starts_with(value.as_str()),
            Self::Suffix(value) => token.ends_with(value.as_str()),
            Self::Contains(value) => token.contains(value.as_str()),
            Self::Pattern(re) => re.is_match(token),
        }
    }

    /// Stable key identifying this spec in the registry.
    pub fn key(&self) -> IdentityKey {
        match self {
            Self::Exact(value) => IdentityKey::Exact(value.clone()),
            Self::Prefix(value) => IdentityKey::Prefix(value.clone()),
            Self::Suffix(value) => IdentityKey::Suffix(value.clone()),
            Self::Contains(value) => IdentityKey::Contains(value.clone()),
            Self::Pattern(re) => IdentityKey::Pattern(re.as_str().to_string()),
        }
    }
}

/// Registry key of an [`IdentitySpec`]: the rule kind together with its
/// value, so two specs only collide when they match the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Pattern(String),
}

impl fmt::Display for IdentitySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(value) => f.write_str(value),
            Self::Prefix(value) => write!(f, "startsWith({value})"),
            Self::Suffix(value) => write!(f, "endsWith({value})"),
            Self::Contains(value) => write!(f, "includes({value})"),
            Self::Pattern(re) => write!(f, "matches(/{}/)", re.as_str()),
        }
    }
}

impl PartialEq for IdentitySpec {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for IdentitySpec {}

impl From<&str> for IdentitySpec {
    fn from(value: &str) -> Self {
        Self::exact(value)
    }
}

impl From<String> for IdentitySpec {
    fn from(value: String) -> Self {
        Self::Exact(value)
    }
}

/// Returns the value attached to the first spec matching `token`.
pub fn find_first<'a, T>(
    entries: impl IntoIterator<Item = (&'a IdentitySpec, T)>,
    token: &str,
) -> Option<T> {
    entries
        .into_iter()
        .find_map(|(spec, value)| spec.matches(token).then_some(value))
}
