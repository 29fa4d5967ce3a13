//! The daily emoji puzzle.
//!
//! - [`store`]: the [`PuzzleStore`] seam and its in-memory implementation
//! - [`game`]: guess scoring and hint rules
//! - [`commands`]: the global `/puzzle` command and the `hint:` button,
//!   registered at link time
//! - [`setup`]: the guild-scoped `/setup` command, built from configuration
//!   by [`setup_source`]
//!
//! Handlers find the store as `dyn PuzzleStore` and the settings as
//! [`PuzzleConfig`](rebus_runtime::PuzzleConfig) in the runtime's services.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

pub mod commands;
pub mod game;
pub mod setup;
pub mod store;

pub use game::{GuessOutcome, HintOutcome};
pub use setup::{SetupCommand, setup_source};
pub use store::{
    DailyPuzzle, InMemoryPuzzleStore, Play, PlayStatus, Player, PuzzleStore, StoreError,
    StoreResult,
};

/// Themes offered by `/setup themes` autocomplete.
pub const THEMES: &[&str] = &[
    "Movies",
    "Animals",
    "Food",
    "Countries",
    "Sports",
    "Famous People",
    "Household Objects",
    "Video Games",
    "Mythology",
    "Science",
    "History",
    "Music",
    "Literature",
    "Art",
    "Space",
];

/// `YYYY-MM-DD`, used for puzzle days in options and custom ids.
pub const DAY_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// The current puzzle day (UTC).
pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Parses a `YYYY-MM-DD` day.
pub fn parse_day(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), DAY_FORMAT).ok()
}
