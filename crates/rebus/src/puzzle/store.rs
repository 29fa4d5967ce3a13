//! Puzzle persistence seam.
//!
//! Handlers reach persisted puzzles, plays and players through the
//! [`PuzzleStore`] trait, shared with them as `dyn PuzzleStore` in the
//! runtime's services. [`InMemoryPuzzleStore`] keeps everything in process.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use time::Date;
use tracing::info;

use rebus_core::{HandlerError, User};

// ─── Records ──────────────────────────────────────────────────────────────────

/// The puzzle of one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyPuzzle {
    pub day: Date,
    pub theme: String,
    pub emojis: String,
    pub answer: String,
}

/// Where a player stands on one day's puzzle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayStatus {
    #[default]
    InProgress,
    Solved,
    Failed,
}

/// One player's attempt at one day's puzzle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Play {
    pub guesses: u32,
    pub hints_used: u32,
    pub status: PlayStatus,
}

/// Score and streak of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub user_id: String,
    pub name: String,
    pub score: i64,
    pub streak: u32,
}

impl Player {
    pub fn new(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            score: 0,
            streak: 0,
        }
    }
}

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store cannot be reached.
    #[error("puzzle store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for HandlerError {
    fn from(e: StoreError) -> Self {
        HandlerError::External(Box::new(e))
    }
}

// ─── PuzzleStore ──────────────────────────────────────────────────────────────

#[async_trait]
pub trait PuzzleStore: Send + Sync {
    async fn puzzle(&self, day: Date) -> StoreResult<Option<DailyPuzzle>>;

    /// Stores a puzzle, replacing any puzzle already set for its day.
    async fn save_puzzle(&self, puzzle: DailyPuzzle) -> StoreResult<()>;

    /// All stored puzzles, oldest first.
    async fn puzzles(&self) -> StoreResult<Vec<DailyPuzzle>>;

    /// Returns the player record, creating it on first use.
    async fn player(&self, user: &User) -> StoreResult<Player>;

    async fn save_player(&self, player: &Player) -> StoreResult<()>;

    async fn play(&self, user_id: &str, day: Date) -> StoreResult<Option<Play>>;

    async fn save_play(&self, user_id: &str, day: Date, play: Play) -> StoreResult<()>;

    /// Hint allowance set from `/setup hint`, overriding the configured one.
    async fn hints_allowed(&self) -> StoreResult<Option<u32>>;

    async fn set_hints_allowed(&self, amount: u32) -> StoreResult<()>;

    /// Releases connections. Called once on shutdown.
    async fn close(&self) {}
}

// ─── InMemoryPuzzleStore ──────────────────────────────────────────────────────

#[derive(Default)]
struct Tables {
    puzzles: BTreeMap<Date, DailyPuzzle>,
    players: HashMap<String, Player>,
    plays: HashMap<(String, Date), Play>,
    hints_allowed: Option<u32>,
}

/// Process-local [`PuzzleStore`]; contents are lost on exit.
#[derive(Default)]
pub struct InMemoryPuzzleStore {
    tables: RwLock<Tables>,
}

impl InMemoryPuzzleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a puzzle (builder pattern).
    pub fn with_puzzle(self, puzzle: DailyPuzzle) -> Self {
        self.tables.write().puzzles.insert(puzzle.day, puzzle);
        self
    }
}

#[async_trait]
impl PuzzleStore for InMemoryPuzzleStore {
    async fn puzzle(&self, day: Date) -> StoreResult<Option<DailyPuzzle>> {
        Ok(self.tables.read().puzzles.get(&day).cloned())
    }

    async fn save_puzzle(&self, puzzle: DailyPuzzle) -> StoreResult<()> {
        self.tables.write().puzzles.insert(puzzle.day, puzzle);
        Ok(())
    }

    async fn puzzles(&self) -> StoreResult<Vec<DailyPuzzle>> {
        Ok(self.tables.read().puzzles.values().cloned().collect())
    }

    async fn player(&self, user: &User) -> StoreResult<Player> {
        let mut tables = self.tables.write();
        let player = tables
            .players
            .entry(user.id.clone())
            .or_insert_with(|| Player::new(user));
        player.name.clone_from(&user.name);
        Ok(player.clone())
    }

    async fn save_player(&self, player: &Player) -> StoreResult<()> {
        self.tables
            .write()
            .players
            .insert(player.user_id.clone(), player.clone());
        Ok(())
    }

    async fn play(&self, user_id: &str, day: Date) -> StoreResult<Option<Play>> {
        Ok(self
            .tables
            .read()
            .plays
            .get(&(user_id.to_string(), day))
            .copied())
    }

    async fn save_play(&self, user_id: &str, day: Date, play: Play) -> StoreResult<()> {
        self.tables
            .write()
            .plays
            .insert((user_id.to_string(), day), play);
        Ok(())
    }

    async fn hints_allowed(&self) -> StoreResult<Option<u32>> {
        Ok(self.tables.read().hints_allowed)
    }

    async fn set_hints_allowed(&self, amount: u32) -> StoreResult<()> {
        self.tables.write().hints_allowed = Some(amount);
        Ok(())
    }

    async fn close(&self) {
        let tables = self.tables.read();
        info!(
            puzzles = tables.puzzles.len(),
            players = tables.players.len(),
            "Closing in-memory puzzle store"
        );
    }
}

impl std::fmt::Debug for InMemoryPuzzleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("InMemoryPuzzleStore")
            .field("puzzles", &tables.puzzles.len())
            .field("players", &tables.players.len())
            .field("plays", &tables.plays.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[tokio::test]
    async fn test_player_is_created_once() {
        let store = InMemoryPuzzleStore::new();
        let mut player = store.player(&User::new("u-1", "alice")).await.unwrap();
        player.score = 10;
        store.save_player(&player).await.unwrap();

        let again = store.player(&User::new("u-1", "alice2")).await.unwrap();
        assert_eq!(again.score, 10);
        assert_eq!(again.name, "alice2");
    }

    #[tokio::test]
    async fn test_puzzles_are_listed_by_day() {
        let puzzle = |day, answer: &str| DailyPuzzle {
            day,
            theme: "Space".into(),
            emojis: "🚀🌕".into(),
            answer: answer.into(),
        };
        let store = InMemoryPuzzleStore::new()
            .with_puzzle(puzzle(date!(2026 - 10 - 20), "comet"))
            .with_puzzle(puzzle(date!(2026 - 10 - 19), "moon landing"));

        let answers: Vec<_> = store
            .puzzles()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.answer)
            .collect();
        assert_eq!(answers, vec!["moon landing", "comet"]);
        assert!(store.play("u-1", date!(2026 - 10 - 19)).await.unwrap().is_none());
    }
}
