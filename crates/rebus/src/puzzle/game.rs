//! Guess and hint rules.
//!
//! Pure state transitions over a [`Play`] and a [`Player`]; the handlers load
//! the records, apply a rule and save whatever changed.

use rebus_runtime::PuzzleConfig;

use super::store::{DailyPuzzle, Play, PlayStatus, Player};

/// Result of one `/puzzle guess`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessOutcome {
    Correct { reward: u32, streak: u32 },
    Incorrect { guess: u32, max: u32 },
    GameOver { penalty: u32, lost_streak: u32 },
    AlreadySolved,
    AlreadyOver,
}

/// Result of a hint request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintOutcome {
    Hint { text: String, remaining: u32 },
    Exhausted,
    Finished,
}

/// Guesses match ignoring case and surrounding whitespace.
pub fn is_correct(puzzle: &DailyPuzzle, guess: &str) -> bool {
    guess.trim().to_lowercase() == puzzle.answer.trim().to_lowercase()
}

pub fn apply_guess(
    puzzle: &DailyPuzzle,
    play: &mut Play,
    player: &mut Player,
    guess: &str,
    config: &PuzzleConfig,
) -> GuessOutcome {
    match play.status {
        PlayStatus::Solved => return GuessOutcome::AlreadySolved,
        PlayStatus::Failed => return GuessOutcome::AlreadyOver,
        PlayStatus::InProgress => {}
    }

    play.guesses += 1;

    if is_correct(puzzle, guess) {
        play.status = PlayStatus::Solved;
        player.score += i64::from(config.correct_reward);
        player.streak += 1;
        return GuessOutcome::Correct {
            reward: config.correct_reward,
            streak: player.streak,
        };
    }

    if play.guesses >= config.max_guesses {
        play.status = PlayStatus::Failed;
        player.score -= i64::from(config.game_over_penalty);
        let lost_streak = std::mem::take(&mut player.streak);
        return GuessOutcome::GameOver {
            penalty: config.game_over_penalty,
            lost_streak,
        };
    }

    GuessOutcome::Incorrect {
        guess: play.guesses,
        max: config.max_guesses,
    }
}

/// Reveals the next hint if the allowance permits.
pub fn next_hint(puzzle: &DailyPuzzle, play: &mut Play, allowed: u32) -> HintOutcome {
    if play.status != PlayStatus::InProgress {
        return HintOutcome::Finished;
    }
    if play.hints_used >= allowed {
        return HintOutcome::Exhausted;
    }

    let text = hint_text(puzzle, play.hints_used);
    play.hints_used += 1;
    HintOutcome::Hint {
        text,
        remaining: allowed - play.hints_used,
    }
}

fn hint_text(puzzle: &DailyPuzzle, index: u32) -> String {
    let answer = puzzle.answer.trim();
    match index {
        0 => {
            let words = answer.split_whitespace().count();
            let letters = answer.chars().filter(|c| c.is_alphanumeric()).count();
            if words > 1 {
                format!("The answer is {words} words with {letters} letters in total.")
            } else {
                format!("The answer is a single word of {letters} letters.")
            }
        }
        1 => match answer.chars().next() {
            Some(first) => format!("It starts with **{}**.", first.to_uppercase()),
            None => "It starts with nothing at all.".to_string(),
        },
        _ => match answer.chars().last() {
            Some(last) => format!("It ends with **{}**.", last.to_uppercase()),
            None => "It ends with nothing at all.".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use rebus_core::User;

    fn puzzle() -> DailyPuzzle {
        DailyPuzzle {
            day: date!(2026 - 10 - 19),
            theme: "Space".into(),
            emojis: "🌑👨‍🚀🚶".into(),
            answer: "Moon Landing".into(),
        }
    }

    fn player() -> Player {
        let mut player = Player::new(&User::new("u-1", "alice"));
        player.streak = 4;
        player.score = 20;
        player
    }

    #[test]
    fn test_correct_guess_rewards_and_extends_streak() {
        let (mut play, mut player) = (Play::default(), player());
        let outcome = apply_guess(&puzzle(), &mut play, &mut player, " moon landing ", &PuzzleConfig::default());

        assert_eq!(outcome, GuessOutcome::Correct { reward: 10, streak: 5 });
        assert_eq!(player.score, 30);
        assert_eq!(play.status, PlayStatus::Solved);
        assert_eq!(
            apply_guess(&puzzle(), &mut play, &mut player, "moon landing", &PuzzleConfig::default()),
            GuessOutcome::AlreadySolved
        );
        assert_eq!(player.score, 30);
    }

    #[test]
    fn test_running_out_of_guesses() {
        let config = PuzzleConfig::default();
        let (mut play, mut player) = (Play::default(), player());

        for n in 1..config.max_guesses {
            assert_eq!(
                apply_guess(&puzzle(), &mut play, &mut player, "mars", &config),
                GuessOutcome::Incorrect { guess: n, max: 5 }
            );
        }
        let outcome = apply_guess(&puzzle(), &mut play, &mut player, "mars", &config);
        assert_eq!(outcome, GuessOutcome::GameOver { penalty: 3, lost_streak: 4 });
        assert_eq!(player.score, 17);
        assert_eq!(player.streak, 0);

        // no further penalty once the game is over
        assert_eq!(
            apply_guess(&puzzle(), &mut play, &mut player, "moon landing", &config),
            GuessOutcome::AlreadyOver
        );
        assert_eq!(player.score, 17);
    }

    #[test]
    fn test_hints_are_capped() {
        let mut play = Play::default();
        let first = next_hint(&puzzle(), &mut play, 2);
        assert_eq!(
            first,
            HintOutcome::Hint {
                text: "The answer is 2 words with 11 letters in total.".into(),
                remaining: 1
            }
        );
        assert!(matches!(
            next_hint(&puzzle(), &mut play, 2),
            HintOutcome::Hint { remaining: 0, .. }
        ));
        assert_eq!(next_hint(&puzzle(), &mut play, 2), HintOutcome::Exhausted);
        assert_eq!(play.hints_used, 2);
    }

    #[test]
    fn test_no_hints_after_solving() {
        let mut play = Play {
            status: PlayStatus::Solved,
            ..Default::default()
        };
        assert_eq!(next_hint(&puzzle(), &mut play, 3), HintOutcome::Finished);
    }
}
