//! `/puzzle start|guess|hint` and the `hint:` button.

use std::sync::Arc;

use async_trait::async_trait;
use time::Date;
use tracing::debug;

use rebus_core::{
    CommandSpec, Embed, HandlerError, HandlerReply, HandlerResult, OptionSpec, Permissions, colors,
    reply, reply_embed,
};
use rebus_framework::{
    CommandHandler, HandlerContext, IdentitySpec, component, register_command, register_component,
};
use rebus_runtime::PuzzleConfig;

use super::game::{self, GuessOutcome, HintOutcome};
use super::store::{DailyPuzzle, Play, PuzzleStore};
use super::{parse_day, today};

pub const NO_PUZZLE_TEXT: &str =
    "❌ Sorry, there isn't a puzzle generated right now. Please check back later.";

pub const NOT_STARTED_TEXT: &str =
    "You haven't started today's puzzle. Use `/puzzle start` to begin.";

pub const EXPIRED_HINT_TEXT: &str = "This hint button belongs to an earlier puzzle.";

/// Custom id prefix of hint buttons; the puzzle day follows it.
pub const HINT_PREFIX: &str = "hint:";

/// Custom id of the hint button for a day.
pub fn hint_button_id(day: Date) -> String {
    format!("{HINT_PREFIX}{day}")
}

register_command!(PUZZLE_COMMAND, PuzzleCommand::new());

register_component!(
    HINT_BUTTON,
    component(IdentitySpec::prefix(HINT_PREFIX), |ctx: HandlerContext| async move {
        let raw = ctx
            .custom_id()
            .and_then(|id| id.strip_prefix(HINT_PREFIX))
            .unwrap_or_default();
        match parse_day(raw) {
            Some(day) if day == today() => hint(&ctx, day).await,
            _ => Ok(reply(EXPIRED_HINT_TEXT, false)),
        }
    })
);

/// The global `/puzzle` command.
#[derive(Debug, Clone)]
pub struct PuzzleCommand {
    spec: CommandSpec,
}

impl PuzzleCommand {
    pub fn new() -> Self {
        let spec = CommandSpec::new("puzzle", "Play today's emoji puzzle")
            .option(OptionSpec::subcommand("start", "Show today's puzzle"))
            .option(
                OptionSpec::subcommand("guess", "Guess the answer").option(
                    OptionSpec::string("answer", "What the emojis spell out").required(),
                ),
            )
            .option(OptionSpec::subcommand("hint", "Reveal a hint"))
            .permissions(Permissions::NONE)
            .dm_permission(false);
        Self { spec }
    }
}

impl Default for PuzzleCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandHandler for PuzzleCommand {
    fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    async fn execute(&self, ctx: &HandlerContext) -> HandlerResult<HandlerReply> {
        let subcommand = ctx.command().and_then(|data| data.subcommand());
        match subcommand {
            Some("start") => start(ctx).await,
            Some("guess") => {
                let answer = ctx.required_string("answer")?;
                guess(ctx, answer).await
            }
            Some("hint") => hint(ctx, today()).await,
            _ => Err(HandlerError::MissingOption("subcommand".into())),
        }
    }
}

fn services(ctx: &HandlerContext) -> HandlerResult<(Arc<dyn PuzzleStore>, Arc<PuzzleConfig>)> {
    Ok((ctx.service::<dyn PuzzleStore>()?, ctx.service::<PuzzleConfig>()?))
}

fn puzzle_embed(puzzle: &DailyPuzzle, play: &Play, config: &PuzzleConfig) -> Embed {
    Embed::new()
        .title("Today's Puzzle")
        .description(format!(
            "{}\n\nGuesses: {}/{}",
            puzzle.emojis, play.guesses, config.max_guesses
        ))
        .color(colors::AQUA)
        .footer(format!("Theme: {}", puzzle.theme))
}

async fn start(ctx: &HandlerContext) -> HandlerResult<HandlerReply> {
    let (store, config) = services(ctx)?;
    let day = today();
    let Some(puzzle) = store.puzzle(day).await? else {
        return Ok(reply(NO_PUZZLE_TEXT, false));
    };

    let user_id = &ctx.user().id;
    let play = match store.play(user_id, day).await? {
        Some(play) => play,
        None => {
            debug!(user = %user_id, %day, "Starting puzzle");
            let play = Play::default();
            store.save_play(user_id, day, play).await?;
            play
        }
    };

    Ok(reply_embed(puzzle_embed(&puzzle, &play, &config), false))
}

async fn guess(ctx: &HandlerContext, answer: &str) -> HandlerResult<HandlerReply> {
    let (store, config) = services(ctx)?;
    let day = today();
    let Some(puzzle) = store.puzzle(day).await? else {
        return Ok(reply(NO_PUZZLE_TEXT, false));
    };
    let Some(mut play) = store.play(&ctx.user().id, day).await? else {
        return Ok(reply(NOT_STARTED_TEXT, false));
    };

    let mut player = store.player(ctx.user()).await?;
    let outcome = game::apply_guess(&puzzle, &mut play, &mut player, answer, &config);

    if !matches!(outcome, GuessOutcome::AlreadySolved | GuessOutcome::AlreadyOver) {
        store.save_play(&player.user_id, day, play).await?;
        store.save_player(&player).await?;
    }

    Ok(match outcome {
        GuessOutcome::Correct { reward, streak } => reply_embed(
            Embed::new()
                .title("Congratulations! 🎉")
                .description(format!(
                    "**{}** solved today's puzzle in {} guesses!\n+{reward} points, streak: {streak}",
                    player.name, play.guesses
                ))
                .color(colors::GOLD),
            true,
        ),
        GuessOutcome::Incorrect { guess, max } => reply_embed(
            Embed::new()
                .title("Not quite!")
                .description(format!(
                    "`{}` is not the answer.\nNeed help? Use `/puzzle hint`.",
                    answer.trim()
                ))
                .color(colors::RED)
                .footer(format!("Guess {guess}/{max}")),
            false,
        ),
        GuessOutcome::GameOver { penalty, lost_streak } => reply_embed(
            Embed::new()
                .title("Game Over")
                .description(format!(
                    "The answer was **{}**.\n-{penalty} points, streak of {lost_streak} lost.",
                    puzzle.answer
                ))
                .color(colors::RED),
            false,
        ),
        GuessOutcome::AlreadySolved => reply("You already solved today's puzzle!", false),
        GuessOutcome::AlreadyOver => reply("You're out of guesses for today.", false),
    })
}

async fn hint(ctx: &HandlerContext, day: Date) -> HandlerResult<HandlerReply> {
    let (store, config) = services(ctx)?;
    let Some(puzzle) = store.puzzle(day).await? else {
        return Ok(reply(NO_PUZZLE_TEXT, false));
    };
    let Some(mut play) = store.play(&ctx.user().id, day).await? else {
        return Ok(reply(NOT_STARTED_TEXT, false));
    };

    let allowed = store
        .hints_allowed()
        .await?
        .unwrap_or(config.hints_allowed);

    Ok(match game::next_hint(&puzzle, &mut play, allowed) {
        HintOutcome::Hint { text, remaining } => {
            store.save_play(&ctx.user().id, day, play).await?;
            reply_embed(
                Embed::new()
                    .title("🔎 Hint")
                    .description(text)
                    .color(colors::YELLOW)
                    .footer(format!("Hints left: {remaining}")),
                false,
            )
        }
        HintOutcome::Exhausted => reply("You have no hints left for today.", false),
        HintOutcome::Finished => reply("Today's puzzle is already over for you.", false),
    })
}
