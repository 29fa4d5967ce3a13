//! Guild-scoped `/setup`.
//!
//! The command is only registered in the scopes listed in
//! `bot.dev_scope_ids`, so it cannot be a link-time registration; the binary
//! adds [`setup_source`] next to the linked source instead.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use rebus_core::{
    AutocompleteChoice, CommandSpec, HandlerError, HandlerReply, HandlerResult, OptionKind,
    OptionSpec, Permissions, reply,
};
use rebus_framework::{
    BoxedCommand, CommandDefinition, CommandHandler, CommandScope, HandlerContext, TableSource,
};
use rebus_runtime::config::validation::MAX_HINTS;

use super::store::{DailyPuzzle, PuzzleStore};
use super::{THEMES, parse_day, today};

/// Most choices an autocomplete answer may carry.
pub const MAX_CHOICES: usize = 25;

/// Source holding `/setup` for the given scopes.
pub fn setup_source(scope_ids: Vec<String>) -> TableSource {
    TableSource::new("setup").with_command(CommandDefinition::new(
        "rebus::puzzle::setup",
        move || Ok(Arc::new(SetupCommand::new(scope_ids.clone())) as BoxedCommand),
    ))
}

/// Themes containing `query`, ignoring case.
pub fn matching_themes(query: &str) -> Vec<&'static str> {
    let query = query.trim().to_lowercase();
    THEMES
        .iter()
        .copied()
        .filter(|theme| theme.to_lowercase().contains(&query))
        .take(MAX_CHOICES)
        .collect()
}

#[derive(Debug, Clone)]
pub struct SetupCommand {
    spec: CommandSpec,
    scope_ids: Vec<String>,
}

impl SetupCommand {
    pub fn new(scope_ids: Vec<String>) -> Self {
        let use_custom = OptionSpec::subcommand("use-custom", "Set a hand-made puzzle")
            .option(
                OptionSpec::string("theme", "Puzzle theme")
                    .required()
                    .autocomplete(),
            )
            .option(OptionSpec::string("emojis", "The emoji clue").required())
            .option(OptionSpec::string("answer", "The answer").required())
            .option(OptionSpec::string("day", "Day as YYYY-MM-DD, today if omitted"));

        let spec = CommandSpec::new("setup", "Configure the daily puzzle")
            .option(
                OptionSpec::group("themes", "Manage puzzles")
                    .option(use_custom)
                    .option(OptionSpec::subcommand("list", "List stored puzzles")),
            )
            .option(
                OptionSpec::subcommand("hint", "Set how many hints players get").option(
                    OptionSpec::new(OptionKind::Integer, "amount", "Hints per puzzle")
                        .required()
                        .max_value(f64::from(MAX_HINTS)),
                ),
            )
            .permissions(Permissions::MANAGE_GUILD);

        Self { spec, scope_ids }
    }
}

#[async_trait]
impl CommandHandler for SetupCommand {
    fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    fn scope(&self) -> CommandScope {
        CommandScope::Scoped(self.scope_ids.clone())
    }

    async fn execute(&self, ctx: &HandlerContext) -> HandlerResult<HandlerReply> {
        let store = ctx.service::<dyn PuzzleStore>()?;
        let data = ctx
            .command()
            .ok_or(HandlerError::Unsupported("non-command interaction"))?;

        match (data.subcommand_group(), data.subcommand()) {
            (Some("themes"), Some("use-custom")) => {
                let day = match data.string("day") {
                    Some(raw) => match parse_day(raw) {
                        Some(day) => day,
                        None => {
                            return Ok(reply(
                                format!("❌ `{raw}` is not a day in YYYY-MM-DD form."),
                                false,
                            ));
                        }
                    },
                    None => today(),
                };
                let puzzle = DailyPuzzle {
                    day,
                    theme: ctx.required_string("theme")?.to_string(),
                    emojis: ctx.required_string("emojis")?.to_string(),
                    answer: ctx.required_string("answer")?.trim().to_string(),
                };
                info!(%day, theme = %puzzle.theme, user = ctx.user().tag(), "Custom puzzle set");
                let theme = puzzle.theme.clone();
                store.save_puzzle(puzzle).await?;
                Ok(reply(format!("✅ Puzzle for {day} set ({theme})."), false))
            }
            (Some("themes"), Some("list")) => {
                let puzzles = store.puzzles().await?;
                if puzzles.is_empty() {
                    return Ok(reply("No puzzles stored yet.", false));
                }
                let lines: Vec<String> = puzzles
                    .iter()
                    .map(|p| format!("`{}` {} {}", p.day, p.theme, p.emojis))
                    .collect();
                Ok(reply(lines.join("\n"), false))
            }
            (None, Some("hint")) => {
                let amount = data
                    .integer("amount")
                    .ok_or_else(|| HandlerError::MissingOption("amount".into()))?;
                let Some(amount) = u32::try_from(amount).ok().filter(|a| *a <= MAX_HINTS) else {
                    return Ok(reply(
                        format!("❌ Hints must be between 0 and {MAX_HINTS}."),
                        false,
                    ));
                };
                store.set_hints_allowed(amount).await?;
                Ok(reply(format!("✅ Players now get {amount} hints per puzzle."), false))
            }
            _ => Err(HandlerError::MissingOption("subcommand".into())),
        }
    }

    async fn autocomplete(&self, ctx: &HandlerContext) -> HandlerResult<()> {
        let focused = ctx.command().and_then(|data| data.focused());
        let Some(option) = focused.filter(|o| o.name == "theme") else {
            return Err(HandlerError::Unsupported("autocomplete for this option"));
        };
        let query = option.value.as_ref().and_then(Value::as_str).unwrap_or_default();

        let choices: Vec<AutocompleteChoice> = matching_themes(query)
            .into_iter()
            .map(AutocompleteChoice::text)
            .collect();
        ctx.respond_autocomplete(&choices).await
    }
}

#[cfg(test)]
mod tests {
    use rebus_core::{CommandData, CommandOptionValue, Interaction, InteractionKind, TracingTracker, User};
    use rebus_framework::{HandlerRegistry, HandlerSource, InteractionDispatcher, Services};
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::puzzle::InMemoryPuzzleStore;
    use crate::stdio::StdioPlatform;

    fn dispatcher(store: Arc<InMemoryPuzzleStore>) -> (InteractionDispatcher, UnboundedReceiver<String>) {
        let registry = Arc::new(HandlerRegistry::new());
        registry.discover(&setup_source(vec!["G1".into()]));
        let (platform, out) = StdioPlatform::new();
        let dispatcher = InteractionDispatcher::new(registry, Arc::new(platform), Arc::new(TracingTracker))
            .with_services(Arc::new(Services::new().with::<dyn PuzzleStore>(store)));
        (dispatcher, out)
    }

    fn setup(kind: fn(CommandData) -> InteractionKind, guild: &str, option: CommandOptionValue) -> Interaction {
        let data = CommandData::new("G1:setup", "setup").with_option(option);
        Interaction::new("i-1", kind(data), User::new("admin", "admin"), Some(guild.into()))
    }

    #[test]
    fn test_theme_matching() {
        assert_eq!(matching_themes("sp"), vec!["Space"]);
        assert_eq!(matching_themes("O").len(), 9);
        assert_eq!(matching_themes("").len(), THEMES.len());
        assert!(matching_themes("zzz").is_empty());
    }

    #[test]
    fn test_source_scopes_setup() {
        let source = setup_source(vec!["G1".into()]);
        let command = source.commands()[0].construct().unwrap();
        assert_eq!(command.name(), "setup");
        assert_eq!(command.scope(), CommandScope::scoped(["G1"]));
    }

    #[tokio::test]
    async fn test_use_custom_saves_puzzle() {
        let store = Arc::new(InMemoryPuzzleStore::new());
        let (dispatcher, mut out) = dispatcher(store.clone());

        let option = CommandOptionValue::nested(
            "themes",
            vec![CommandOptionValue::nested(
                "use-custom",
                vec![
                    CommandOptionValue::value("theme", "Space"),
                    CommandOptionValue::value("emojis", "🌑👨‍🚀"),
                    CommandOptionValue::value("answer", " Moon Landing "),
                    CommandOptionValue::value("day", "2026-12-24"),
                ],
            )],
        );
        dispatcher
            .dispatch(Arc::new(setup(InteractionKind::Command, "G1", option)))
            .await;

        assert!(out.recv().await.unwrap().contains("Puzzle for 2026-12-24 set"));
        let puzzle = store.puzzle(time::macros::date!(2026 - 12 - 24)).await.unwrap().unwrap();
        assert_eq!(puzzle.answer, "Moon Landing");
    }

    #[tokio::test]
    async fn test_hint_amount_is_capped() {
        let store = Arc::new(InMemoryPuzzleStore::new());
        let (dispatcher, mut out) = dispatcher(store.clone());

        let amount = |n: i64| CommandOptionValue::nested("hint", vec![CommandOptionValue::value("amount", n)]);
        dispatcher
            .dispatch(Arc::new(setup(InteractionKind::Command, "G1", amount(7))))
            .await;
        assert!(out.recv().await.unwrap().contains("between 0 and 3"));
        assert_eq!(store.hints_allowed().await.unwrap(), None);

        dispatcher
            .dispatch(Arc::new(setup(InteractionKind::Command, "G1", amount(1))))
            .await;
        out.recv().await.unwrap();
        assert_eq!(store.hints_allowed().await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_theme_autocomplete() {
        let (dispatcher, mut out) = dispatcher(Arc::new(InMemoryPuzzleStore::new()));
        let option = CommandOptionValue::nested(
            "themes",
            vec![CommandOptionValue::nested(
                "use-custom",
                vec![CommandOptionValue::value("theme", "mo").focused()],
            )],
        );
        dispatcher
            .dispatch(Arc::new(setup(InteractionKind::Autocomplete, "G1", option)))
            .await;

        let line: Value = serde_json::from_str(&out.recv().await.unwrap()).unwrap();
        let names: Vec<&str> = line["choices"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["name"].as_str())
            .collect();
        assert_eq!(names, vec!["Movies", "Famous People"]);
    }

    #[tokio::test]
    async fn test_setup_is_missing_outside_its_scope() {
        let (dispatcher, mut out) = dispatcher(Arc::new(InMemoryPuzzleStore::new()));
        let option = CommandOptionValue::nested("themes", vec![CommandOptionValue::nested("list", vec![])]);
        dispatcher
            .dispatch(Arc::new(setup(InteractionKind::Command, "G2", option)))
            .await;
        assert!(out.recv().await.unwrap().contains("does not exist"));
    }
}
