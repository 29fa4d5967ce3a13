//! In-memory handler registry.
//!
//! Commands are partitioned into a global table and one table per scope id;
//! components live in a single ordered table keyed by their identity. Both
//! are guarded by `parking_lot` reader-writer locks: lookups take the shared
//! side and clone an `Arc` handle out, so no lock is held while a handler
//! runs. Handlers are constructed before any lock is taken; installing them
//! holds both exclusive sides at once (commands first, then components), so a
//! lookup sees either the old tables or the new ones, never an empty middle.
//!
//! ```text
//! HandlerRegistry
//! ├── CommandRegistry
//! │   ├── global:  name → handler
//! │   └── scoped:  scope id → (name → handler)
//! └── ComponentRegistry
//!     └── (rule kind, value) → handler   (insertion order = match priority)
//! ```

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::discovery::HandlerSource;
use crate::handler::{BoxedCommand, BoxedComponent, CommandScope};
use crate::matcher::{IdentityKey, find_first};

/// Returns `word` with an `s` appended unless `count` is one.
pub(crate) fn pluralize(count: usize, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

// =============================================================================
// CommandRegistry
// =============================================================================

#[derive(Default)]
struct CommandTable {
    global: IndexMap<String, BoxedCommand>,
    scoped: IndexMap<String, IndexMap<String, BoxedCommand>>,
}

impl CommandTable {
    /// Inserts a handler, returning `false` if it was not cached.
    fn insert(&mut self, handler: BoxedCommand) -> bool {
        let name = handler.name().to_string();
        match handler.scope() {
            CommandScope::Global => {
                if self.scoped.values().any(|t| t.contains_key(&name)) {
                    debug!(command = %name, "Global command shares its name with a scoped command");
                }
                self.global.insert(name, handler);
                true
            }
            CommandScope::Scoped(ids) if ids.is_empty() => {
                warn!(
                    command = %name,
                    context = "caching",
                    "Scoped command '{name}' has no scope ids specified. It will not be cached for any scope."
                );
                false
            }
            CommandScope::Scoped(ids) => {
                if self.global.contains_key(&name) {
                    debug!(command = %name, "Scoped command shadows a global command");
                }
                for id in ids {
                    self.scoped
                        .entry(id)
                        .or_default()
                        .insert(name.clone(), handler.clone());
                }
                true
            }
        }
    }

    fn len(&self) -> usize {
        self.global.len() + self.scoped.values().map(IndexMap::len).sum::<usize>()
    }
}

/// Command handlers keyed by scope and name.
#[derive(Default)]
pub struct CommandRegistry {
    table: RwLock<CommandTable>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches a handler according to its scope.
    ///
    /// Re-inserting a name into the same partition replaces the previous
    /// handler. Returns `false` when a scoped handler lists no scope ids.
    pub fn insert(&self, handler: BoxedCommand) -> bool {
        self.table.write().insert(handler)
    }

    /// Resolves the handler for an invocation.
    ///
    /// When `is_global` is set only the global partition is consulted.
    /// Otherwise the scope's partition is tried first, then the global one.
    pub fn get(&self, name: &str, scope_id: Option<&str>, is_global: bool) -> Option<BoxedCommand> {
        let table = self.table.read();
        if is_global {
            return table.global.get(name).cloned();
        }
        scope_id
            .and_then(|id| table.scoped.get(id))
            .and_then(|commands| commands.get(name))
            .or_else(|| table.global.get(name))
            .cloned()
    }

    /// Returns the global handlers in insertion order.
    pub fn global(&self) -> Vec<BoxedCommand> {
        self.table.read().global.values().cloned().collect()
    }

    /// Returns every scope with its handlers.
    pub fn scoped(&self) -> Vec<(String, Vec<BoxedCommand>)> {
        self.table
            .read()
            .scoped
            .iter()
            .map(|(id, commands)| (id.clone(), commands.values().cloned().collect()))
            .collect()
    }

    /// Returns the known scope ids.
    pub fn scope_ids(&self) -> Vec<String> {
        self.table.read().scoped.keys().cloned().collect()
    }

    /// Returns the handlers usable in a scope: global ones plus the scope's own.
    pub fn visible_in(&self, scope_id: Option<&str>) -> Vec<BoxedCommand> {
        let table = self.table.read();
        let mut visible: IndexMap<&str, &BoxedCommand> = table
            .global
            .iter()
            .map(|(name, handler)| (name.as_str(), handler))
            .collect();
        if let Some(commands) = scope_id.and_then(|id| table.scoped.get(id)) {
            visible.extend(commands.iter().map(|(name, handler)| (name.as_str(), handler)));
        }
        visible.into_values().cloned().collect()
    }

    /// Total handlers across all partitions.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.read();
        f.debug_struct("CommandRegistry")
            .field("global", &table.global.len())
            .field("scopes", &table.scoped.len())
            .finish()
    }
}

// =============================================================================
// ComponentRegistry
// =============================================================================

/// Component handlers in registration order.
#[derive(Default)]
pub struct ComponentRegistry {
    handlers: RwLock<IndexMap<IdentityKey, BoxedComponent>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches a handler. A handler with the same identity is replaced in
    /// place and keeps its match priority.
    pub fn insert(&self, handler: BoxedComponent) {
        let key = handler.identity().key();
        self.handlers.write().insert(key, handler);
    }

    /// Returns the first handler whose identity matches `custom_id`.
    pub fn find(&self, custom_id: &str) -> Option<BoxedComponent> {
        let handlers = self.handlers.read();
        find_first(
            handlers.values().map(|handler| (handler.identity(), handler)),
            custom_id,
        )
        .cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("handlers", &self.len())
            .finish()
    }
}

// =============================================================================
// HandlerRegistry
// =============================================================================

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Command handlers cached.
    pub commands: usize,
    /// Component handlers cached.
    pub components: usize,
    /// Definitions that failed to construct.
    pub skipped: usize,
}

/// The command and component registries together.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    pub commands: CommandRegistry,
    pub components: ComponentRegistry,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every definition of `source` into the registry, on top of the
    /// handlers already cached.
    ///
    /// Definitions that fail to construct are logged and skipped.
    pub fn discover(&self, source: &dyn HandlerSource) -> DiscoveryReport {
        self.load(source, false)
    }

    /// Replaces every cached handler with the definitions of `source`.
    ///
    /// The fresh handlers are built first and swapped in under one exclusive
    /// section, so concurrent lookups keep resolving the old handlers until
    /// the new ones are in place.
    pub fn rediscover(&self, source: &dyn HandlerSource) -> DiscoveryReport {
        self.load(source, true)
    }

    fn load(&self, source: &dyn HandlerSource, replace: bool) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        info!(context = "caching", source = source.name(), "Starting caching handlers...");

        let mut commands = Vec::new();
        let mut components = Vec::new();
        if source.is_available() {
            for definition in source.commands() {
                match definition.construct() {
                    Ok(handler) => commands.push(handler),
                    Err(e) => {
                        warn!(context = "caching", origin = definition.origin(), error = %e, "Skipping command definition");
                        report.skipped += 1;
                    }
                }
            }
            for definition in source.components() {
                match definition.construct() {
                    Ok(handler) => components.push(handler),
                    Err(e) => {
                        warn!(context = "caching", origin = definition.origin(), error = %e, "Skipping component definition");
                        report.skipped += 1;
                    }
                }
            }
        } else {
            info!(
                context = "caching",
                source = source.name(),
                "Ignoring handlers: source not available"
            );
            if !replace {
                return report;
            }
        }

        {
            let mut command_table = self.commands.table.write();
            let mut component_table = self.components.handlers.write();
            if replace {
                *command_table = CommandTable::default();
                component_table.clear();
            }

            for handler in commands {
                let scoped = matches!(handler.scope(), CommandScope::Scoped(_));
                let name = handler.name().to_string();
                if command_table.insert(handler) {
                    if scoped {
                        info!(context = "caching", "Cached scoped command {name}");
                    } else {
                        info!(context = "caching", "Cached command {name}");
                    }
                    report.commands += 1;
                }
            }

            for handler in components {
                info!(context = "caching", "Cached {}", handler.identity());
                component_table.insert(handler.identity().key(), handler);
                report.components += 1;
            }
        }

        info!(
            context = "caching",
            "Cached {} {} and {} {} with {} skipped",
            report.commands,
            pluralize(report.commands, "command"),
            report.components,
            pluralize(report.components, "component"),
            report.skipped,
        );

        report
    }

    /// Drops every cached handler, both tables in one exclusive section.
    pub fn clear(&self) {
        let mut command_table = self.commands.table.write();
        let mut component_table = self.components.handlers.write();
        *command_table = CommandTable::default();
        component_table.clear();
    }

    /// Total cached handlers.
    pub fn total(&self) -> usize {
        self.commands.len() + self.components.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::discovery::{CommandDefinition, ComponentDefinition, TableSource};
    use crate::error::DiscoveryError;
    use crate::handler::{command, component};
    use crate::matcher::IdentitySpec;
    use rebus_core::CommandSpec;

    fn global(name: &str, tag: &str) -> BoxedCommand {
        Arc::new(command(CommandSpec::new(name, tag), |_ctx| async { Ok(()) }))
    }

    fn scoped(name: &str, tag: &str, ids: &[&str]) -> BoxedCommand {
        Arc::new(
            command(CommandSpec::new(name, tag), |_ctx| async { Ok(()) })
                .scoped(ids.iter().copied()),
        )
    }

    fn button(identity: IdentitySpec) -> BoxedComponent {
        Arc::new(component(identity, |_ctx| async { Ok(()) }))
    }

    fn tag(handler: Option<BoxedCommand>) -> Option<String> {
        handler.map(|h| h.spec().description.clone())
    }

    #[test]
    fn test_scoped_lookup_prefers_scope_partition() {
        let registry = CommandRegistry::new();
        registry.insert(global("ping", "A"));
        registry.insert(scoped("ping", "B", &["G1"]));

        assert_eq!(tag(registry.get("ping", Some("G1"), false)), Some("B".into()));
        assert_eq!(tag(registry.get("ping", Some("G1"), true)), Some("A".into()));
        assert_eq!(tag(registry.get("ping", Some("G2"), false)), Some("A".into()));
        assert_eq!(tag(registry.get("ping", None, false)), Some("A".into()));
        assert!(registry.get("pong", Some("G1"), false).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_scoped_without_ids_is_not_cached() {
        let registry = CommandRegistry::new();
        assert!(!registry.insert(scoped("setup", "S", &[])));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_scoped_command_fans_out_to_each_scope() {
        let registry = CommandRegistry::new();
        registry.insert(scoped("setup", "S", &["G1", "G2"]));
        assert_eq!(registry.scope_ids(), vec!["G1".to_string(), "G2".to_string()]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.visible_in(Some("G2")).len(), 1);
        assert!(registry.visible_in(None).is_empty());
    }

    #[test]
    fn test_discover_twice_does_not_duplicate() {
        let source = TableSource::new("memory")
            .with_command(CommandDefinition::new("ping", || Ok(global("ping", "A"))))
            .with_command(CommandDefinition::new("setup", || Ok(scoped("setup", "S", &["G1"]))))
            .with_component(ComponentDefinition::new("hint", || {
                Ok(button(IdentitySpec::prefix("hint:")))
            }));
        let registry = HandlerRegistry::new();

        let first = registry.discover(&source);
        let second = registry.discover(&source);

        assert_eq!(first, second);
        assert_eq!(first.commands, 2);
        assert_eq!(registry.commands.len(), 2);
        assert_eq!(registry.components.len(), 1);
    }

    #[test]
    fn test_discover_skips_failing_definitions() {
        let source = TableSource::new("memory")
            .with_command(CommandDefinition::new("broken", || {
                Err(DiscoveryError::construct("broken", "boom"))
            }))
            .with_command(CommandDefinition::new("ping", || Ok(global("ping", "A"))));
        let registry = HandlerRegistry::new();

        let report = registry.discover(&source);
        assert_eq!(report.commands, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_unavailable_source_discovers_nothing() {
        let registry = HandlerRegistry::new();
        let report = registry.discover(&TableSource::unavailable("missing"));
        assert_eq!(report, DiscoveryReport::default());
        assert_eq!(registry.total(), 0);
    }

    #[test]
    fn test_component_first_match_and_stable_replace() {
        let registry = ComponentRegistry::new();
        registry.insert(button(IdentitySpec::prefix("hint")));
        registry.insert(button(IdentitySpec::exact("hint:1")));
        registry.insert(button(IdentitySpec::prefix("hint")));

        let hit = registry.find("hint:1").map(|h| h.identity().to_string());
        assert_eq!(hit.as_deref(), Some("startsWith(hint)"));
        assert_eq!(registry.len(), 2);
        assert!(registry.find("reveal").is_none());
    }

    #[test]
    fn test_lookalike_identities_are_kept_apart() {
        let registry = ComponentRegistry::new();
        registry.insert(button(IdentitySpec::prefix("hint")));
        registry.insert(button(IdentitySpec::exact("startsWith(hint)")));

        assert_eq!(registry.len(), 2);
        let hit = registry.find("hint:1").map(|h| h.identity().key());
        assert_eq!(hit, Some(IdentitySpec::prefix("hint").key()));
        let exact = registry.find("startsWith(hint)").map(|h| h.identity().key());
        assert_eq!(exact, Some(IdentitySpec::exact("startsWith(hint)").key()));
    }

    #[test]
    fn test_rediscover_replaces_instead_of_merging() {
        let source = TableSource::new("memory")
            .with_command(CommandDefinition::new("ping", || Ok(global("ping", "A"))))
            .with_command(CommandDefinition::new("old", || Ok(scoped("old", "O", &["G1"]))));
        let registry = HandlerRegistry::new();
        registry.discover(&source);

        source.stage(
            vec![CommandDefinition::new("ping", || Ok(global("ping", "B")))],
            Vec::new(),
        );
        source.invalidate();
        let report = registry.rediscover(&source);

        assert_eq!(report.commands, 1);
        assert_eq!(registry.commands.len(), 1);
        assert!(registry.commands.scope_ids().is_empty());
        assert_eq!(tag(registry.commands.get("ping", None, true)), Some("B".into()));
    }

    #[test]
    fn test_clear_drops_both_tables() {
        let registry = HandlerRegistry::new();
        registry.commands.insert(global("ping", "A"));
        registry.commands.insert(scoped("setup", "S", &["G1"]));
        registry.components.insert(button(IdentitySpec::prefix("hint:")));

        registry.clear();
        assert_eq!(registry.total(), 0);
        assert!(registry.commands.scope_ids().is_empty());
    }

    #[test]
    fn test_rediscover_of_unavailable_source_empties_registry() {
        let registry = HandlerRegistry::new();
        registry.commands.insert(global("ping", "A"));
        let report = registry.rediscover(&TableSource::unavailable("missing"));
        assert_eq!(report, DiscoveryReport::default());
        assert_eq!(registry.total(), 0);
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "command"), "command");
        assert_eq!(pluralize(0, "command"), "commands");
        assert_eq!(pluralize(3, "component"), "components");
    }
}
