//! Handler discovery sources.
//!
//! Discovery turns *definitions* (a named factory that constructs a handler)
//! into live handlers in the registry. Where definitions come from is
//! abstracted by [`HandlerSource`]:
//!
//! - [`LinkedSource`] reads the link-time registries filled by
//!   [`register_command!`](crate::register_command) and
//!   [`register_component!`](crate::register_component). Every discovery pass
//!   constructs fresh handler instances from the linked factories.
//! - [`TableSource`] holds an in-memory table that can be swapped at runtime.
//!   New definitions are [`stage`](TableSource::stage)d and become visible on
//!   the next [`invalidate`](HandlerSource::invalidate), which is what a hot
//!   reload calls before rediscovering.
//!
//! # Link-time registration
//!
//! ```rust,ignore
//! use rebus_framework::{register_command, handler::command};
//! use rebus_core::CommandSpec;
//!
//! register_command!(PING, command(CommandSpec::new("ping", "Ping"), |_ctx| async {
//!     Ok("pong")
//! }));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use linkme::distributed_slice;
use parking_lot::{Mutex, RwLock};

use crate::error::DiscoveryResult;
use crate::handler::{BoxedCommand, BoxedComponent};

// =============================================================================
// Definitions
// =============================================================================

type Factory<T> = Arc<dyn Fn() -> DiscoveryResult<T> + Send + Sync>;

/// A named factory producing one handler.
pub struct HandlerDefinition<T> {
    origin: String,
    factory: Factory<T>,
}

impl<T> HandlerDefinition<T> {
    /// Creates a definition from a factory.
    pub fn new<F>(origin: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> DiscoveryResult<T> + Send + Sync + 'static,
    {
        Self {
            origin: origin.into(),
            factory: Arc::new(factory),
        }
    }

    /// Where this definition came from, used in logs.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Constructs a fresh handler.
    pub fn construct(&self) -> DiscoveryResult<T> {
        (self.factory)()
    }
}

impl<T> Clone for HandlerDefinition<T> {
    fn clone(&self) -> Self {
        Self {
            origin: self.origin.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T> std::fmt::Debug for HandlerDefinition<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDefinition")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Definition of a command handler.
pub type CommandDefinition = HandlerDefinition<BoxedCommand>;

/// Definition of a component handler.
pub type ComponentDefinition = HandlerDefinition<BoxedComponent>;

// =============================================================================
// Link-time registries (linkme distributed slices)
// =============================================================================

/// A command factory contributed at link time.
pub struct LinkedCommand {
    pub origin: &'static str,
    pub create: fn() -> DiscoveryResult<BoxedCommand>,
}

/// A component factory contributed at link time.
pub struct LinkedComponent {
    pub origin: &'static str,
    pub create: fn() -> DiscoveryResult<BoxedComponent>,
}

/// Registry of linked command factories.
#[distributed_slice]
pub static LINKED_COMMANDS: [LinkedCommand];

/// Registry of linked component factories.
#[distributed_slice]
pub static LINKED_COMPONENTS: [LinkedComponent];

/// Registers a command handler in [`LINKED_COMMANDS`].
///
/// The expression is evaluated on every discovery pass. Use the `fallible:`
/// form when construction returns a `DiscoveryResult`.
#[macro_export]
macro_rules! register_command {
    ($name:ident, fallible: $create:expr) => {
        #[$crate::linkme::distributed_slice($crate::discovery::LINKED_COMMANDS)]
        #[linkme(crate = $crate::linkme)]
        static $name: $crate::discovery::LinkedCommand = $crate::discovery::LinkedCommand {
            origin: concat!(module_path!(), "::", stringify!($name)),
            create: || {
                $create.map(|handler| {
                    ::std::sync::Arc::new(handler) as $crate::handler::BoxedCommand
                })
            },
        };
    };
    ($name:ident, $create:expr) => {
        #[$crate::linkme::distributed_slice($crate::discovery::LINKED_COMMANDS)]
        #[linkme(crate = $crate::linkme)]
        static $name: $crate::discovery::LinkedCommand = $crate::discovery::LinkedCommand {
            origin: concat!(module_path!(), "::", stringify!($name)),
            create: || Ok(::std::sync::Arc::new($create) as $crate::handler::BoxedCommand),
        };
    };
}

/// Registers a component handler in [`LINKED_COMPONENTS`].
#[macro_export]
macro_rules! register_component {
    ($name:ident, fallible: $create:expr) => {
        #[$crate::linkme::distributed_slice($crate::discovery::LINKED_COMPONENTS)]
        #[linkme(crate = $crate::linkme)]
        static $name: $crate::discovery::LinkedComponent = $crate::discovery::LinkedComponent {
            origin: concat!(module_path!(), "::", stringify!($name)),
            create: || {
                $create.map(|handler| {
                    ::std::sync::Arc::new(handler) as $crate::handler::BoxedComponent
                })
            },
        };
    };
    ($name:ident, $create:expr) => {
        #[$crate::linkme::distributed_slice($crate::discovery::LINKED_COMPONENTS)]
        #[linkme(crate = $crate::linkme)]
        static $name: $crate::discovery::LinkedComponent = $crate::discovery::LinkedComponent {
            origin: concat!(module_path!(), "::", stringify!($name)),
            create: || Ok(::std::sync::Arc::new($create) as $crate::handler::BoxedComponent),
        };
    };
}

// =============================================================================
// HandlerSource
// =============================================================================

/// Where handler definitions are loaded from.
pub trait HandlerSource: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Returns `false` when the source location does not exist. Discovery
    /// then yields nothing.
    fn is_available(&self) -> bool {
        true
    }

    /// Current command definitions.
    fn commands(&self) -> Vec<CommandDefinition>;

    /// Current component definitions.
    fn components(&self) -> Vec<ComponentDefinition>;

    /// Increases each time the source is invalidated.
    fn generation(&self) -> u64;

    /// Drops cached definitions so the next scan observes current content.
    ///
    /// Returns the number of definitions evicted.
    fn invalidate(&self) -> usize;
}

/// Source backed by the link-time registries.
#[derive(Debug, Default)]
pub struct LinkedSource {
    generation: AtomicU64,
}

impl LinkedSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandlerSource for LinkedSource {
    fn name(&self) -> &str {
        "linked"
    }

    fn commands(&self) -> Vec<CommandDefinition> {
        LINKED_COMMANDS
            .iter()
            .map(|linked| CommandDefinition::new(linked.origin, linked.create))
            .collect()
    }

    fn components(&self) -> Vec<ComponentDefinition> {
        LINKED_COMPONENTS
            .iter()
            .map(|linked| ComponentDefinition::new(linked.origin, linked.create))
            .collect()
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn invalidate(&self) -> usize {
        self.generation.fetch_add(1, Ordering::SeqCst);
        LINKED_COMMANDS.len() + LINKED_COMPONENTS.len()
    }
}

#[derive(Debug, Clone, Default)]
struct Table {
    commands: Vec<CommandDefinition>,
    components: Vec<ComponentDefinition>,
}

impl Table {
    fn len(&self) -> usize {
        self.commands.len() + self.components.len()
    }
}

/// Source backed by a swappable in-memory table.
#[derive(Debug)]
pub struct TableSource {
    name: String,
    available: bool,
    live: RwLock<Table>,
    pending: Mutex<Option<Table>>,
    generation: AtomicU64,
}

impl TableSource {
    /// Creates an empty, available source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: true,
            live: RwLock::new(Table::default()),
            pending: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Creates a source whose location does not exist.
    pub fn unavailable(name: impl Into<String>) -> Self {
        Self {
            available: false,
            ..Self::new(name)
        }
    }

    /// Adds a command definition to the live table (builder pattern).
    pub fn with_command(self, definition: CommandDefinition) -> Self {
        self.live.write().commands.push(definition);
        self
    }

    /// Adds a component definition to the live table (builder pattern).
    pub fn with_component(self, definition: ComponentDefinition) -> Self {
        self.live.write().components.push(definition);
        self
    }

    /// Stages a replacement table that becomes live on the next
    /// [`invalidate`](HandlerSource::invalidate).
    pub fn stage(&self, commands: Vec<CommandDefinition>, components: Vec<ComponentDefinition>) {
        *self.pending.lock() = Some(Table {
            commands,
            components,
        });
    }
}

impl HandlerSource for TableSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn commands(&self) -> Vec<CommandDefinition> {
        self.live.read().commands.clone()
    }

    fn components(&self) -> Vec<ComponentDefinition> {
        self.live.read().components.clone()
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn invalidate(&self) -> usize {
        self.generation.fetch_add(1, Ordering::SeqCst);
        match self.pending.lock().take() {
            Some(next) => {
                let evicted = self.live.read().len();
                *self.live.write() = next;
                evicted
            }
            None => 0,
        }
    }
}

/// Several sources discovered as one, in the order they were added.
///
/// Unavailable members are skipped; the set is available while any member is.
#[derive(Default)]
pub struct SourceSet {
    name: String,
    sources: Vec<Arc<dyn HandlerSource>>,
    generation: AtomicU64,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source (builder pattern).
    pub fn with(self, source: impl HandlerSource + 'static) -> Self {
        self.with_shared(Arc::new(source))
    }

    /// Adds a source that is also held elsewhere (builder pattern).
    pub fn with_shared(mut self, source: Arc<dyn HandlerSource>) -> Self {
        if !self.name.is_empty() {
            self.name.push('+');
        }
        self.name.push_str(source.name());
        self.sources.push(source);
        self
    }

    fn available(&self) -> impl Iterator<Item = &Arc<dyn HandlerSource>> {
        self.sources.iter().filter(|s| s.is_available())
    }
}

impl HandlerSource for SourceSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.sources.iter().any(|s| s.is_available())
    }

    fn commands(&self) -> Vec<CommandDefinition> {
        self.available().flat_map(|s| s.commands()).collect()
    }

    fn components(&self) -> Vec<ComponentDefinition> {
        self.available().flat_map(|s| s.components()).collect()
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn invalidate(&self) -> usize {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.sources.iter().map(|s| s.invalidate()).sum()
    }
}

impl std::fmt::Debug for SourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSet")
            .field("name", &self.name)
            .field("sources", &self.sources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::command;
    use rebus_core::CommandSpec;

    crate::register_command!(
        LINKED_PROBE,
        command(CommandSpec::new("linked-probe", "Probe"), |_ctx| async {
            Ok("probe")
        })
    );

    fn ping(reply: &'static str) -> CommandDefinition {
        CommandDefinition::new("ping", move || {
            Ok(Arc::new(command(CommandSpec::new("ping", "Ping"), move |_ctx| async move {
                Ok(reply)
            })) as BoxedCommand)
        })
    }

    #[test]
    fn test_linked_source_sees_registered_commands() {
        let source = LinkedSource::new();
        let probe = source
            .commands()
            .into_iter()
            .find(|d| d.origin().ends_with("LINKED_PROBE"))
            .expect("linked probe present");
        let handler = probe.construct().unwrap();
        assert_eq!(handler.name(), "linked-probe");

        let before = source.generation();
        source.invalidate();
        assert_eq!(source.generation(), before + 1);
    }

    #[test]
    fn test_table_source_swaps_on_invalidate() {
        let source = TableSource::new("memory").with_command(ping("A"));
        source.stage(vec![ping("B"), ping("C")], Vec::new());

        assert_eq!(source.commands().len(), 1);
        assert_eq!(source.invalidate(), 1);
        assert_eq!(source.commands().len(), 2);
        assert_eq!(source.generation(), 1);

        // nothing staged
        assert_eq!(source.invalidate(), 0);
        assert_eq!(source.commands().len(), 2);
    }

    #[test]
    fn test_source_set_concatenates_available_members() {
        let staged = Arc::new(TableSource::new("staged").with_command(ping("A")));
        staged.stage(vec![ping("B"), ping("C")], Vec::new());

        let set = SourceSet::new()
            .with(TableSource::unavailable("missing").with_command(ping("X")))
            .with_shared(staged.clone())
            .with(TableSource::new("extra").with_command(ping("D")));

        assert_eq!(set.name(), "missing+staged+extra");
        assert!(set.is_available());
        assert_eq!(set.commands().len(), 2);

        // the unavailable member still holds its table
        assert_eq!(set.invalidate(), 1);
        assert_eq!(set.generation(), 1);
        assert_eq!(staged.generation(), 1);
        assert_eq!(set.commands().len(), 3);
    }

    #[test]
    fn test_unavailable_source() {
        let source = TableSource::unavailable("missing");
        assert!(!source.is_available());
        assert!(source.commands().is_empty());
    }
}
