//! Hot reload of command handlers.
//!
//! A reload wipes the remote command sets, invalidates the definition source
//! and then rediscovers and republishes:
//!
//! ```text
//! snapshot scope ids
//!   → clear remote global set
//!   → clear remote set of every known scope (unfetchable scopes skipped)
//!   → invalidate source (generation bump)
//!   → rediscover (fresh handlers swapped in under one write section)
//!   → publish
//! ```
//!
//! The registry is never observed empty: dispatches during the reload keep
//! resolving the previous handlers until the swap.
//!
//! Only one reload runs at a time; a concurrent request is rejected with
//! [`ReloadError::InProgress`] and leaves all state untouched. There is no
//! resume: a failure part-way leaves the remote side as it was at the point
//! of failure.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info, warn};

use rebus_core::{BoxedPlatform, BoxedTracker, CaptureContext};

use crate::discovery::HandlerSource;
use crate::error::{ReloadError, ReloadResult};
use crate::publisher::Publisher;
use crate::registry::{HandlerRegistry, pluralize};

/// Outcome of a reload.
#[derive(Debug, Default)]
pub struct ReloadReport {
    /// Command handlers registered after the reload.
    pub count: usize,
    /// Component handlers registered after the reload.
    pub components: usize,
    /// Set when the reload was aborted; `count` is then zero.
    pub error: Option<ReloadError>,
}

impl ReloadReport {
    fn failed(error: ReloadError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }
}

/// Clears the in-flight flag when a reload ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs hot reloads against one registry and source.
pub struct ReloadCoordinator {
    registry: Arc<HandlerRegistry>,
    source: Arc<dyn HandlerSource>,
    publisher: Publisher,
    platform: BoxedPlatform,
    tracker: BoxedTracker,
    in_flight: AtomicBool,
}

impl ReloadCoordinator {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        source: Arc<dyn HandlerSource>,
        platform: BoxedPlatform,
        tracker: BoxedTracker,
    ) -> Self {
        Self {
            publisher: Publisher::new(Arc::clone(&platform), Arc::clone(&tracker)),
            registry,
            source,
            platform,
            tracker,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Returns `true` while a reload is running.
    pub fn is_reloading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Reloads every handler and republishes the command sets.
    pub async fn reload(&self) -> ReloadReport {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(context = "reload", "Reload requested while another is in progress");
            return ReloadReport::failed(ReloadError::InProgress);
        }
        let _guard = InFlight(&self.in_flight);

        info!(context = "reload", "Initiating hot-reload of commands...");

        if !self.source.is_available() {
            warn!(
                context = "reload",
                source = self.source.name(),
                "Cannot reload commands: handler source not available"
            );
            return ReloadReport::default();
        }

        match self.run().await {
            Ok(report) => report,
            Err(e) => {
                error!(context = "reload", error = %e, "Command reload failed");
                self.tracker
                    .capture(&e, &CaptureContext::operation("reload"));
                ReloadReport::failed(e)
            }
        }
    }

    async fn run(&self) -> ReloadResult<ReloadReport> {
        let scope_ids = self.registry.commands.scope_ids();

        self.platform
            .replace_remote_commands(None, &[])
            .await
            .map_err(ReloadError::ClearGlobal)?;
        info!(context = "reload", "Cleared all global commands");

        for scope_id in &scope_ids {
            let scope = match self.platform.fetch_scope(scope_id).await {
                Ok(scope) => scope,
                Err(e) => {
                    warn!(context = "reload", scope_id = %scope_id, error = %e, "Skipping unfetchable scope");
                    continue;
                }
            };
            self.platform
                .replace_remote_commands(Some(&scope.id), &[])
                .await
                .map_err(|source| ReloadError::ClearScope {
                    scope_id: scope.id.clone(),
                    source,
                })?;
            info!(context = "reload", "Cleared commands from scope {} ({})", scope.name, scope.id);
        }

        let evicted = self.source.invalidate();
        info!(
            context = "reload",
            generation = self.source.generation(),
            "Un-cached {} handler {}",
            evicted,
            pluralize(evicted, "definition")
        );

        let discovered = self.registry.rediscover(self.source.as_ref());
        let published = self.publisher.publish_all(&self.registry.commands).await;
        if !published.is_success() {
            warn!(
                context = "reload",
                failures = published.failures.len(),
                "Some command sets failed to publish"
            );
        }

        let count = self.registry.commands.len();
        info!(
            context = "reload",
            "Reloaded {} {} and {} {}",
            count,
            pluralize(count, "command"),
            discovered.components,
            pluralize(discovered.components, "component")
        );

        Ok(ReloadReport {
            count,
            components: discovered.components,
            error: None,
        })
    }
}

impl std::fmt::Debug for ReloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadCoordinator")
            .field("source", &self.source.name())
            .field("in_flight", &self.is_reloading())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::discovery::{CommandDefinition, TableSource};
    use crate::handler::{BoxedCommand, command};
    use crate::testing::{RecordingPlatform, RecordingTracker};
    use rebus_core::CommandSpec;

    fn definition(name: &'static str, scope: Option<&'static [&'static str]>) -> CommandDefinition {
        CommandDefinition::new(name, move || {
            let handler = command(CommandSpec::new(name, name), |_ctx| async { Ok(()) });
            Ok(match scope {
                Some(ids) => Arc::new(handler.scoped(ids.iter().copied())) as BoxedCommand,
                None => Arc::new(handler) as BoxedCommand,
            })
        })
    }

    struct Fixture {
        platform: Arc<RecordingPlatform>,
        tracker: Arc<RecordingTracker>,
        registry: Arc<HandlerRegistry>,
        source: Arc<TableSource>,
        coordinator: ReloadCoordinator,
    }

    fn fixture(source: TableSource) -> Fixture {
        let platform = Arc::new(RecordingPlatform::new());
        let tracker = Arc::new(RecordingTracker::default());
        let registry = Arc::new(HandlerRegistry::new());
        let source = Arc::new(source);
        let coordinator = ReloadCoordinator::new(
            registry.clone(),
            source.clone(),
            platform.clone(),
            tracker.clone(),
        );
        Fixture {
            platform,
            tracker,
            registry,
            source,
            coordinator,
        }
    }

    #[tokio::test]
    async fn test_reload_replaces_remote_sets_with_fresh_ones() {
        let f = fixture(
            TableSource::new("memory")
                .with_command(definition("ping", None))
                .with_command(definition("old", Some(&["G1"]))),
        );
        f.registry.discover(f.source.as_ref());
        Publisher::new(f.platform.clone(), f.tracker.clone())
            .publish_all(&f.registry.commands)
            .await;
        assert_eq!(f.platform.remote_names(Some("G1")), vec!["old".to_string()]);

        f.source.stage(
            vec![
                definition("ping", None),
                definition("puzzle", None),
                definition("setup", Some(&["G2", "G3"])),
            ],
            Vec::new(),
        );

        let report = f.coordinator.reload().await;
        assert!(report.error.is_none());
        assert_eq!(report.count, 4);
        assert_eq!(f.source.generation(), 1);
        assert_eq!(f.platform.remote_names(Some("G1")), Vec::<String>::new());
        assert_eq!(f.platform.remote_names(Some("G2")), vec!["setup".to_string()]);
        assert_eq!(
            f.platform.remote_names(None),
            vec!["ping".to_string(), "puzzle".to_string()]
        );
        assert!(!f.coordinator.is_reloading());
    }

    #[tokio::test]
    async fn test_handlers_stay_resolvable_during_rediscovery() {
        let registry = Arc::new(HandlerRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let watched = {
            let registry = registry.clone();
            let seen = seen.clone();
            CommandDefinition::new("ping", move || {
                seen.lock().push(registry.commands.get("ping", None, true).is_some());
                Ok(Arc::new(command(CommandSpec::new("ping", "ping"), |_ctx| async { Ok(()) }))
                    as BoxedCommand)
            })
        };
        let source = Arc::new(TableSource::new("memory").with_command(watched));
        registry.discover(source.as_ref());

        let platform = Arc::new(RecordingPlatform::new());
        let coordinator = ReloadCoordinator::new(
            registry.clone(),
            source,
            platform,
            Arc::new(RecordingTracker::default()),
        );
        let report = coordinator.reload().await;

        assert_eq!(report.count, 1);
        assert_eq!(*seen.lock(), vec![false, true]);
        assert!(registry.commands.get("ping", None, true).is_some());
    }

    #[tokio::test]
    async fn test_unfetchable_scope_is_skipped() {
        let f = fixture(TableSource::new("memory").with_command(definition("setup", Some(&["G9"]))));
        f.registry.discover(f.source.as_ref());
        f.platform.fail_scope("G9");

        let report = f.coordinator.reload().await;
        assert!(report.error.is_none());
        assert_eq!(report.count, 1);
        // the scope still fails on publish, which is captured but not fatal
        assert_eq!(f.tracker.count(), 1);
    }

    #[tokio::test]
    async fn test_clear_failure_aborts_with_zero_count() {
        let f = fixture(TableSource::new("memory").with_command(definition("ping", None)));
        f.registry.discover(f.source.as_ref());
        f.platform.fail_global();

        let report = f.coordinator.reload().await;
        assert_eq!(report.count, 0);
        assert!(matches!(report.error, Some(ReloadError::ClearGlobal(_))));
        assert_eq!(f.tracker.count(), 1);
        // state before the failing step is kept
        assert_eq!(f.registry.commands.len(), 1);
        assert!(!f.coordinator.is_reloading());
    }

    #[tokio::test]
    async fn test_unavailable_source_reloads_nothing() {
        let f = fixture(TableSource::unavailable("missing"));
        let report = f.coordinator.reload().await;
        assert_eq!(report.count, 0);
        assert!(report.error.is_none());
        assert_eq!(f.platform.replace_calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_reload_is_rejected() {
        let f = fixture(TableSource::new("memory").with_command(definition("ping", None)));
        f.coordinator.in_flight.store(true, Ordering::SeqCst);

        let report = tokio::time::timeout(Duration::from_secs(1), f.coordinator.reload())
            .await
            .unwrap();
        assert!(matches!(report.error, Some(ReloadError::InProgress)));
        assert_eq!(f.platform.replace_calls(), 0);
        assert_eq!(f.tracker.count(), 0);
        // the rejected call must not release the running reload's flag
        assert!(f.coordinator.is_reloading());
    }
}
