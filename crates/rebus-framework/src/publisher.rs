//! Remote command registration.
//!
//! The [`Publisher`] pushes the registry's command specs to the platform.
//! Every publish *replaces* the remote set of its scope; nothing is merged.
//! Each scope is its own failure domain: a failed scope is logged and
//! captured, and publishing continues with the next one.

use rebus_core::{BoxedPlatform, BoxedTracker, CaptureContext, CommandSpec};
use tracing::{info, warn};

use crate::error::{PublishError, PublishResult};
use crate::handler::BoxedCommand;
use crate::registry::{CommandRegistry, pluralize};

/// Outcome of publishing the whole registry.
#[derive(Debug, Default)]
pub struct PublishReport {
    /// Commands accepted by the platform across all scopes.
    pub published: usize,
    /// Scopes (or the global set) that failed.
    pub failures: Vec<PublishError>,
}

impl PublishReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Publishes command specs to the platform.
#[derive(Clone)]
pub struct Publisher {
    platform: BoxedPlatform,
    tracker: BoxedTracker,
}

impl Publisher {
    pub fn new(platform: BoxedPlatform, tracker: BoxedTracker) -> Self {
        Self { platform, tracker }
    }

    fn build_specs(handlers: &[BoxedCommand]) -> Vec<CommandSpec> {
        handlers.iter().map(|handler| handler.spec().build()).collect()
    }

    fn report(&self, err: &PublishError) {
        self.tracker
            .capture(err, &CaptureContext::operation("publish"));
    }

    /// Replaces a scope's remote command set with `handlers`.
    ///
    /// An empty list clears the scope.
    pub async fn publish_scoped(
        &self,
        scope_id: &str,
        handlers: &[BoxedCommand],
    ) -> PublishResult<usize> {
        let scoped_err = |source| PublishError::Scoped {
            scope_id: scope_id.to_string(),
            source,
        };

        let scope = self
            .platform
            .fetch_scope(scope_id)
            .await
            .map_err(scoped_err)?;

        let specs = Self::build_specs(handlers);
        let published = self
            .platform
            .replace_remote_commands(Some(&scope.id), &specs)
            .await
            .map_err(scoped_err)?;

        info!(
            context = "publish",
            scope = %scope.name,
            scope_id = %scope.id,
            "Published {} {}",
            published.len(),
            pluralize(published.len(), "command")
        );
        Ok(published.len())
    }

    /// Replaces the application-global command set with `handlers`.
    ///
    /// An empty list leaves the remote set untouched.
    pub async fn publish_global(&self, handlers: &[BoxedCommand]) -> PublishResult<usize> {
        if handlers.is_empty() {
            info!(context = "publish", "Ignoring global commands: No commands found");
            return Ok(0);
        }

        let specs = Self::build_specs(handlers);
        let published = self
            .platform
            .replace_remote_commands(None, &specs)
            .await
            .map_err(PublishError::Global)?;

        info!(
            context = "publish",
            "Published {} global {}",
            published.len(),
            pluralize(published.len(), "command")
        );
        Ok(published.len())
    }

    /// Publishes every scope of the registry, then the global set.
    ///
    /// Failures are logged and captured but never stop the remaining scopes.
    pub async fn publish_all(&self, registry: &CommandRegistry) -> PublishReport {
        info!(context = "publish", "Attempting to publish commands...");

        let mut report = PublishReport::default();

        for (scope_id, handlers) in registry.scoped() {
            match self.publish_scoped(&scope_id, &handlers).await {
                Ok(count) => report.published += count,
                Err(e) => {
                    warn!(context = "publish", scope_id = %scope_id, error = %e, "Could not publish scoped commands");
                    self.report(&e);
                    report.failures.push(e);
                }
            }
        }

        match self.publish_global(&registry.global()).await {
            Ok(count) => report.published += count,
            Err(e) => {
                warn!(context = "publish", error = %e, "Failed to publish global commands");
                self.report(&e);
                report.failures.push(e);
            }
        }

        report
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::handler::command;
    use crate::testing::{RecordingPlatform, RecordingTracker};

    fn ping(scope: Option<&str>) -> BoxedCommand {
        let handler = command(CommandSpec::new("ping", "Ping"), |_ctx| async { Ok("pong") });
        match scope {
            Some(id) => Arc::new(handler.scoped([id])),
            None => Arc::new(handler),
        }
    }

    #[tokio::test]
    async fn test_publish_scoped_empty_clears_scope() {
        let platform = Arc::new(RecordingPlatform::new());
        platform.seed_remote(Some("G1"), &["old"]);
        let publisher = Publisher::new(platform.clone(), Arc::new(RecordingTracker::default()));

        let count = publisher.publish_scoped("G1", &[]).await.unwrap();
        assert_eq!(count, 0);
        assert_eq!(platform.remote_names(Some("G1")), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_publish_global_empty_is_noop() {
        let platform = Arc::new(RecordingPlatform::new());
        platform.seed_remote(None, &["old"]);
        let publisher = Publisher::new(platform.clone(), Arc::new(RecordingTracker::default()));

        assert_eq!(publisher.publish_global(&[]).await.unwrap(), 0);
        assert_eq!(platform.remote_names(None), vec!["old".to_string()]);
        assert_eq!(platform.replace_calls(), 0);
    }

    #[tokio::test]
    async fn test_publish_applies_build_defaults() {
        let platform = Arc::new(RecordingPlatform::new());
        let publisher = Publisher::new(platform.clone(), Arc::new(RecordingTracker::default()));

        publisher.publish_global(&[ping(None)]).await.unwrap();
        let specs = platform.remote_specs(None);
        assert_eq!(specs[0].dm_permission, Some(true));
        assert!(specs[0].default_member_permissions.is_some());
    }

    #[tokio::test]
    async fn test_failed_scope_does_not_stop_others() {
        let platform = Arc::new(RecordingPlatform::new());
        platform.fail_scope("G2");
        let tracker = Arc::new(RecordingTracker::default());
        let publisher = Publisher::new(platform.clone(), tracker.clone());

        let registry = CommandRegistry::new();
        registry.insert(ping(Some("G1")));
        registry.insert(ping(Some("G2")));
        registry.insert(ping(None));

        let report = publisher.publish_all(&registry).await;
        assert_eq!(report.published, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(tracker.count(), 1);
        assert_eq!(platform.remote_names(Some("G1")), vec!["ping".to_string()]);
        assert_eq!(platform.remote_names(None), vec!["ping".to_string()]);
    }
}
