//! The Rebus runtime.
//!
//! [`Rebus`] owns the handler registry and everything that works on it: the
//! publisher, the interaction dispatcher and the reload coordinator. It is
//! built once at boot and passed around explicitly.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use rebus_runtime::Rebus;
//!
//! let rebus = Rebus::builder()
//!     .config_file("rebus.toml")
//!     .platform(platform)
//!     .build()?;
//!
//! rebus.on_shutdown(|| async { store.flush().await });
//! rebus.run().await;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::config::{ConfigLoader, RebusConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use rebus_core::{BoxedPlatform, BoxedTracker, Interaction, TracingTracker};
use rebus_framework::{
    DiscoveryReport, DispatchOutcome, HandlerRegistry, HandlerSource, InteractionDispatcher,
    LinkedSource, PublishReport, Publisher, ReloadCoordinator, ReloadReport, Services,
};

type ShutdownHook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// The bot runtime.
pub struct Rebus {
    config: RebusConfig,
    registry: Arc<HandlerRegistry>,
    source: Arc<dyn HandlerSource>,
    publisher: Publisher,
    dispatcher: Arc<InteractionDispatcher>,
    reloader: ReloadCoordinator,
    tasks: TaskTracker,
    hooks: Mutex<Vec<ShutdownHook>>,
    running: AtomicBool,
}

impl Rebus {
    /// Creates a runtime builder.
    pub fn builder() -> RebusBuilder {
        RebusBuilder::new()
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &RebusConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<InteractionDispatcher> {
        &self.dispatcher
    }

    /// Returns whether [`start`](Self::start) has run and [`stop`](Self::stop) has not.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Discovers every handler and publishes the command sets.
    ///
    /// Calling `start` on a running runtime does nothing.
    pub async fn start(&self) -> (DiscoveryReport, PublishReport) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Runtime is already running");
            return (DiscoveryReport::default(), PublishReport::default());
        }

        info!(source = self.source.name(), "Starting Rebus runtime");
        let discovered = self.registry.discover(self.source.as_ref());
        let published = self.publisher.publish_all(&self.registry.commands).await;
        if !published.is_success() {
            warn!(
                failures = published.failures.len(),
                "Some command sets failed to publish"
            );
        }
        info!("Runtime started");

        (discovered, published)
    }

    /// Dispatches an interaction on its own task.
    ///
    /// Tasks are tracked; [`stop`](Self::stop) waits for them to finish.
    pub fn handle(&self, interaction: Interaction) -> JoinHandle<DispatchOutcome> {
        let dispatcher = Arc::clone(&self.dispatcher);
        self.tasks
            .spawn(async move { dispatcher.dispatch(Arc::new(interaction)).await })
    }

    /// Runs an operator-triggered hot reload.
    pub async fn reload(&self) -> ReloadReport {
        self.reloader.reload().await
    }

    /// Registers a cleanup hook run on shutdown, after in-flight
    /// interactions finish. Hooks run in registration order.
    pub fn on_shutdown<F, Fut>(&self, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks
            .lock()
            .push(Box::new(move || Box::pin(hook()) as BoxFuture<'static, ()>));
    }

    /// Waits for in-flight interactions, then runs the shutdown hooks.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Runtime is not running");
            return;
        }

        info!(in_flight = self.tasks.len(), "Stopping Rebus runtime");
        self.tasks.close();
        self.tasks.wait().await;

        let hooks = std::mem::take(&mut *self.hooks.lock());
        for hook in hooks {
            hook().await;
        }
        // accept new interactions again if the runtime is restarted
        self.tasks.reopen();

        info!("Runtime stopped");
    }

    /// Starts, waits for Ctrl+C or SIGTERM, then stops.
    pub async fn run(&self) {
        self.run_until(shutdown_signal()).await;
    }

    /// Starts, waits for `shutdown`, then stops.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.start().await;
        info!("Rebus is now running");
        shutdown.await;
        self.stop().await;
    }
}

impl std::fmt::Debug for Rebus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rebus")
            .field("source", &self.source.name())
            .field("handlers", &self.registry.total())
            .field("running", &self.is_running())
            .field("hooks", &self.hooks.lock().len())
            .finish()
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RebusBuilder
// =============================================================================

/// Builder for a [`Rebus`] runtime.
///
/// Configuration is loaded from files and the environment unless an explicit
/// [`config`](Self::config) is given. A platform is required; the tracker
/// defaults to [`TracingTracker`] and the source to [`LinkedSource`].
pub struct RebusBuilder {
    config_loader: ConfigLoader,
    config: Option<RebusConfig>,
    platform: Option<BoxedPlatform>,
    tracker: Option<BoxedTracker>,
    source: Option<Arc<dyn HandlerSource>>,
    services: Services,
}

impl RebusBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            config: None,
            platform: None,
            tracker: None,
            source: None,
            services: Services::new(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration over the loaded sources.
    pub fn merge(mut self, config: RebusConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `config` as is, skipping file and environment loading.
    pub fn config(mut self, config: RebusConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn platform(mut self, platform: BoxedPlatform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn tracker(mut self, tracker: BoxedTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Sets where handler definitions come from.
    pub fn source(mut self, source: Arc<dyn HandlerSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Shares a service with every handler.
    pub fn service<T: ?Sized + Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        self.services.insert(service);
        self
    }

    /// Loads and validates the configuration, initializes logging and wires
    /// the runtime together.
    pub fn build(self) -> RuntimeResult<Rebus> {
        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };
        validate_config(&config)?;

        logging::init_from_config(&config.logging);

        if config.bot.token().is_none() {
            error!("No bot token configured, cannot start");
            return Err(RuntimeError::MissingToken);
        }
        let platform = self.platform.ok_or(RuntimeError::MissingPlatform)?;
        let tracker: BoxedTracker = self.tracker.unwrap_or_else(|| Arc::new(TracingTracker));
        let source: Arc<dyn HandlerSource> =
            self.source.unwrap_or_else(|| Arc::new(LinkedSource::new()));

        let registry = Arc::new(HandlerRegistry::new());
        let dispatcher = InteractionDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&platform),
            Arc::clone(&tracker),
        )
        .with_services(Arc::new(self.services));
        let reloader = ReloadCoordinator::new(
            Arc::clone(&registry),
            Arc::clone(&source),
            Arc::clone(&platform),
            Arc::clone(&tracker),
        );

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            "Runtime initialized from configuration"
        );

        Ok(Rebus {
            config,
            registry,
            source,
            publisher: Publisher::new(platform, tracker),
            dispatcher: Arc::new(dispatcher),
            reloader,
            tasks: TaskTracker::new(),
            hooks: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        })
    }
}

impl Default for RebusBuilder {
    fn default() -> Self {
        Self::new()
    }
}
