//! Runtime orchestration: backends, plugins and the event worker pool.
//!
//! Each booted backend gets an event pump that reads its `(kind, raw)` stream
//! and hands every event to the worker pool. The pool is a semaphore shared by
//! all backends, so at most `runtime.max_concurrent_events` events are being
//! processed at any time; the fan-out of one event (listeners and commands)
//! runs inside its permit.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let runtime = HookwireRuntime::builder()
//!     .config_file("hookwire.toml")
//!     .build()?;
//!
//! runtime.register_plugin(Moderation)?;
//! runtime.register_backend(ConsoleBackend::new()).await?;
//! runtime.run().await?;
//! ```

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hookwire_core::{
    Backend, BackendId, BackendResult, DispatchContext, EventReceiver, EventSender,
    GlobalContent, GlobalEvent, ListenerResponse, TypedEvent,
};
use hookwire_framework::{
    BackendHub, Command, HookRouter, ListenerSet, Plugin, StatsSnapshot,
};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::signal;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::{ConfigLoader, ConfigResult, HookwireConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

// =============================================================================
// Statistics
// =============================================================================

/// Event counters kept by the worker pool.
#[derive(Debug, Default)]
pub struct RuntimeStats {
    events_received: AtomicU64,
    events_processed: AtomicU64,
    events_timed_out: AtomicU64,
}

impl RuntimeStats {
    fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    fn record_processed(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_timed_out(&self) {
        self.events_timed_out.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of the runtime and routing counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeSnapshot {
    pub events_received: u64,
    pub events_processed: u64,
    pub events_timed_out: u64,
    pub routing: StatsSnapshot,
}

// =============================================================================
// Event pump
// =============================================================================

#[derive(Clone)]
struct Pump {
    workers: Arc<Semaphore>,
    cancel: CancellationToken,
    timeout: Option<Duration>,
    capacity: usize,
    stats: Arc<RuntimeStats>,
}

impl Pump {
    async fn run<B: Backend>(self, hub: Arc<BackendHub<B>>, mut events: EventReceiver<B::Kind>) {
        debug!("Event pump started");
        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => {
                        debug!("Backend closed its event stream");
                        break;
                    }
                },
            };
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                permit = Arc::clone(&self.workers).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            self.stats.record_received();

            let hub = Arc::clone(&hub);
            let stats = Arc::clone(&self.stats);
            let timeout = self.timeout;
            tokio::spawn(
                async move {
                    let _permit = permit;
                    let dispatch = hub.dispatch(event.kind, event.raw);
                    let finished = match timeout {
                        Some(limit) => tokio::time::timeout(limit, dispatch).await.is_ok(),
                        None => {
                            dispatch.await;
                            true
                        }
                    };
                    if finished {
                        stats.record_processed();
                    } else {
                        stats.record_timed_out();
                        warn!(timeout = ?timeout, "Event processing timed out");
                    }
                }
                .in_current_span(),
            );
        }
        events.close();
        debug!("Event pump stopped");
    }
}

/// A registered backend with its type erased.
#[async_trait]
trait BackendDriver: Send + Sync {
    fn id(&self) -> &BackendId;

    fn apply(&self, listeners: &ListenerSet) -> usize;

    /// Boots the backend and spawns its event pump.
    async fn start(self: Arc<Self>, pump: Pump) -> BackendResult<JoinHandle<()>>;

    async fn stop(&self) -> BackendResult<()>;
}

#[async_trait]
impl<B: Backend> BackendDriver for BackendHub<B> {
    fn id(&self) -> &BackendId {
        BackendHub::id(self)
    }

    fn apply(&self, listeners: &ListenerSet) -> usize {
        BackendHub::apply(self, listeners)
    }

    async fn start(self: Arc<Self>, pump: Pump) -> BackendResult<JoinHandle<()>> {
        let (sender, receiver) = EventSender::channel(pump.capacity);
        self.backend().boot(sender).await?;
        let span = info_span!("pump", backend = %self.id());
        Ok(tokio::spawn(pump.run(self, receiver).instrument(span)))
    }

    async fn stop(&self) -> BackendResult<()> {
        self.backend().shutdown().await
    }
}

struct Session {
    pump: Pump,
    pumps: Vec<JoinHandle<()>>,
}

// =============================================================================
// HookwireRuntime
// =============================================================================

/// Owns the router, the registered backends and the worker pool.
pub struct HookwireRuntime {
    config: HookwireConfig,
    router: Arc<HookRouter>,
    backends: RwLock<Vec<Arc<dyn BackendDriver>>>,
    registration: Mutex<()>,
    workers: Arc<Semaphore>,
    worker_permits: u32,
    session: Mutex<Option<Session>>,
    running: AtomicBool,
    stats: Arc<RuntimeStats>,
}

impl HookwireRuntime {
    /// Creates a runtime from the configuration found in the current directory.
    ///
    /// Falls back to defaults if no valid configuration can be loaded.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("hookwire: falling back to default configuration: {e}");
                HookwireConfig::default()
            });
        Self::from_config(&config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from `config`, initializing logging.
    pub fn from_config(config: &HookwireConfig) -> Self {
        logging::init_from_config(&config.logging);

        let worker_permits = u32::try_from(config.runtime.max_concurrent_events)
            .unwrap_or(u32::MAX)
            .max(1);
        let router = HookRouter::new().with_config(config.commands.clone());

        info!(
            log_level = %config.logging.level,
            prefix = ?config.commands.prefix,
            workers = worker_permits,
            "Runtime configured"
        );

        Self {
            config: config.clone(),
            router: Arc::new(router),
            backends: RwLock::new(Vec::new()),
            registration: Mutex::new(()),
            workers: Arc::new(Semaphore::new(worker_permits as usize)),
            worker_permits,
            session: Mutex::new(None),
            running: AtomicBool::new(false),
            stats: Arc::new(RuntimeStats::default()),
        }
    }

    pub fn config(&self) -> &HookwireConfig {
        &self.config
    }

    /// The shared router: catalog, global listeners and command routing.
    pub fn router(&self) -> &Arc<HookRouter> {
        &self.router
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Identifiers of the registered backends.
    pub fn backends(&self) -> Vec<BackendId> {
        self.backends.read().iter().map(|b| b.id().clone()).collect()
    }

    /// Current counters.
    pub fn stats(&self) -> RuntimeSnapshot {
        RuntimeSnapshot {
            events_received: self.stats.events_received.load(Ordering::Relaxed),
            events_processed: self.stats.events_processed.load(Ordering::Relaxed),
            events_timed_out: self.stats.events_timed_out.load(Ordering::Relaxed),
            routing: self.router.stats().snapshot(),
        }
    }

    /// Registers a backend.
    ///
    /// Scoped listeners of every registered plugin are applied to it. If the
    /// runtime is already running the backend is booted right away.
    pub async fn register_backend<B: Backend>(
        &self,
        backend: B,
    ) -> RuntimeResult<Arc<BackendHub<B>>> {
        // Pushing and reading the session under one guard means exactly one of
        // this call and `boot` starts the hub.
        let (hub, pump) = {
            let _registration = self.registration.lock();
            let id = backend.id();
            if self.backends.read().iter().any(|b| *b.id() == id) {
                return Err(RuntimeError::BackendExists(id.to_string()));
            }
            let hub = Arc::new(BackendHub::new(Arc::new(backend), Arc::clone(&self.router)));
            self.backends
                .write()
                .push(Arc::clone(&hub) as Arc<dyn BackendDriver>);
            let pump = self.session.lock().as_ref().map(|s| s.pump.clone());
            (hub, pump)
        };
        info!(backend = %hub.id(), "Registered backend");

        if let Some(pump) = pump {
            let handle = Arc::clone(&hub).start(pump).await?;
            match self.session.lock().as_mut() {
                Some(session) => session.pumps.push(handle),
                None => handle.abort(),
            }
            info!(backend = %hub.id(), "Backend booted");
        }
        Ok(hub)
    }

    /// Registers a plugin's commands and listeners.
    ///
    /// Nothing is registered if any command is invalid or conflicts.
    pub fn register_plugin<P: Plugin>(&self, plugin: P) -> RuntimeResult<()> {
        let _registration = self.registration.lock();
        let listeners = self.router.register_plugin(&plugin)?;
        for backend in self.backends.read().iter() {
            backend.apply(&listeners);
        }
        Ok(())
    }

    /// Registers a single command.
    pub fn register_command(&self, command: Command) -> RuntimeResult<()> {
        Ok(self.router.register(command)?)
    }

    /// Binds `handler` to a canonical kind on every backend.
    pub fn listen_global<T, F, Fut, R>(&self, event: TypedEvent<GlobalEvent, T>, handler: F)
    where
        T: GlobalContent,
        F: Fn(Arc<DispatchContext>, T) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerResponse,
    {
        self.router.listen_global(event, handler);
    }

    /// Boots every registered backend and starts their event pumps.
    ///
    /// Calling it again while running does nothing. A backend that fails to
    /// boot is logged and skipped.
    pub async fn boot(&self) -> RuntimeResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Boot requested while already running");
            return Ok(());
        }
        info!("Starting Hookwire runtime");

        let pump = Pump {
            workers: Arc::clone(&self.workers),
            cancel: CancellationToken::new(),
            timeout: self.config.runtime.handler_timeout(),
            capacity: self.config.runtime.event_queue_capacity,
            stats: Arc::clone(&self.stats),
        };
        let backends: Vec<_> = {
            let _registration = self.registration.lock();
            *self.session.lock() = Some(Session {
                pump: pump.clone(),
                pumps: Vec::new(),
            });
            self.backends.read().clone()
        };
        for backend in backends {
            match Arc::clone(&backend).start(pump.clone()).await {
                Ok(handle) => {
                    if let Some(session) = self.session.lock().as_mut() {
                        session.pumps.push(handle);
                    }
                    info!(backend = %backend.id(), "Backend booted");
                }
                Err(e) => {
                    error!(backend = %backend.id(), error = %e, "Failed to boot backend");
                }
            }
        }

        info!(backends = self.backends.read().len(), "Event processing started");
        Ok(())
    }

    /// Stops the pumps, waits for in-flight events and shuts every backend down.
    pub async fn shutdown(&self) -> RuntimeResult<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Shutdown requested while stopped");
            return Ok(());
        }
        info!("Stopping Hookwire runtime");

        let session = self.session.lock().take();
        if let Some(session) = session {
            session.pump.cancel.cancel();
            for pump in session.pumps {
                if let Err(e) = pump.await {
                    error!(error = %e, "Event pump panicked");
                }
            }
        }

        match self.workers.acquire_many(self.worker_permits).await {
            Ok(_drained) => debug!("In-flight events finished"),
            Err(e) => warn!(error = %e, "Worker pool closed before draining"),
        }

        let backends: Vec<_> = self.backends.read().clone();
        for backend in &backends {
            if let Err(e) = backend.stop().await {
                error!(backend = %backend.id(), error = %e, "Error during backend shutdown");
            }
        }

        info!(backends = backends.len(), "Event processing stopped");
        Ok(())
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.boot().await?;
        info!("Hookwire runtime is now running. Press Ctrl+C to stop.");
        wait_for_shutdown().await;
        self.shutdown().await
    }

    /// Runs until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.boot().await?;
        shutdown.await;
        self.shutdown().await
    }
}

impl Default for HookwireRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HookwireRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookwireRuntime")
            .field("backends", &self.backends())
            .field("router", &self.router)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Unable to listen for SIGTERM"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Unable to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder loading the configuration before creating a [`HookwireRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: HookwireConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> ConfigResult<HookwireRuntime> {
        let config = self.config_loader.load()?;
        Ok(HookwireRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
