//! The backend-independent half of event routing.
//!
//! [`HookRouter`] owns everything shared by all backends: the command catalog
//! and router, the global dispatch table, registered plugins and statistics.
//! Backends reach it through their [`BackendHub`](crate::hub::BackendHub).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use hookwire_core::{
    DispatchContext, DispatchTable, GlobalContent, GlobalEvent, GlobalPayload, ListenerOutcome,
    ListenerResponse, TypedEvent,
};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::command::{
    Command, CommandCatalog, CommandRouter, ErrorTranslator, RouteOutcome, RouterConfig,
};
use crate::error::CommandResult;
use crate::listener::ListenerSet;
use crate::plugin::Plugin;
use crate::stats::RouterStats;

/// What one canonical event triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalReport {
    pub kind: GlobalEvent,
    /// Outcomes of the global listeners, in registration order.
    pub listeners: Vec<ListenerOutcome>,
    /// Command routing result, for message events only.
    pub commands: Option<RouteOutcome>,
}

struct PluginEntry {
    name: String,
    listeners: Arc<ListenerSet>,
}

/// Shared registries and the global dispatch path.
pub struct HookRouter {
    catalog: Arc<CommandCatalog>,
    commands: CommandRouter,
    global: DispatchTable<GlobalEvent, GlobalPayload>,
    plugins: RwLock<Vec<PluginEntry>>,
    stats: Arc<RouterStats>,
}

impl Default for HookRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl HookRouter {
    pub fn new() -> Self {
        let catalog = Arc::new(CommandCatalog::new());
        let stats = Arc::new(RouterStats::default());
        Self {
            commands: CommandRouter::new(Arc::clone(&catalog), Arc::clone(&stats)),
            catalog,
            global: DispatchTable::new(),
            plugins: RwLock::new(Vec::new()),
            stats,
        }
    }

    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.commands = self.commands.with_config(config);
        self
    }

    pub fn with_translator(mut self, translator: impl ErrorTranslator) -> Self {
        self.commands = self.commands.with_translator(translator);
        self
    }

    /// Registers a single command.
    pub fn register(&self, command: Command) -> CommandResult<()> {
        self.catalog.register(command)
    }

    /// Registers a plugin's commands and global listeners.
    ///
    /// Commands go in first and atomically; on error nothing of the plugin is
    /// registered. The returned set still holds the backend-scoped listeners,
    /// which the caller applies to each backend.
    pub fn register_plugin(&self, plugin: &dyn Plugin) -> CommandResult<Arc<ListenerSet>> {
        let commands = self.catalog.register_all(plugin.commands())?;

        let mut listeners = ListenerSet::new();
        plugin.listeners(&mut listeners);
        let global = listeners.apply_global(&self.global);
        let listeners = Arc::new(listeners);

        self.plugins.write().push(PluginEntry {
            name: plugin.name().to_owned(),
            listeners: Arc::clone(&listeners),
        });
        info!(plugin = plugin.name(), commands, global, "Plugin registered");
        Ok(listeners)
    }

    /// Names of registered plugins, in registration order.
    pub fn plugins(&self) -> Vec<String> {
        self.plugins.read().iter().map(|p| p.name.clone()).collect()
    }

    /// Listener sets of every registered plugin, in registration order.
    pub fn listener_sets(&self) -> Vec<Arc<ListenerSet>> {
        self.plugins
            .read()
            .iter()
            .map(|p| Arc::clone(&p.listeners))
            .collect()
    }

    /// Binds `handler` to a canonical kind.
    pub fn listen_global<T, F, Fut, R>(&self, event: TypedEvent<GlobalEvent, T>, handler: F)
    where
        T: GlobalContent,
        F: Fn(Arc<DispatchContext>, T) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ListenerResponse,
    {
        self.global.listen_global(event, handler);
    }

    pub fn global(&self) -> &DispatchTable<GlobalEvent, GlobalPayload> {
        &self.global
    }

    pub fn catalog(&self) -> &Arc<CommandCatalog> {
        &self.catalog
    }

    pub fn command_router(&self) -> &CommandRouter {
        &self.commands
    }

    pub fn stats(&self) -> &Arc<RouterStats> {
        &self.stats
    }

    /// Dispatches a decoded canonical event.
    ///
    /// Global listeners and, for messages, command routing run concurrently.
    pub async fn dispatch_global(
        &self,
        payload: GlobalPayload,
        ctx: Arc<DispatchContext>,
    ) -> GlobalReport {
        let kind = payload.kind();
        debug!(kind = %kind, backend = %ctx.backend(), "Dispatching global event");

        let routing = async {
            match payload.as_message() {
                Some(message) => Some(
                    self.commands
                        .route(Arc::clone(message), Arc::clone(&ctx))
                        .await,
                ),
                None => None,
            }
        };
        let (listeners, commands) = futures::join!(
            self.global.dispatch(&kind, payload.clone(), Arc::clone(&ctx)),
            routing
        );

        for outcome in &listeners {
            if !outcome.is_completed() {
                self.stats.record_listener_failure();
            }
        }

        GlobalReport {
            kind,
            listeners,
            commands,
        }
    }
}

impl fmt::Debug for HookRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRouter")
            .field("catalog", &self.catalog)
            .field("global", &self.global)
            .field("plugins", &self.plugins())
            .finish_non_exhaustive()
    }
}
