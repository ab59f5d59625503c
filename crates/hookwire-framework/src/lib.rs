//! # Hookwire Framework
//!
//! Commands and event routing on top of `hookwire-core`:
//!
//! - [`command`]: argument specs and resolution, command definitions, the
//!   catalog and the router that turns messages into invocations.
//! - [`ListenerSet`] and [`Plugin`]: bundles of commands and listeners
//!   registered together.
//! - [`HookRouter`]: the registries shared by every backend plus the global
//!   dispatch path.
//! - [`BackendHub`]: one backend, its native dispatch table and the bridge
//!   into the global layer.

pub mod command;
pub mod error;
pub mod hooks;
pub mod hub;
pub mod listener;
pub mod plugin;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{
    ArgumentSpec, Arguments, Command, CommandCatalog, CommandEvent, CommandPrefix, CommandRouter,
    ErrorTranslator, IdCheck, PermissionCheck, RouteOutcome, RouterConfig,
};
pub use error::{CommandError, CommandResult};
pub use hooks::{GlobalReport, HookRouter};
pub use hub::{BackendHub, DispatchReport};
pub use listener::ListenerSet;
pub use plugin::Plugin;
pub use stats::{RouterStats, StatsSnapshot};
