//! # Hookwire
//!
//! A typed, backend-agnostic integration layer for chat bots.
//!
//! ## Overview
//!
//! Backends (one per chat platform instance) push raw events. Hookwire fans
//! each event out to the listeners registered for its native kind, translates
//! it to a canonical kind when the backend knows one, and routes canonical
//! messages through the command system.
//!
//! ```text
//! ┌─────────┐ (kind, raw) ┌────────────┐ scoped listeners
//! │ Backend │────────────▶│ BackendHub │──────────────────▶ ...
//! └─────────┘             └────────────┘
//!                               │ translate + decode
//!                               ▼
//!                         ┌────────────┐ global listeners
//!                         │ HookRouter │──────────────────▶ ...
//!                         └────────────┘
//!                               │ MessageCreate
//!                               ▼
//!                       ┌───────────────┐ resolve, check, run
//!                       │ CommandRouter │─────────────────────▶ handler
//!                       └───────────────┘
//! ```
//!
//! - **Runtime**: owns backends, plugins and the event worker pool
//! - **Backends**: connectors implementing [`core::Backend`]
//! - **Plugins**: bundles of commands and listeners
//! - **Commands**: triggers with typed, positional arguments
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hookwire::prelude::*;
//!
//! struct Greeter;
//!
//! impl Plugin for Greeter {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     fn commands(&self) -> Vec<Command> {
//!         vec![Command::new("hello")
//!             .arg(ArgumentSpec::optional("name", StringArg))
//!             .execute(|event: CommandEvent, args: Arguments| async move {
//!                 let name = args.optional::<String>("name")?
//!                     .unwrap_or_else(|| event.user().mention());
//!                 Ok::<_, CommandError>(format!("Hello, {name}!"))
//!             })]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HookwireRuntime::new();
//!     runtime.register_plugin(Greeter)?;
//!     runtime.register_backend(MyBackend::new()).await?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use hookwire_core as core;
pub use hookwire_framework as framework;
pub use hookwire_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use hookwire::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use hookwire_runtime::{HookwireConfig, HookwireRuntime, RuntimeError, RuntimeResult};

    // Plugins and listeners
    pub use hookwire_framework::{HookRouter, ListenerSet, Plugin};

    // Commands
    pub use hookwire_framework::command::{
        ArgumentSpec, Arguments, BoolArg, Command, CommandEvent, CommandPrefix, ErrorTranslator,
        FloatArg, IdCheck, IntArg, ListArg, PermissionCheck, RouterConfig, StringArg, UIntArg,
        UuidArg,
    };
    pub use hookwire_framework::{CommandError, CommandResult};

    // Events and backends
    pub use hookwire_core::{
        Backend, BackendError, BackendId, BackendResult, Channel, DecodeError, DecodeResult,
        DispatchContext, EventRegistry, EventSender, GlobalEvent, GlobalPayload, MESSAGE_CREATE,
        Message, REACTION_ADD, Reaction, TypedEvent, User, json_payload,
    };
}
