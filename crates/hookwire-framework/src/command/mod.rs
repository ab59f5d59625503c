//! Text commands.
//!
//! A command is a trigger (optionally under a group), positional argument
//! specs, permission checks and a handler:
//!
//! ```rust,ignore
//! use hookwire_framework::command::*;
//!
//! let echo = Command::new("echo")
//!     .description("Repeats the given text")
//!     .arg(ArgumentSpec::required("content", StringArg).consuming())
//!     .execute(|_event: CommandEvent, args: Arguments| async move {
//!         args.get::<String>("content")
//!     });
//! ```
//!
//! Messages flow through [`CommandRouter`]: prefix check, catalog lookup,
//! [`resolve`] against the argument specs, permission checks, handler. Any
//! failure on the way is turned into a reply by an [`ErrorTranslator`].

pub mod argument;
pub mod catalog;
pub mod definition;
pub mod event;
pub mod permission;
pub mod resolver;
pub mod router;
pub mod translate;

pub use argument::{
    ArgValue, ArgumentSpec, ArgumentType, BoolArg, CustomValue, FloatArg, FromArgValue, IntArg,
    ListArg, StringArg, UIntArg, UuidArg,
};
pub use catalog::{CommandCatalog, CommandMatch};
pub use definition::{Command, CommandHandler, CommandResponse};
pub use event::CommandEvent;
pub use permission::{IdCheck, PermissionCheck};
pub use resolver::{Arguments, ResolvedArgument, resolve};
pub use router::{
    CommandPrefix, CommandRouter, InvocationReport, InvocationState, RouteOutcome, RouterConfig,
};
pub use translate::{DefaultErrorTranslator, ErrorTranslator};
