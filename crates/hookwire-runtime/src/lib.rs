//! Runtime orchestration for Hookwire.
//!
//! [`HookwireRuntime`] loads a [`HookwireConfig`], installs logging, owns the
//! command router and the registered backends, and drains every backend's
//! event channel into a bounded worker pool.
//!
//! ```ignore
//! use hookwire_runtime::HookwireRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HookwireRuntime::builder().profile("production").build()?;
//!     runtime.register_plugin(Greeter)?;
//!     runtime.register_backend(ConsoleBackend::new()).await?;
//!     runtime.run().await?; // until Ctrl+C or SIGTERM
//!     Ok(())
//! }
//! ```
//!
//! # Event flow
//!
//! A backend pushes `(kind, raw payload)` pairs into the channel it receives
//! at boot. The runtime pumps each channel into the worker pool, where the
//! backend's hub fans the event out to scoped listeners, translates it and,
//! for canonical kinds, to global listeners and the command router.

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, HookwireConfig, LogFormat, LogLevel, LogOutput,
    LogRotation, LoggingConfig, RuntimeConfig, SpanEventConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{HookwireRuntime, RuntimeBuilder, RuntimeSnapshot, RuntimeStats};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros for plugin and backend code.
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
