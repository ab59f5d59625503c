//! Configuration for the Hookwire runtime.
//!
//! Settings are layered with figment (defaults, config files, `HOOKWIRE_*`
//! environment variables, programmatic merges) and checked by
//! [`validate_config`] before the runtime uses them.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    HookwireConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, RuntimeConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
