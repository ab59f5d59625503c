//! Runtime error types.

use hookwire_core::BackendError;
use hookwire_framework::CommandError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating the configuration failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A command or plugin could not be registered.
    #[error("Registration failed: {0}")]
    Command(#[from] CommandError),

    /// A backend failed to boot or shut down.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// A backend with the same identifier is already registered.
    #[error("Backend already exists: {0}")]
    BackendExists(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
