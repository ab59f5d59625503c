//! Error types for the Hookwire core.

use std::fmt;

use thiserror::Error;

use crate::event::GlobalEvent;

/// A raw payload could not be decoded into the type a listener expects.
///
/// Decode failures are reported back to the dispatcher as a listener outcome;
/// they never abort dispatch of the remaining listeners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to decode {target}: {reason}")]
pub struct DecodeError {
    /// Name of the type (or canonical kind) decoding targeted.
    pub target: String,
    /// Human-readable failure reason.
    pub reason: String,
}

impl DecodeError {
    /// Creates a decode error for the given target.
    pub fn new(target: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an error for a canonical payload that carries the wrong variant.
    pub fn mismatch(expected: GlobalEvent, got: GlobalEvent) -> Self {
        Self::new(expected.name(), format_args!("payload carries `{got}`"))
    }

    /// Creates an error for a canonical kind the backend cannot produce.
    pub fn unsupported(kind: GlobalEvent) -> Self {
        Self::new(kind.name(), "no decoder registered for this kind")
    }
}

/// Errors raised by backend connectors.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend failed to start.
    #[error("backend `{backend}` failed to boot: {reason}")]
    Boot { backend: String, reason: String },

    /// The backend failed to shut down cleanly.
    #[error("backend `{backend}` failed to shut down: {reason}")]
    Shutdown { backend: String, reason: String },

    /// Sending content through the backend failed.
    #[error("failed to send: {0}")]
    Send(String),

    /// The backend does not support this operation.
    #[error("operation `{0}` is not supported by this backend")]
    Unsupported(&'static str),

    /// The event channel towards the router is closed.
    #[error("event channel closed")]
    ChannelClosed,
}

impl BackendError {
    /// Creates a boot error.
    pub fn boot(backend: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::Boot {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a shutdown error.
    pub fn shutdown(backend: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::Shutdown {
            backend: backend.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a send error.
    pub fn send(reason: impl fmt::Display) -> Self {
        Self::Send(reason.to_string())
    }
}

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
