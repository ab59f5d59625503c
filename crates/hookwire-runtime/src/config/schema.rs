//! Serde shape of `hookwire.toml`.
//!
//! ```toml
//! [commands]
//! prefix = { literal = "!" }
//! enabled = true
//!
//! [logging]
//! level = "debug"
//! format = "pretty"
//!
//! [logging.filters]
//! hookwire_core = "trace"
//!
//! [runtime]
//! max_concurrent_events = 32
//! handler_timeout_secs = 30
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use hookwire_framework::RouterConfig;
use serde::{Deserialize, Serialize};

/// Everything the runtime reads from configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookwireConfig {
    /// Command prefix and routing switch.
    #[serde(default)]
    pub commands: RouterConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Event processing settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Newline-delimited JSON, requires the `json-log` feature.
    #[cfg(feature = "json-log")]
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// The file at [`LoggingConfig::file_path`].
    File,
}

/// How often the log file is rotated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    pub span_events: SpanEventConfig,
    /// Include thread ids in each line.
    pub thread_ids: bool,
    /// Include source file and line in each line.
    pub file_location: bool,
    /// Log file, required when `output` is `file`.
    pub file_path: Option<PathBuf>,
    pub rotation: LogRotation,
    /// Per-module levels, e.g. `hookwire_framework = "debug"`.
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::Never,
            filters: HashMap::new(),
        }
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// Event processing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Inbound events processed at the same time, across all backends.
    pub max_concurrent_events: usize,
    /// Events buffered per backend before the backend has to wait.
    pub event_queue_capacity: usize,
    /// Upper bound on processing one event; unbounded when unset.
    pub handler_timeout_secs: Option<u64>,
}

impl RuntimeConfig {
    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_events: 64,
            event_queue_capacity: 256,
            handler_timeout_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookwire_framework::CommandPrefix;

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: HookwireConfig = serde_json::from_str(
            r#"{
                "commands": { "prefix": { "literal": "?" } },
                "logging": { "level": "debug", "filters": { "hookwire_core": "trace" } },
                "runtime": { "handler_timeout_secs": 5 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.commands.prefix, CommandPrefix::literal("?"));
        assert!(config.commands.enabled);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.filters["hookwire_core"], LogLevel::Trace);
        assert_eq!(config.logging.output, LogOutput::Stdout);
        assert_eq!(config.runtime.max_concurrent_events, 64);
        assert_eq!(config.runtime.handler_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let parsed = serde_json::from_str::<LoggingConfig>(r#"{ "level": "loud" }"#);
        assert!(parsed.is_err());
    }
}
