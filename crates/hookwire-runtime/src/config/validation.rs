//! Checks that no figment source can express through the schema alone.

use hookwire_framework::{CommandPrefix, RouterConfig};

use super::error::{ConfigError, ConfigResult};
use super::schema::{HookwireConfig, LogOutput, LoggingConfig, RuntimeConfig};

/// Rejects configurations the runtime cannot start with.
pub fn validate_config(config: &HookwireConfig) -> ConfigResult<()> {
    validate_commands(&config.commands)?;
    validate_logging(&config.logging)?;
    validate_runtime(&config.runtime)
}

fn validate_commands(commands: &RouterConfig) -> ConfigResult<()> {
    match &commands.prefix {
        CommandPrefix::Literal(prefix) if prefix.trim().is_empty() => Err(ConfigError::invalid(
            "commands.prefix",
            "a literal prefix must contain a non-whitespace character",
        )),
        _ => Ok(()),
    }
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::invalid(
            "logging.file_path",
            "required when logging.output is \"file\"",
        ));
    }
    match logging.filters.keys().find(|module| module.trim().is_empty()) {
        Some(module) => Err(ConfigError::invalid(
            "logging.filters",
            format!("{module:?} is not a module path"),
        )),
        None => Ok(()),
    }
}

fn validate_runtime(runtime: &RuntimeConfig) -> ConfigResult<()> {
    let limits = [
        ("runtime.max_concurrent_events", runtime.max_concurrent_events),
        ("runtime.event_queue_capacity", runtime.event_queue_capacity),
    ];
    if let Some((field, _)) = limits.iter().find(|(_, value)| *value == 0) {
        return Err(ConfigError::invalid(*field, "must be greater than 0"));
    }
    if runtime.handler_timeout_secs == Some(0) {
        return Err(ConfigError::invalid(
            "runtime.handler_timeout_secs",
            "must be greater than 0 or left unset",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn invalid_field(config: &HookwireConfig) -> Option<&'static str> {
        assert_err!(validate_config(config)).field()
    }

    #[test]
    fn test_validate_default_config() {
        assert_ok!(validate_config(&HookwireConfig::default()));
    }

    #[test]
    fn test_validate_blank_prefix() {
        let mut config = HookwireConfig::default();
        config.commands.prefix = CommandPrefix::literal("  ");
        assert_eq!(invalid_field(&config), Some("commands.prefix"));
    }

    #[test]
    fn test_validate_file_output_without_path() {
        let mut config = HookwireConfig::default();
        config.logging.output = LogOutput::File;
        assert_eq!(invalid_field(&config), Some("logging.file_path"));

        config.logging.file_path = Some("hookwire.log".into());
        assert_ok!(validate_config(&config));
    }

    #[test]
    fn test_validate_runtime_limits() {
        let mut config = HookwireConfig::default();
        config.runtime.event_queue_capacity = 0;
        assert_eq!(invalid_field(&config), Some("runtime.event_queue_capacity"));

        let mut config = HookwireConfig::default();
        config.runtime.handler_timeout_secs = Some(0);
        assert_eq!(invalid_field(&config), Some("runtime.handler_timeout_secs"));
    }
}
