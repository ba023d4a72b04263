//! Configuration validation.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{CommandsConfig, LogLevel, LogOutput, LoggingConfig, SigilConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &SigilConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_commands_config(&config.commands)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    for (target, level) in &logging.filters {
        if target.is_empty() {
            return Err(ConfigError::validation("Log filter target cannot be empty"));
        }
        if !LogLevel::NAMES.contains(&level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(format!(
                "Invalid log level for {target}: {level}. Valid values are: {:?}",
                LogLevel::NAMES
            )));
        }
    }

    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    Ok(())
}

fn validate_commands_config(commands: &CommandsConfig) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for guild_id in &commands.guild_ids {
        if !seen.insert(*guild_id) {
            return Err(ConfigError::DuplicateGuildId(*guild_id));
        }
    }

    if commands.default_locale.trim().is_empty() {
        return Err(ConfigError::missing_field("commands.default_locale"));
    }

    if commands.cooldown_cleanup_secs == 0 {
        return Err(ConfigError::validation(
            "Cooldown cleanup interval must be greater than 0",
        ));
    }

    let template = &commands.messages.internal_error;
    if template.trim().is_empty() {
        return Err(ConfigError::missing_field("commands.messages.internal_error"));
    }
    if !template.contains("{id}") {
        return Err(ConfigError::validation(
            "Internal error message must contain the {id} placeholder",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&SigilConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_filter_level() {
        let mut config = SigilConfig::default();
        config
            .logging
            .filters
            .insert("sigil_framework".into(), "loud".into());

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("sigil_framework"));
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = SigilConfig::default();
        config.logging.output = LogOutput::File;

        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.logging.file_path = Some("logs/sigil.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_duplicate_guild() {
        let mut config = SigilConfig::default();
        config.commands.guild_ids = vec![1, 2, 1];

        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::DuplicateGuildId(1))
        ));
    }

    #[test]
    fn test_template_needs_placeholder() {
        let mut config = SigilConfig::default();
        config.commands.messages.internal_error = "Oops".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        config.commands.messages.internal_error = "  ".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_zero_cleanup_interval() {
        let mut config = SigilConfig::default();
        config.commands.cooldown_cleanup_secs = 0;
        assert!(validate_config(&config).is_err());

        config.commands.cooldown_cleanup_secs = 1;
        config.commands.default_locale = String::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }
}
