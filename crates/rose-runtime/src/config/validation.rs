//! Configuration validation utilities.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LOG_LEVELS, LogOutput, LoggingConfig, ModulesConfig, RoseConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &RoseConfig) -> ConfigResult<()> {
    validate_logging(&config.logging)?;
    validate_limits(config)?;
    validate_modules(&config.modules)?;
    Ok(())
}

fn validate_level(level: &str) -> ConfigResult<()> {
    if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        return Err(ConfigError::validation(format!(
            "Invalid log level: {level}. Valid values are: {LOG_LEVELS:?}"
        )));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    validate_level(&logging.level)?;
    for level in logging.filters.values() {
        validate_level(level)?;
    }
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

fn validate_limits(config: &RoseConfig) -> ConfigResult<()> {
    let limits = [
        ("bot.workers", config.bot.workers as u64),
        ("help.page_size", config.help.page_size as u64),
        ("help.columns", config.help.columns as u64),
        ("callbacks.timeout_ms", config.callbacks.timeout_ms),
        ("logging.max_files", config.logging.max_files as u64),
    ];
    for (field, value) in limits {
        if value == 0 {
            return Err(ConfigError::validation(format!(
                "{field} must be greater than 0"
            )));
        }
    }
    Ok(())
}

fn validate_modules(modules: &ModulesConfig) -> ConfigResult<()> {
    if modules
        .load
        .iter()
        .chain(&modules.no_load)
        .any(|name| name.trim().is_empty())
    {
        return Err(ConfigError::validation("Module names cannot be empty"));
    }

    let denied: HashSet<String> = modules.no_load.iter().map(|n| n.to_lowercase()).collect();
    if let Some(name) = modules
        .load
        .iter()
        .find(|n| denied.contains(&n.to_lowercase()))
    {
        return Err(ConfigError::ConflictingModule(name.clone()));
    }
    Ok(())
}
