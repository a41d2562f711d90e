use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Cache TTL and sweep interval are not 0
/// - Upload limit and history capacity are not 0
/// - Tool timeout is not 0
/// - Background colour parses
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.cache.ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cache.ttl_secs cannot be 0".to_string(),
        ));
    }

    if config.cache.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cache.sweep_interval_secs cannot be 0".to_string(),
        ));
    }

    if config.limits.max_upload_mb == 0 {
        return Err(ConfigError::ValidationError(
            "limits.max_upload_mb cannot be 0".to_string(),
        ));
    }

    if config.history.capacity == 0 {
        return Err(ConfigError::ValidationError(
            "history.capacity cannot be 0".to_string(),
        ));
    }

    if config.converter.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.converter.background_rgb().is_none() {
        return Err(ConfigError::ValidationError(format!(
            "converter.background_color must be #rrggbb or a colour name, got {:?}",
            config.converter.background_color
        )));
    }

    Ok(())
}
