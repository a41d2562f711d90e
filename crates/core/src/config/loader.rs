use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use super::{types::Config, ConfigError};

/// Load configuration from defaults with environment variable overrides
///
/// Nested keys use a double underscore: `ARCHLIGHT_CACHE__TTL_SECS=600`.
pub fn load_config() -> Result<Config, ConfigError> {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("ARCHLIGHT_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from a TOML string layered over the defaults
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::string(toml_str))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}
