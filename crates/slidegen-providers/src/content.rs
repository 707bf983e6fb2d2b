//! Content provider resolution: which backend `LLM` names.

use slidegen_core::{Config, ConfigError, Provider};

/// Read the content provider from the `LLM` setting.
pub fn resolve(config: &Config) -> Result<Provider, ConfigError> {
    config
        .get("LLM")
        .ok_or(ConfigError::MissingSetting("LLM"))?
        .parse()
}
