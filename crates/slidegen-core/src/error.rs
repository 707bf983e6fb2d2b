//! Configuration errors.
//!
//! These are always fatal: they are surfaced at startup or at the first
//! resolution and are never retried.

use thiserror::Error;

use crate::provider::Provider;

/// A missing or invalid provider setting.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A top-level setting such as `LLM` is absent or blank.
    #[error("{0} is not set")]
    MissingSetting(&'static str),

    /// A provider attribute required for this provider is absent or blank.
    #[error("{provider} is missing required field `{field}` (set {key})")]
    MissingRequiredField {
        provider: Provider,
        field: &'static str,
        key: &'static str,
    },

    /// A provider attribute is present but unusable.
    #[error("{provider} field `{field}` is invalid: {reason}")]
    InvalidField {
        provider: Provider,
        field: &'static str,
        reason: String,
    },

    /// `LLM` names a provider we do not support.
    #[error("unknown LLM provider '{0}' (expected one of openai, google, anthropic, ollama, custom)")]
    UnknownProvider(String),

    /// `TEMPLATE_LLM_PROVIDER` is not one of `local`, `api`, or unset.
    #[error("invalid TEMPLATE_LLM_PROVIDER '{0}' (expected local, api, or unset)")]
    InvalidOverride(String),

    /// A provider config was validated against the wrong provider.
    #[error("configuration for {found} cannot be used as {expected}")]
    ProviderMismatch { expected: Provider, found: Provider },
}

impl ConfigError {
    /// The config key an operator should fix, when there is one.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            ConfigError::MissingSetting(key) => Some(key),
            ConfigError::MissingRequiredField { key, .. } => Some(key),
            ConfigError::UnknownProvider(_) => Some("LLM"),
            ConfigError::InvalidOverride(_) => Some("TEMPLATE_LLM_PROVIDER"),
            ConfigError::InvalidField { .. } | ConfigError::ProviderMismatch { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message_names_key() {
        let err = ConfigError::MissingRequiredField {
            provider: Provider::Ollama,
            field: "endpoint_url",
            key: "OLLAMA_URL",
        };
        let msg = err.to_string();
        assert!(msg.contains("Ollama"));
        assert!(msg.contains("endpoint_url"));
        assert!(msg.contains("OLLAMA_URL"));
        assert_eq!(err.key(), Some("OLLAMA_URL"));
    }

    #[test]
    fn test_key_for_top_level_errors() {
        assert_eq!(ConfigError::MissingSetting("LLM").key(), Some("LLM"));
        assert_eq!(ConfigError::UnknownProvider("x".into()).key(), Some("LLM"));
        assert_eq!(
            ConfigError::InvalidOverride("x".into()).key(),
            Some("TEMPLATE_LLM_PROVIDER")
        );
    }
}
