//! Provider identity: the five supported LLM backends and the template override.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A named LLM backend.
///
/// Ollama and Custom are self-hosted ("local"); the rest are hosted APIs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    Google,
    Anthropic,
    Ollama,
    Custom,
}

impl Provider {
    /// Every provider, in registry order.
    pub const ALL: [Provider; 5] = [
        Provider::OpenAi,
        Provider::Google,
        Provider::Anthropic,
        Provider::Ollama,
        Provider::Custom,
    ];

    /// Lowercase identifier used in the `LLM` setting.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Google => "google",
            Provider::Anthropic => "anthropic",
            Provider::Ollama => "ollama",
            Provider::Custom => "custom",
        }
    }

    /// Human-readable name for logs and CLI output.
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Google => "Google",
            Provider::Anthropic => "Anthropic",
            Provider::Ollama => "Ollama",
            Provider::Custom => "Custom",
        }
    }

    /// Whether this is a self-hosted backend.
    pub fn is_local(self) -> bool {
        matches!(self, Provider::Ollama | Provider::Custom)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "google" => Ok(Provider::Google),
            "anthropic" => Ok(Provider::Anthropic),
            "ollama" => Ok(Provider::Ollama),
            "custom" => Ok(Provider::Custom),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// Operator override for template generation (`TEMPLATE_LLM_PROVIDER`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateProviderOverride {
    /// Use the heuristic default.
    #[default]
    Unset,
    /// Reuse the content provider.
    Local,
    /// Force the hosted template model.
    Api,
}

impl TemplateProviderOverride {
    pub const ALL: [TemplateProviderOverride; 3] = [
        TemplateProviderOverride::Unset,
        TemplateProviderOverride::Local,
        TemplateProviderOverride::Api,
    ];

    /// Parse the raw setting. Absent, blank, or `"unset"` all mean `Unset`.
    pub fn parse(raw: Option<&str>) -> Result<Self, ConfigError> {
        let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(TemplateProviderOverride::Unset);
        };
        match value.to_ascii_lowercase().as_str() {
            "unset" => Ok(TemplateProviderOverride::Unset),
            "local" => Ok(TemplateProviderOverride::Local),
            "api" => Ok(TemplateProviderOverride::Api),
            _ => Err(ConfigError::InvalidOverride(value.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateProviderOverride::Unset => "unset",
            TemplateProviderOverride::Local => "local",
            TemplateProviderOverride::Api => "api",
        }
    }
}

impl fmt::Display for TemplateProviderOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
