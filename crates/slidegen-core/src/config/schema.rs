//! Configuration schema: the flat settings surface.
//!
//! The JSON file on disk uses the same **SCREAMING_SNAKE_CASE** key names as
//! the environment (`LLM`, `OLLAMA_URL`, `OPENAI_API_KEY`, …), so a file can be
//! produced by dumping the env and vice versa.
//!
//! Every field is optional here. Whether a value is *required* depends on
//! which provider ends up being used, and that is decided (and validated)
//! by the provider registry at resolution time, not at load time.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::provider::Provider;
use crate::types::CallOptions;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Raw settings: loaded from `~/.slidegen/config.json` + env vars.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Config {
    /// Content provider (`openai|google|anthropic|ollama|custom`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<String>,
    /// Template override (`local|api|unset`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_llm_provider: Option<String>,

    // ── Local providers ──
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_llm_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_llm_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_model: Option<String>,

    // ── Hosted providers ──
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_model: Option<String>,

    // ── Per-call toggles ──
    #[serde(deserialize_with = "deserialize_flag", skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<bool>,
    #[serde(deserialize_with = "deserialize_flag", skip_serializing_if = "Option::is_none")]
    pub disable_thinking: Option<bool>,
    #[serde(deserialize_with = "deserialize_flag", skip_serializing_if = "Option::is_none")]
    pub extended_reasoning: Option<bool>,
    #[serde(deserialize_with = "deserialize_flag", skip_serializing_if = "Option::is_none")]
    pub web_grounding: Option<bool>,
}

/// Every recognised key, in file order.
pub const CONFIG_KEYS: &[&str] = &[
    "LLM",
    "TEMPLATE_LLM_PROVIDER",
    "OLLAMA_URL",
    "OLLAMA_MODEL",
    "CUSTOM_LLM_URL",
    "CUSTOM_LLM_API_KEY",
    "CUSTOM_MODEL",
    "OPENAI_API_KEY",
    "OPENAI_MODEL",
    "GOOGLE_API_KEY",
    "GOOGLE_MODEL",
    "ANTHROPIC_API_KEY",
    "ANTHROPIC_MODEL",
    "TOOL_CALLS",
    "DISABLE_THINKING",
    "EXTENDED_REASONING",
    "WEB_GROUNDING",
];

// ─────────────────────────────────────────────
// Per-provider key names
// ─────────────────────────────────────────────

/// The setting keys that feed one provider's configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderKeys {
    pub model: &'static str,
    pub api_key: Option<&'static str>,
    pub endpoint_url: Option<&'static str>,
}

impl ProviderKeys {
    pub const fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::OpenAi => ProviderKeys {
                model: "OPENAI_MODEL",
                api_key: Some("OPENAI_API_KEY"),
                endpoint_url: None,
            },
            Provider::Google => ProviderKeys {
                model: "GOOGLE_MODEL",
                api_key: Some("GOOGLE_API_KEY"),
                endpoint_url: None,
            },
            Provider::Anthropic => ProviderKeys {
                model: "ANTHROPIC_MODEL",
                api_key: Some("ANTHROPIC_API_KEY"),
                endpoint_url: None,
            },
            Provider::Ollama => ProviderKeys {
                model: "OLLAMA_MODEL",
                api_key: None,
                endpoint_url: Some("OLLAMA_URL"),
            },
            Provider::Custom => ProviderKeys {
                model: "CUSTOM_MODEL",
                api_key: Some("CUSTOM_LLM_API_KEY"),
                endpoint_url: Some("CUSTOM_LLM_URL"),
            },
        }
    }
}

impl Config {
    /// Look up a string setting by key. Blank values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        let slot = match key {
            "LLM" => &self.llm,
            "TEMPLATE_LLM_PROVIDER" => &self.template_llm_provider,
            "OLLAMA_URL" => &self.ollama_url,
            "OLLAMA_MODEL" => &self.ollama_model,
            "CUSTOM_LLM_URL" => &self.custom_llm_url,
            "CUSTOM_LLM_API_KEY" => &self.custom_llm_api_key,
            "CUSTOM_MODEL" => &self.custom_model,
            "OPENAI_API_KEY" => &self.openai_api_key,
            "OPENAI_MODEL" => &self.openai_model,
            "GOOGLE_API_KEY" => &self.google_api_key,
            "GOOGLE_MODEL" => &self.google_model,
            "ANTHROPIC_API_KEY" => &self.anthropic_api_key,
            "ANTHROPIC_MODEL" => &self.anthropic_model,
            _ => return None,
        };
        slot.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// Set a setting by key from its string form.
    ///
    /// Returns `false` for unknown keys. Flag keys accept `true|1|yes|on`
    /// and `false|0|no|off`; anything else is logged and the current value
    /// is kept.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let slot = match key {
            "TOOL_CALLS" => return set_flag(key, &mut self.tool_calls, &value),
            "DISABLE_THINKING" => return set_flag(key, &mut self.disable_thinking, &value),
            "EXTENDED_REASONING" => return set_flag(key, &mut self.extended_reasoning, &value),
            "WEB_GROUNDING" => return set_flag(key, &mut self.web_grounding, &value),
            "LLM" => &mut self.llm,
            "TEMPLATE_LLM_PROVIDER" => &mut self.template_llm_provider,
            "OLLAMA_URL" => &mut self.ollama_url,
            "OLLAMA_MODEL" => &mut self.ollama_model,
            "CUSTOM_LLM_URL" => &mut self.custom_llm_url,
            "CUSTOM_LLM_API_KEY" => &mut self.custom_llm_api_key,
            "CUSTOM_MODEL" => &mut self.custom_model,
            "OPENAI_API_KEY" => &mut self.openai_api_key,
            "OPENAI_MODEL" => &mut self.openai_model,
            "GOOGLE_API_KEY" => &mut self.google_api_key,
            "GOOGLE_MODEL" => &mut self.google_model,
            "ANTHROPIC_API_KEY" => &mut self.anthropic_api_key,
            "ANTHROPIC_MODEL" => &mut self.anthropic_model,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Configured model for a provider.
    pub fn model(&self, provider: Provider) -> Option<&str> {
        self.get(ProviderKeys::for_provider(provider).model)
    }

    /// Configured API key for a provider (None for providers without one).
    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        ProviderKeys::for_provider(provider)
            .api_key
            .and_then(|key| self.get(key))
    }

    /// Configured endpoint URL for a provider (None for hosted APIs).
    pub fn endpoint_url(&self, provider: Provider) -> Option<&str> {
        ProviderKeys::for_provider(provider)
            .endpoint_url
            .and_then(|key| self.get(key))
    }

    /// Process-wide call option defaults. Unset flags are `false`.
    pub fn call_options(&self) -> CallOptions {
        CallOptions {
            tool_calls_enabled: self.tool_calls.unwrap_or(false),
            disable_thinking: self.disable_thinking.unwrap_or(false),
            extended_reasoning: self.extended_reasoning.unwrap_or(false),
            web_grounding_enabled: self.web_grounding.unwrap_or(false),
        }
    }
}

// ─────────────────────────────────────────────
// Flag parsing
// ─────────────────────────────────────────────

/// Parse a boolean flag in the loose form env vars use.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn set_flag(key: &str, slot: &mut Option<bool>, raw: &str) -> bool {
    match parse_flag(raw) {
        Some(flag) => *slot = Some(flag),
        None => warn!(key, value = raw, "ignoring unrecognised boolean setting"),
    }
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Text(String),
}

/// Flags may be written as JSON booleans or as env-style strings.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawFlag>::deserialize(deserializer)? {
        None => None,
        Some(RawFlag::Bool(b)) => Some(b),
        Some(RawFlag::Text(s)) => parse_flag(&s),
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_empty() {
        let config = Config::default();
        assert!(config.get("LLM").is_none());
        assert_eq!(config.call_options(), CallOptions::default());
    }

    #[test]
    fn test_config_from_json_uses_env_key_names() {
        let json = serde_json::json!({
            "LLM": "ollama",
            "OLLAMA_URL": "http://localhost:11434",
            "OLLAMA_MODEL": "llama3.1",
            "TEMPLATE_LLM_PROVIDER": "local"
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.get("LLM"), Some("ollama"));
        assert_eq!(config.model(Provider::Ollama), Some("llama3.1"));
        assert_eq!(config.endpoint_url(Provider::Ollama), Some("http://localhost:11434"));
        assert_eq!(config.get("TEMPLATE_LLM_PROVIDER"), Some("local"));
    }

    #[test]
    fn test_flags_accept_bool_or_string() {
        let json = serde_json::json!({
            "TOOL_CALLS": true,
            "DISABLE_THINKING": "yes",
            "EXTENDED_REASONING": "0",
            "WEB_GROUNDING": null
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.tool_calls, Some(true));
        assert_eq!(config.disable_thinking, Some(true));
        assert_eq!(config.extended_reasoning, Some(false));
        assert_eq!(config.web_grounding, None);

        let options = config.call_options();
        assert!(options.tool_calls_enabled);
        assert!(options.disable_thinking);
        assert!(!options.extended_reasoning);
        assert!(!options.web_grounding_enabled);
    }

    #[test]
    fn test_blank_values_count_as_absent() {
        let mut config = Config::default();
        config.set("OPENAI_API_KEY", "   ");
        assert!(config.api_key(Provider::OpenAi).is_none());
    }

    #[test]
    fn test_set_unknown_key() {
        let mut config = Config::default();
        assert!(!config.set("NOT_A_KEY", "x"));
        assert!(config.set("GOOGLE_MODEL", "gemini-2.0-flash"));
        assert_eq!(config.model(Provider::Google), Some("gemini-2.0-flash"));
    }

    #[test]
    fn test_every_key_is_settable() {
        let mut config = Config::default();
        for key in CONFIG_KEYS {
            assert!(config.set(key, "1"), "key {key} not settable");
        }
    }

    #[test]
    fn test_hosted_providers_have_no_endpoint_key() {
        for provider in [Provider::OpenAi, Provider::Google, Provider::Anthropic] {
            assert!(ProviderKeys::for_provider(provider).endpoint_url.is_none());
        }
        assert!(ProviderKeys::for_provider(Provider::Ollama).api_key.is_none());
    }

    #[test]
    fn test_serialization_skips_unset_keys() {
        let mut config = Config::default();
        config.set("LLM", "openai");
        let json = serde_json::to_value(&config).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj["LLM"], "openai");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("on"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_bad_flag_keeps_current_value() {
        let mut config = Config::default();
        assert!(config.set("TOOL_CALLS", "yes"));
        assert!(config.set("TOOL_CALLS", "maybe"));
        assert_eq!(config.tool_calls, Some(true));

        assert!(config.set("WEB_GROUNDING", "sometimes"));
        assert_eq!(config.web_grounding, None);

        assert!(config.set("TOOL_CALLS", "off"));
        assert_eq!(config.tool_calls, Some(false));
    }
}
