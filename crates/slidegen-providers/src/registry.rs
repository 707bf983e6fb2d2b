//! Provider registry: static specs for the five supported backends, plus
//! the per-process provider configurations built from settings.
//!
//! Each `ProviderSpec` describes what a provider needs (required and optional
//! fields, config keys, default endpoint) and which per-call options it
//! understands. `validate` checks a `ProviderConfig` against its spec.

use std::fmt;

use slidegen_core::config::{Config, ProviderKeys};
use slidegen_core::types::CallOptions;
use slidegen_core::{ConfigError, Provider};
use tracing::debug;

// ─────────────────────────────────────────────
// ProviderSpec: static metadata for one provider
// ─────────────────────────────────────────────

/// A provider attribute that may be required.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    ModelName,
    EndpointUrl,
    ApiKey,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::ModelName => "model_name",
            Field::EndpointUrl => "endpoint_url",
            Field::ApiKey => "api_key",
        }
    }

    /// The setting key that feeds this field for a provider.
    pub fn key(self, keys: &ProviderKeys) -> &'static str {
        match self {
            Field::ModelName => keys.model,
            Field::EndpointUrl => keys.endpoint_url.unwrap_or("endpoint_url"),
            Field::ApiKey => keys.api_key.unwrap_or("api_key"),
        }
    }
}

/// Per-call options a provider understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub tool_calls: bool,
    pub disable_thinking: bool,
    pub extended_reasoning: bool,
    pub web_grounding: bool,
}

impl Capabilities {
    /// Drop the options this provider does not support.
    ///
    /// Returns the filtered options and the names of the ones dropped.
    pub fn filter(&self, options: CallOptions) -> (CallOptions, Vec<&'static str>) {
        let mut dropped = Vec::new();
        let mut keep = |wanted: bool, supported: bool, name: &'static str| {
            if wanted && !supported {
                dropped.push(name);
            }
            wanted && supported
        };

        let filtered = CallOptions {
            tool_calls_enabled: keep(options.tool_calls_enabled, self.tool_calls, "tool_calls"),
            disable_thinking: keep(options.disable_thinking, self.disable_thinking, "disable_thinking"),
            extended_reasoning: keep(
                options.extended_reasoning,
                self.extended_reasoning,
                "extended_reasoning",
            ),
            web_grounding_enabled: keep(
                options.web_grounding_enabled,
                self.web_grounding,
                "web_grounding",
            ),
        };
        (filtered, dropped)
    }
}

/// Static specification describing one LLM provider.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    pub provider: Provider,
    /// Setting keys feeding this provider's config.
    pub keys: ProviderKeys,
    /// Fields that must be present and non-blank.
    pub required: &'static [Field],
    /// Fields that may be set.
    pub optional: &'static [Field],
    /// Default API base for hosted providers.
    pub default_api_base: Option<&'static str>,
    pub capabilities: Capabilities,
}

const HOSTED_CAPABILITIES: Capabilities = Capabilities {
    tool_calls: true,
    disable_thinking: false,
    extended_reasoning: true,
    web_grounding: true,
};

const LOCAL_CAPABILITIES: Capabilities = Capabilities {
    tool_calls: true,
    disable_thinking: true,
    extended_reasoning: false,
    web_grounding: false,
};

/// All supported providers, in `Provider::ALL` order.
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        provider: Provider::OpenAi,
        keys: ProviderKeys::for_provider(Provider::OpenAi),
        required: &[Field::ModelName, Field::ApiKey],
        optional: &[],
        default_api_base: Some("https://api.openai.com/v1"),
        capabilities: HOSTED_CAPABILITIES,
    },
    // Gemini through its OpenAI-compatible surface
    ProviderSpec {
        provider: Provider::Google,
        keys: ProviderKeys::for_provider(Provider::Google),
        required: &[Field::ModelName, Field::ApiKey],
        optional: &[],
        default_api_base: Some("https://generativelanguage.googleapis.com/v1beta/openai"),
        capabilities: HOSTED_CAPABILITIES,
    },
    ProviderSpec {
        provider: Provider::Anthropic,
        keys: ProviderKeys::for_provider(Provider::Anthropic),
        required: &[Field::ModelName, Field::ApiKey],
        optional: &[],
        default_api_base: Some("https://api.anthropic.com"),
        capabilities: HOSTED_CAPABILITIES,
    },
    ProviderSpec {
        provider: Provider::Ollama,
        keys: ProviderKeys::for_provider(Provider::Ollama),
        required: &[Field::ModelName, Field::EndpointUrl],
        optional: &[],
        default_api_base: None,
        capabilities: LOCAL_CAPABILITIES,
    },
    ProviderSpec {
        provider: Provider::Custom,
        keys: ProviderKeys::for_provider(Provider::Custom),
        required: &[Field::ModelName, Field::EndpointUrl],
        optional: &[Field::ApiKey],
        default_api_base: None,
        capabilities: LOCAL_CAPABILITIES,
    },
];

/// Look up the static spec for a provider.
pub fn describe(provider: Provider) -> &'static ProviderSpec {
    &PROVIDERS[provider as usize]
}

// ─────────────────────────────────────────────
// ProviderConfig: one provider's concrete settings
// ─────────────────────────────────────────────

/// Connection settings, one variant per provider, each carrying only the
/// fields that provider accepts.
#[derive(Clone, PartialEq, Eq)]
pub enum Backend {
    OpenAi { api_key: String },
    Google { api_key: String },
    Anthropic { api_key: String },
    Ollama { endpoint_url: String },
    Custom {
        endpoint_url: String,
        api_key: Option<String>,
    },
}

impl Backend {
    pub fn provider(&self) -> Provider {
        match self {
            Backend::OpenAi { .. } => Provider::OpenAi,
            Backend::Google { .. } => Provider::Google,
            Backend::Anthropic { .. } => Provider::Anthropic,
            Backend::Ollama { .. } => Provider::Ollama,
            Backend::Custom { .. } => Provider::Custom,
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        match self {
            Backend::OpenAi { api_key }
            | Backend::Google { api_key }
            | Backend::Anthropic { api_key } => Some(api_key),
            Backend::Custom { api_key, .. } => api_key.as_deref(),
            Backend::Ollama { .. } => None,
        }
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        match self {
            Backend::Ollama { endpoint_url } | Backend::Custom { endpoint_url, .. } => {
                Some(endpoint_url)
            }
            _ => None,
        }
    }
}

// Keys never show up in logs.
impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key_state = |key: Option<&str>| match key {
            Some(k) if !k.trim().is_empty() => "<set>",
            _ => "<unset>",
        };
        let mut s = f.debug_struct(self.provider().display_name());
        if let Some(url) = self.endpoint_url() {
            s.field("endpoint_url", &url);
        }
        if describe(self.provider()).required.contains(&Field::ApiKey)
            || describe(self.provider()).optional.contains(&Field::ApiKey)
        {
            s.field("api_key", &key_state(self.api_key()));
        }
        s.finish()
    }
}

/// Configuration for a single provider: model, backend settings, and the
/// process-wide call option defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
    pub model_name: String,
    pub backend: Backend,
    pub options: CallOptions,
}

impl ProviderConfig {
    /// An empty config for a provider; fails validation until filled in.
    pub fn unconfigured(provider: Provider) -> Self {
        let backend = match provider {
            Provider::OpenAi => Backend::OpenAi {
                api_key: String::new(),
            },
            Provider::Google => Backend::Google {
                api_key: String::new(),
            },
            Provider::Anthropic => Backend::Anthropic {
                api_key: String::new(),
            },
            Provider::Ollama => Backend::Ollama {
                endpoint_url: String::new(),
            },
            Provider::Custom => Backend::Custom {
                endpoint_url: String::new(),
                api_key: None,
            },
        };
        ProviderConfig {
            model_name: String::new(),
            backend,
            options: CallOptions::default(),
        }
    }

    /// Build one provider's config from flat settings.
    pub fn from_settings(provider: Provider, config: &Config) -> Self {
        let owned = |v: Option<&str>| v.unwrap_or_default().to_string();
        let api_key = owned(config.api_key(provider));
        let endpoint_url = owned(config.endpoint_url(provider));

        let backend = match provider {
            Provider::OpenAi => Backend::OpenAi { api_key },
            Provider::Google => Backend::Google { api_key },
            Provider::Anthropic => Backend::Anthropic { api_key },
            Provider::Ollama => Backend::Ollama { endpoint_url },
            Provider::Custom => Backend::Custom {
                endpoint_url,
                api_key: config.api_key(provider).map(String::from),
            },
        };
        ProviderConfig {
            model_name: owned(config.model(provider)),
            backend,
            options: config.call_options(),
        }
    }

    pub fn provider(&self) -> Provider {
        self.backend.provider()
    }

    /// Same connection settings with a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_name = model.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        validate(self.provider(), self).is_ok()
    }
}

// ─────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────

/// Check a provider config against its spec.
///
/// Fails on the first required field that is absent or blank, or on an
/// endpoint that is not an absolute http(s) URL.
pub fn validate(provider: Provider, config: &ProviderConfig) -> Result<(), ConfigError> {
    let found = config.provider();
    if found != provider {
        return Err(ConfigError::ProviderMismatch {
            expected: provider,
            found,
        });
    }

    let spec = describe(provider);
    for field in spec.required {
        let value = match field {
            Field::ModelName => Some(config.model_name.as_str()),
            Field::ApiKey => config.backend.api_key(),
            Field::EndpointUrl => config.backend.endpoint_url(),
        };
        if value.map_or(true, |v| v.trim().is_empty()) {
            return Err(ConfigError::MissingRequiredField {
                provider,
                field: field.as_str(),
                key: field.key(&spec.keys),
            });
        }
    }

    if let Some(endpoint) = config.backend.endpoint_url() {
        check_endpoint(provider, endpoint)?;
    }
    Ok(())
}

fn check_endpoint(provider: Provider, endpoint: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidField {
        provider,
        field: Field::EndpointUrl.as_str(),
        reason,
    };
    let parsed = url::Url::parse(endpoint.trim()).map_err(|e| invalid(format!("{endpoint}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

// ─────────────────────────────────────────────
// ProviderRegistry: the configured providers of this process
// ─────────────────────────────────────────────

/// One `ProviderConfig` per supported provider. Built once; read-only after.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderRegistry {
    configs: [ProviderConfig; 5],
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self {
            configs: Provider::ALL.map(ProviderConfig::unconfigured),
        }
    }
}

impl ProviderRegistry {
    /// Build every provider's config from flat settings.
    pub fn from_config(config: &Config) -> Self {
        let registry = Self {
            configs: Provider::ALL.map(|p| ProviderConfig::from_settings(p, config)),
        };
        for (provider, status) in registry.status() {
            debug!(
                provider = provider.display_name(),
                configured = status.is_ok(),
                "provider config loaded"
            );
        }
        registry
    }

    /// Replace one provider's config.
    pub fn with(mut self, config: ProviderConfig) -> Self {
        let slot = config.provider() as usize;
        self.configs[slot] = config;
        self
    }

    pub fn get(&self, provider: Provider) -> &ProviderConfig {
        &self.configs[provider as usize]
    }

    /// Static spec for a provider.
    pub fn describe(provider: Provider) -> &'static ProviderSpec {
        describe(provider)
    }

    /// Validate a config against a provider's spec.
    pub fn validate(provider: Provider, config: &ProviderConfig) -> Result<(), ConfigError> {
        validate(provider, config)
    }

    /// Validation state of every provider, in registry order.
    pub fn status(&self) -> impl Iterator<Item = (Provider, Result<(), ConfigError>)> + '_ {
        self.configs.iter().map(|c| (c.provider(), validate(c.provider(), c)))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
