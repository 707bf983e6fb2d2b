//! Template provider resolution.
//!
//! Decides which `(provider, model)` pair a template-generation job uses:
//!
//! | override | content provider | result |
//! |----------|------------------|--------|
//! | `api`    | any              | OpenAI + [`TEMPLATE_MODEL`] |
//! | `local`  | any              | content provider + its configured model |
//! | `unset`  | Ollama / Custom  | content provider + its configured model |
//! | `unset`  | hosted           | OpenAI + [`TEMPLATE_MODEL`] |
//!
//! Selection is total; resolution then validates the chosen provider's
//! config and fails if it is incomplete. There is no fallback to another
//! provider.

use slidegen_core::{Provider, TemplateProviderOverride};
use tracing::{debug, info};

use crate::error::ResolveError;
use crate::registry::{validate, ProviderConfig, ProviderRegistry};
use crate::settings::RouterSettings;

/// Hosted model used whenever template generation goes to the API.
pub const TEMPLATE_MODEL: &str = "gpt-5";

// ─────────────────────────────────────────────
// Selection: the pure policy
// ─────────────────────────────────────────────

/// Where the template model name comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateModel {
    /// Always [`TEMPLATE_MODEL`].
    Fixed,
    /// Whatever the provider's model setting holds.
    Configured,
}

/// The provider chosen for templates, before its config is checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub provider: Provider,
    pub model: TemplateModel,
}

/// Pick the template provider. Total and deterministic.
pub fn select(template_override: TemplateProviderOverride, content: Provider) -> Selection {
    let api = Selection {
        provider: Provider::OpenAi,
        model: TemplateModel::Fixed,
    };
    let reuse = Selection {
        provider: content,
        model: TemplateModel::Configured,
    };

    match template_override {
        TemplateProviderOverride::Api => api,
        TemplateProviderOverride::Local => reuse,
        TemplateProviderOverride::Unset if content.is_local() => reuse,
        TemplateProviderOverride::Unset => api,
    }
}

// ─────────────────────────────────────────────
// ResolvedTemplateProvider
// ─────────────────────────────────────────────

/// A validated `(provider, model)` pair plus the config it came from.
///
/// Can only be built from a config that passes validation, so holding one
/// means the provider is usable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTemplateProvider {
    config: ProviderConfig,
}

impl ResolvedTemplateProvider {
    /// Validate a config and wrap it.
    pub fn new(config: ProviderConfig) -> Result<Self, ResolveError> {
        let provider = config.provider();
        validate(provider, &config).map_err(|source| ResolveError::UnresolvedProviderConfig {
            provider,
            model: display_model(&config.model_name),
            source,
        })?;
        Ok(Self { config })
    }

    pub fn provider(&self) -> Provider {
        self.config.provider()
    }

    pub fn model(&self) -> &str {
        &self.config.model_name
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Templates run on a self-hosted model.
    pub fn is_local(&self) -> bool {
        self.provider().is_local()
    }

    /// Templates run on the hosted OpenAI API.
    pub fn is_api(&self) -> bool {
        self.provider() == Provider::OpenAi
    }
}

impl std::fmt::Display for ResolvedTemplateProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.provider(), self.model())
    }
}

fn display_model(model: &str) -> String {
    if model.trim().is_empty() {
        "no model".to_string()
    } else {
        model.to_string()
    }
}

// ─────────────────────────────────────────────
// TemplateProviderResolver
// ─────────────────────────────────────────────

/// Resolves template providers against a fixed registry.
#[derive(Clone, Copy, Debug)]
pub struct TemplateProviderResolver<'a> {
    registry: &'a ProviderRegistry,
}

impl<'a> TemplateProviderResolver<'a> {
    pub fn new(registry: &'a ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Select a provider and validate its config.
    pub fn resolve(
        &self,
        template_override: TemplateProviderOverride,
        content: Provider,
    ) -> Result<ResolvedTemplateProvider, ResolveError> {
        let selection = select(template_override, content);
        debug!(
            template_override = %template_override,
            content_provider = content.as_str(),
            selected = selection.provider.as_str(),
            model_source = ?selection.model,
            "template provider selected"
        );

        let config = self.registry.get(selection.provider).clone();
        let config = match selection.model {
            TemplateModel::Fixed => config.with_model(TEMPLATE_MODEL),
            TemplateModel::Configured => config,
        };

        let resolved = ResolvedTemplateProvider::new(config)?;
        info!(
            provider = resolved.provider().as_str(),
            model = resolved.model(),
            "template provider resolved"
        );
        Ok(resolved)
    }
}

/// Resolve the template provider for a settings snapshot.
pub fn resolve_settings(settings: &RouterSettings) -> Result<ResolvedTemplateProvider, ResolveError> {
    TemplateProviderResolver::new(settings.registry())
        .resolve(settings.template_override(), settings.content_provider())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
