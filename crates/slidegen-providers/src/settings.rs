//! Router settings: the immutable snapshot resolution runs against.

use std::sync::Arc;

use slidegen_core::{Config, ConfigError, Provider, TemplateProviderOverride};

use crate::content;
use crate::error::ResolveError;
use crate::registry::ProviderRegistry;
use crate::template::{self, ResolvedTemplateProvider};

/// Everything provider routing needs, read once from `Config`.
///
/// Cheap to clone; the registry is shared.
#[derive(Clone, Debug)]
pub struct RouterSettings {
    registry: Arc<ProviderRegistry>,
    content_provider: Provider,
    template_override: TemplateProviderOverride,
}

impl RouterSettings {
    pub fn new(
        registry: ProviderRegistry,
        content_provider: Provider,
        template_override: TemplateProviderOverride,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            content_provider,
            template_override,
        }
    }

    /// Snapshot flat settings. Fails if `LLM` or `TEMPLATE_LLM_PROVIDER`
    /// are invalid; provider configs are only checked on resolution.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let content_provider = content::resolve(config)?;
        let template_override =
            TemplateProviderOverride::parse(config.get("TEMPLATE_LLM_PROVIDER"))?;
        Ok(Self::new(
            ProviderRegistry::from_config(config),
            content_provider,
            template_override,
        ))
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Shared handle for the dispatcher.
    pub fn shared_registry(&self) -> Arc<ProviderRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn content_provider(&self) -> Provider {
        self.content_provider
    }

    pub fn template_override(&self) -> TemplateProviderOverride {
        self.template_override
    }

    pub fn resolve_template_provider(&self) -> Result<ResolvedTemplateProvider, ResolveError> {
        template::resolve_settings(self)
    }
}
