//! `slidegen resolve`: print the template `(provider, model)` pair.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use slidegen_core::config::load_config;
use slidegen_core::Config;
use slidegen_providers::{ResolveError, ResolvedTemplateProvider, RouterSettings};

/// Run the resolve command. Any config error exits non-zero.
pub fn run(config_path: &Path, as_json: bool) -> Result<()> {
    let config = load_config(Some(config_path));
    let resolved = resolve(&config)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&to_json(&resolved))?);
    } else {
        println!(
            "{} {}",
            "✓".green(),
            format!("{resolved}").bold()
        );
    }
    Ok(())
}

fn resolve(config: &Config) -> Result<ResolvedTemplateProvider, ResolveError> {
    let settings = RouterSettings::from_config(config)?;
    settings.resolve_template_provider()
}

fn to_json(resolved: &ResolvedTemplateProvider) -> serde_json::Value {
    json!({
        "provider": resolved.provider(),
        "model": resolved.model(),
        "local": resolved.is_local(),
    })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
