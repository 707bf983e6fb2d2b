//! `slidegen status`: show settings and provider configuration state.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use slidegen_core::config::{load_config, ProviderKeys};
use slidegen_core::{Config, Provider};
use slidegen_providers::{ProviderRegistry, RouterSettings};

/// Run the status command.
pub fn run(config_path: &Path) -> Result<()> {
    let config = load_config(Some(config_path));

    crate::helpers::print_header("status");

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );

    match RouterSettings::from_config(&config) {
        Ok(settings) => print_routing(&settings),
        Err(e) => println!("  {:<18} {}", "Routing:".bold(), e.to_string().red()),
    }

    println!();
    println!("  {}", "Providers:".bold());
    print_providers(&config);
    println!();

    Ok(())
}

fn print_routing(settings: &RouterSettings) {
    println!(
        "  {:<18} {}",
        "Content LLM:".bold(),
        settings.content_provider()
    );
    println!(
        "  {:<18} {}",
        "Template override:".bold(),
        settings.template_override()
    );
    let template = match settings.resolve_template_provider() {
        Ok(resolved) => format!("{} {}", "✓".green(), resolved),
        Err(e) => e.to_string().red().to_string(),
    };
    println!("  {:<18} {}", "Template LLM:".bold(), template);
}

fn print_providers(config: &Config) {
    let registry = ProviderRegistry::from_config(config);
    for (provider, state) in registry.status() {
        let line = match state {
            Ok(()) => format!(
                "{} {}",
                "✓".green(),
                registry.get(provider).model_name.dimmed()
            ),
            Err(_) if !has_any_setting(config, provider) => {
                "· not configured".dimmed().to_string()
            }
            Err(e) => format!("{} {}", "✗".red(), e),
        };
        println!("    {:<16} {}", provider.display_name(), line);
    }
}

/// Whether any of a provider's keys is set at all.
fn has_any_setting(config: &Config, provider: Provider) -> bool {
    let keys = ProviderKeys::for_provider(provider);
    [Some(keys.model), keys.api_key, keys.endpoint_url]
        .into_iter()
        .flatten()
        .any(|key| config.get(key).is_some())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
