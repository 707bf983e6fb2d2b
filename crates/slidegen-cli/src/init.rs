//! `slidegen init`: write a starter config file.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use slidegen_core::config::{save_config, Config};

/// Local Ollama with a vision model: works without any API key.
fn starter_config() -> Config {
    let mut config = Config::default();
    config.set("LLM", "ollama");
    config.set("OLLAMA_URL", "http://localhost:11434");
    config.set("OLLAMA_MODEL", "llama3.2-vision");
    config
}

/// Run the init command.
pub fn run(config_path: &Path) -> Result<()> {
    crate::helpers::print_header("setup");

    if write_if_absent(config_path)? {
        println!(
            "  {} created config at {}",
            "✓".green(),
            config_path.display()
        );
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    }

    println!();
    println!(
        "{}",
        "  Edit LLM and the provider keys, then run `slidegen status`.".green()
    );
    println!();
    Ok(())
}

/// Returns whether a file was written. Existing files are never touched.
fn write_if_absent(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&starter_config(), Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
