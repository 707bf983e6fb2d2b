//! Shared CLI helpers: config path lookup, image encoding, headers.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use colored::Colorize;

use slidegen_core::config::get_config_path;
use slidegen_core::utils::expand_home;

/// Env var naming an alternate config file.
pub const CONFIG_ENV: &str = "SLIDEGEN_CONFIG";

/// `--config`, else `$SLIDEGEN_CONFIG`, else `~/.slidegen/config.json`.
pub fn config_path(flag: Option<PathBuf>) -> PathBuf {
    config_path_from(flag, std::env::var(CONFIG_ENV).ok())
}

fn config_path_from(flag: Option<PathBuf>, env: Option<String>) -> PathBuf {
    if let Some(path) = flag {
        return path;
    }
    match env {
        Some(raw) if !raw.trim().is_empty() => expand_home(raw.trim()),
        _ => get_config_path(),
    }
}

/// Mime type for a slide image, by extension.
pub fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Read an image file into a `data:` URI.
pub fn image_data_uri(path: &Path) -> Result<String> {
    let Some(mime) = image_mime(path) else {
        bail!(
            "unsupported image type: {} (expected png, jpg, webp or gif)",
            path.display()
        );
    };
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

/// Print a command header.
pub fn print_header(title: &str) {
    println!();
    println!("{}", format!("▣ slidegen {title}").cyan().bold());
    println!();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
