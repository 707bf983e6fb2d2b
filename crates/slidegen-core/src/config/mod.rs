//! Configuration system: schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use slidegen_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("Content provider: {:?}", cfg.get("LLM"));
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{apply_env_overrides_from, get_config_path, load_config, save_config};
pub use schema::{Config, ProviderKeys, CONFIG_KEYS};
