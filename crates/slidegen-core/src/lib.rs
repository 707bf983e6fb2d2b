//! Slidegen core: configuration, message types, and shared errors.
//!
//! This crate contains:
//! - **config**: flat key/value settings loaded from `~/.slidegen/config.json` + env vars
//! - **provider**: the five supported backends and the template override
//! - **types**: chat message model shared by the dispatcher and the pipeline
//! - **error**: `ConfigError`, surfaced whenever provider settings are missing or invalid

pub mod config;
pub mod error;
pub mod provider;
pub mod types;
pub mod utils;

pub use config::Config;
pub use error::ConfigError;
pub use provider::{Provider, TemplateProviderOverride};
