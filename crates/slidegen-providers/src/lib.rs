//! Provider routing for slidegen.
//!
//! # Architecture
//!
//! - [`registry`]: static specs for the five providers, per-provider configs, validation
//! - [`content`]: which provider `LLM` names
//! - [`template`]: which `(provider, model)` pair template generation uses
//! - [`settings::RouterSettings`]: immutable snapshot the resolvers run against
//! - [`dispatcher::LlmDispatcher`]: one chat turn to any provider, errors classified
//! - [`traits::LlmClient`]: the seam the pipeline calls through

mod backend;
pub mod content;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod settings;
pub mod template;
pub mod traits;

pub use dispatcher::{BoundClient, CallState, FailureClass, LlmDispatcher};
pub use error::{FatalReason, LlmError, ResolveError, TransientReason};
pub use registry::{Backend, ProviderConfig, ProviderRegistry, ProviderSpec, PROVIDERS};
pub use settings::RouterSettings;
pub use template::{
    ResolvedTemplateProvider, TemplateProviderResolver, TEMPLATE_MODEL,
};
pub use traits::LlmClient;
