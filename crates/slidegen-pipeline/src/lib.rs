//! Template generation pipeline.
//!
//! A job's slides go through two LLM stages (image → HTML, HTML →
//! component) on one resolved client, concurrently and in a bounded pool,
//! with transient failures retried and the whole job cancellable.

pub mod job;
pub mod retry;
pub mod runner;
pub mod sink;
pub mod stages;

pub use job::{GeneratedSlide, GeneratedTemplate, JobReport, SlideFailure, SlideInput, Stage, TemplateJob};
pub use retry::{RetryPolicy, Retrying};
pub use runner::{PipelineError, RunOptions, TemplateRunner};
pub use sink::TemplateSink;
