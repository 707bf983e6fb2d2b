//! Template job types: what goes into a run and what comes out.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slidegen_core::Provider;
use slidegen_providers::LlmError;

// ─────────────────────────────────────────────
// Input
// ─────────────────────────────────────────────

/// One source slide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideInput {
    /// Position in the source document; output order follows it.
    pub index: usize,
    /// Rendered slide as a `data:<mime>;base64,...` URI.
    pub image_data_uri: String,
    /// Markup extracted from the source document, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
}

impl SlideInput {
    pub fn new(index: usize, image_data_uri: impl Into<String>) -> Self {
        Self {
            index,
            image_data_uri: image_data_uri.into(),
            markup: None,
        }
    }

    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = Some(markup.into());
        self
    }
}

/// A template-generation job over a document's slides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateJob {
    pub id: String,
    pub slides: Vec<SlideInput>,
}

impl TemplateJob {
    pub fn new(slides: Vec<SlideInput>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            slides,
        }
    }
}

// ─────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────

/// The two LLM-calling stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Slide image (+ markup) to HTML.
    Html,
    /// HTML to component source.
    Component,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Html => f.write_str("html"),
            Stage::Component => f.write_str("component"),
        }
    }
}

/// Both stage outputs for one slide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSlide {
    pub index: usize,
    pub html: String,
    pub component: String,
}

/// A slide that could not be generated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlideFailure {
    pub index: usize,
    pub stage: Stage,
    pub provider: Provider,
    pub model: String,
    pub error: LlmError,
}

impl SlideFailure {
    pub fn new(index: usize, stage: Stage, error: LlmError) -> Self {
        Self {
            index,
            stage,
            provider: error.provider(),
            model: error.model().to_string(),
            error,
        }
    }

    /// Whether retrying this slide later might help.
    pub fn is_retryable(&self) -> bool {
        self.error.is_transient()
    }
}

impl fmt::Display for SlideFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slide {} failed at {} stage on {} ({}): {}",
            self.index, self.stage, self.provider, self.model, self.error
        )
    }
}

/// The assembled template handed to the sink.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTemplate {
    pub job_id: String,
    pub provider: Provider,
    pub model: String,
    /// Successful slides in source order.
    pub slides: Vec<GeneratedSlide>,
    pub created_at: DateTime<Utc>,
}

/// Result of a completed job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobReport {
    pub template: GeneratedTemplate,
    /// Failed slides in source order.
    pub failures: Vec<SlideFailure>,
}

impl JobReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Indexes of slides worth resubmitting.
    pub fn retryable_indexes(&self) -> Vec<usize> {
        self.failures
            .iter()
            .filter(|f| f.is_retryable())
            .map(|f| f.index)
            .collect()
    }
}
