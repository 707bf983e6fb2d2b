//! Template job runner.
//!
//! Every slide of a job goes through both stages on the same client, so one
//! job never mixes providers or models. Slides run concurrently up to a
//! limit; results are tagged with their source index and put back in order
//! once all have finished. A failed slide is reported and the rest carry
//! on. Cancelling the token drops queued and in-flight calls and the job
//! produces nothing.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use slidegen_providers::LlmClient;

use crate::job::{GeneratedSlide, GeneratedTemplate, JobReport, SlideFailure, SlideInput, Stage, TemplateJob};
use crate::retry::{RetryPolicy, Retrying};
use crate::sink::TemplateSink;
use crate::stages;

// ─────────────────────────────────────────────
// Errors & options
// ─────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("template job was cancelled")]
    Cancelled,

    #[error("failed to persist template: {0:#}")]
    Sink(anyhow::Error),

    #[error("slide worker crashed: {0}")]
    Worker(String),
}

/// Knobs for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Slides processed at the same time.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }
}

/// Outcome of one slide, tagged with its source index.
type SlideOutcome = (usize, Result<GeneratedSlide, SlideFailure>);

// ─────────────────────────────────────────────
// TemplateRunner
// ─────────────────────────────────────────────

/// Runs template jobs against one client.
pub struct TemplateRunner {
    client: Arc<dyn LlmClient>,
    options: RunOptions,
}

impl TemplateRunner {
    /// `client` is wrapped in the retry decorator from `options`.
    pub fn new(client: Arc<dyn LlmClient>, options: RunOptions) -> Self {
        let client: Arc<dyn LlmClient> = Arc::new(Retrying::new(client, options.retry));
        Self { client, options }
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Run every slide through both stages.
    ///
    /// Returns `Cancelled` if `cancel` fires before all slides finish.
    pub async fn run(
        &self,
        job: TemplateJob,
        cancel: CancellationToken,
    ) -> Result<JobReport, PipelineError> {
        let provider = self.client.provider();
        let model = self.client.model().to_string();
        let total = job.slides.len();
        info!(
            job_id = %job.id,
            slides = total,
            provider = provider.as_str(),
            model = %model,
            concurrency = self.options.concurrency,
            "template job started"
        );

        let permits = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut workers: JoinSet<Option<SlideOutcome>> = JoinSet::new();

        for slide in job.slides {
            let client = Arc::clone(&self.client);
            let permits = Arc::clone(&permits);
            let cancel = cancel.clone();
            workers.spawn(async move {
                // Cancelled before its turn: never dispatched.
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return None,
                    permit = permits.acquire_owned() => permit.ok()?,
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    outcome = process_slide(client.as_ref(), slide) => Some(outcome),
                }
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    workers.abort_all();
                    warn!(job_id = %job.id, "template job cancelled");
                    return Err(PipelineError::Cancelled);
                }
                joined = workers.join_next() => joined,
            };
            match joined {
                None => break,
                Some(Ok(Some(outcome))) => outcomes.push(outcome),
                Some(Ok(None)) => {}
                Some(Err(e)) if e.is_cancelled() => {}
                Some(Err(e)) => {
                    workers.abort_all();
                    return Err(PipelineError::Worker(e.to_string()));
                }
            }
        }

        if cancel.is_cancelled() || outcomes.len() != total {
            return Err(PipelineError::Cancelled);
        }

        // Completion order is arbitrary; restore source order.
        outcomes.sort_by_key(|(index, _)| *index);
        let mut slides = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (_, outcome) in outcomes {
            match outcome {
                Ok(slide) => slides.push(slide),
                Err(failure) => failures.push(failure),
            }
        }

        info!(
            job_id = %job.id,
            generated = slides.len(),
            failed = failures.len(),
            "template job finished"
        );

        Ok(JobReport {
            template: GeneratedTemplate {
                job_id: job.id,
                provider,
                model,
                slides,
                created_at: Utc::now(),
            },
            failures,
        })
    }

    /// Run a job and hand the template to `sink` if it completes.
    pub async fn run_and_persist(
        &self,
        job: TemplateJob,
        sink: &dyn TemplateSink,
        cancel: CancellationToken,
    ) -> Result<JobReport, PipelineError> {
        let report = self.run(job, cancel.clone()).await?;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        sink.persist(&report.template)
            .await
            .map_err(PipelineError::Sink)?;
        debug!(job_id = %report.template.job_id, "template persisted");
        Ok(report)
    }
}

async fn process_slide(client: &dyn LlmClient, slide: SlideInput) -> SlideOutcome {
    let index = slide.index;
    let fail = |stage: Stage, error| {
        let failure = SlideFailure::new(index, stage, error);
        warn!(
            slide = index,
            stage = %stage,
            provider = failure.provider.as_str(),
            model = %failure.model,
            error = %failure.error,
            "slide failed"
        );
        (index, Err(failure))
    };

    let html = match stages::generate_html(client, &slide).await {
        Ok(html) => html,
        Err(e) => return fail(Stage::Html, e),
    };
    let component = match stages::generate_component(client, index, &html).await {
        Ok(code) => code,
        Err(e) => return fail(Stage::Component, e),
    };
    (
        index,
        Ok(GeneratedSlide {
            index,
            html,
            component,
        }),
    )
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
