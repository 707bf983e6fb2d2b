//! `slidegen generate`: run the template pipeline over slide images.
//!
//! Resolution happens once, before any slide is read into a request, so a
//! bad config fails fast and every slide runs on the same provider and model.
//! Ctrl-C cancels the job; nothing is written for a cancelled job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use slidegen_core::config::load_config;
use slidegen_pipeline::{
    GeneratedTemplate, JobReport, PipelineError, RetryPolicy, RunOptions, SlideInput,
    TemplateJob, TemplateRunner, TemplateSink,
};
use slidegen_providers::{LlmDispatcher, RouterSettings};

pub struct GenerateArgs {
    pub images: Vec<PathBuf>,
    pub concurrency: usize,
    pub retries: u32,
    pub out: Option<PathBuf>,
}

/// Run the generate command.
pub async fn run(config_path: &Path, args: GenerateArgs) -> Result<()> {
    let config = load_config(Some(config_path));
    let settings = RouterSettings::from_config(&config)?;
    let resolved = settings.resolve_template_provider()?;
    info!(
        provider = resolved.provider().as_str(),
        model = resolved.model(),
        "template provider resolved"
    );

    let job = build_job(&args.images)?;
    let dispatcher = LlmDispatcher::new(settings.shared_registry())
        .context("failed to build HTTP client")?;
    let client = Arc::new(dispatcher.bind(&resolved));

    let runner = TemplateRunner::new(
        client,
        RunOptions {
            concurrency: args.concurrency.max(1),
            retry: RetryPolicy {
                max_attempts: args.retries.max(1),
                ..RetryPolicy::default()
            },
        },
    );

    eprintln!(
        "{} {} slide(s) on {}",
        "▸".cyan(),
        job.slides.len(),
        resolved.to_string().bold()
    );

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!();
                eprintln!("{}", "Cancelling...".yellow());
                cancel.cancel();
            }
        })
    };

    let sink: Box<dyn TemplateSink> = match args.out {
        Some(path) => Box::new(JsonFileSink { path }),
        None => Box::new(StdoutSink),
    };
    let result = runner.run_and_persist(job, sink.as_ref(), cancel).await;
    ctrl_c.abort();

    match result {
        Ok(report) => finish(&report),
        Err(PipelineError::Cancelled) => bail!("generation cancelled, nothing was written"),
        Err(e) => Err(e.into()),
    }
}

/// Slides are numbered in argument order.
fn build_job(images: &[PathBuf]) -> Result<TemplateJob> {
    let slides = images
        .iter()
        .enumerate()
        .map(|(index, path)| {
            crate::helpers::image_data_uri(path).map(|uri| SlideInput::new(index, uri))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(TemplateJob::new(slides))
}

fn finish(report: &JobReport) -> Result<()> {
    let template = &report.template;
    eprintln!(
        "{} {} slide(s) generated with {} ({})",
        "✓".green(),
        template.slides.len(),
        template.provider,
        template.model
    );
    if report.is_complete() {
        return Ok(());
    }

    for failure in &report.failures {
        eprintln!("  {} {}", "✗".red(), failure);
    }
    let retryable = report.retryable_indexes();
    if !retryable.is_empty() {
        eprintln!(
            "  {}",
            format!("transient failures on slide(s) {retryable:?}, rerun to retry").dimmed()
        );
    }
    bail!("{} slide(s) failed", report.failures.len())
}

// ─────────────────────────────────────────────
// Sinks
// ─────────────────────────────────────────────

/// Writes the template as pretty JSON to a file.
struct JsonFileSink {
    path: PathBuf,
}

#[async_trait]
impl TemplateSink for JsonFileSink {
    async fn persist(&self, template: &GeneratedTemplate) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(template)?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        eprintln!("{} wrote {}", "✓".green(), self.path.display());
        Ok(())
    }
}

/// Prints the template JSON on stdout.
struct StdoutSink;

#[async_trait]
impl TemplateSink for StdoutSink {
    async fn persist(&self, template: &GeneratedTemplate) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(template)?);
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
