//! Where finished templates go.

use async_trait::async_trait;

use crate::job::GeneratedTemplate;

/// Receives a job's template once the job completes.
///
/// Called at most once per job and never for a cancelled job.
#[async_trait]
pub trait TemplateSink: Send + Sync {
    async fn persist(&self, template: &GeneratedTemplate) -> anyhow::Result<()>;
}
