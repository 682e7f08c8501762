use async_trait::async_trait;

use super::backend::NotifyBackend;
use crate::orchestrator::CycleReport;

/// No-op notification backend for environments without a webhook.
pub struct NoopBackend;

#[async_trait]
impl NotifyBackend for NoopBackend {
    async fn cycle_complete(&self, _report: &CycleReport) -> anyhow::Result<()> {
        Ok(())
    }

    async fn alert(&self, _subject: &str, _body: &str) -> anyhow::Result<()> {
        Ok(())
    }
}
