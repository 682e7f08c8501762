use async_trait::async_trait;

use crate::orchestrator::CycleReport;

/// Pluggable notification backend for cycle outcomes.
#[async_trait]
pub trait NotifyBackend: Send + Sync {
    /// Send the end-of-cycle digest.
    async fn cycle_complete(&self, report: &CycleReport) -> anyhow::Result<()>;

    /// Send a one-off alert, used when a cycle dies mid-flight.
    async fn alert(&self, subject: &str, body: &str) -> anyhow::Result<()>;
}
