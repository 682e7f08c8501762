use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use super::backend::NotifyBackend;
use crate::orchestrator::CycleReport;

/// Slack incoming webhook notification backend.
pub struct SlackWebhook {
    webhook_url: String,
    http: reqwest::Client,
}

impl SlackWebhook {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            http: reqwest::Client::new(),
        }
    }

    async fn post(&self, payload: serde_json::Value) -> anyhow::Result<()> {
        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Slack webhook returned non-success");
            anyhow::bail!("Slack webhook returned {status}");
        }

        Ok(())
    }
}

#[async_trait]
impl NotifyBackend for SlackWebhook {
    async fn cycle_complete(&self, report: &CycleReport) -> anyhow::Result<()> {
        let mut lines = vec![format!(
            ":newspaper: *Cycle {} complete* — {} article(s) live",
            report.date, report.activated
        )];

        if let Some(subject) = &report.subject_line {
            lines.push(format!("*Subject:* {subject}"));
        }
        lines.push(format!("*Feeds:* {}", report.feeds));
        lines.push(format!("*Items:* {}", report.items));
        lines.push(format!("*Scoring:* {}", report.scored));
        if report.duplicates_excluded > 0 {
            lines.push(format!(
                "*Duplicates excluded:* {}",
                report.duplicates_excluded
            ));
        }
        lines.push(format!("*Generation:* {}", report.generated));
        if let Some(archived) = &report.archived {
            lines.push(format!(
                "_Archived previous cycle: {} article(s), {} item(s), {} rating(s)_",
                archived.articles, archived.items, archived.ratings
            ));
        }

        let payload = json!({
            "text": lines.join("\n"),
            "unfurl_links": false,
        });

        self.post(payload).await
    }

    async fn alert(&self, subject: &str, body: &str) -> anyhow::Result<()> {
        let payload = json!({
            "text": format!(":rotating_light: *{subject}*\n{body}"),
            "unfurl_links": false,
        });

        self.post(payload).await
    }
}
