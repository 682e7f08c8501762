// Image re-hosting client. Failures degrade to "keep the original URL".

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::traits::ImageHost;

/// HTTP re-hosting service: posts the source URL, gets back a hosted URL
/// (or null when the service declines).
pub struct HttpImageHost {
    endpoint: String,
    token: Option<String>,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: Option<String>,
}

impl HttpImageHost {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("Failed to build image host HTTP client");
        Self {
            endpoint: endpoint.into(),
            token,
            http,
        }
    }
}

#[async_trait]
impl ImageHost for HttpImageHost {
    async fn upload_image(&self, source_url: &str, label: &str) -> Result<Option<String>> {
        debug!(source_url, label, "re-hosting image");

        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "source_url": source_url, "label": label }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("image host returned {}", resp.status());
        }

        let body: UploadResponse = resp.json().await?;
        Ok(body.url)
    }
}

/// Used when no re-hosting service is configured: every item keeps its
/// original image URL.
pub struct NoRehost;

#[async_trait]
impl ImageHost for NoRehost {
    async fn upload_image(&self, _source_url: &str, _label: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
