mod client;
pub(crate) mod types;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CompletionError, Result};
use crate::provider::{CompletionProvider, CompletionRequest};

use client::ClaudeClient;
use types::{ChatRequest, WireMessage};

/// Default ceiling for a single completion call. The provider has no
/// server-side deadline, and one unbounded call can stall a whole batch.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// Anthropic Messages API completion provider.
#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: Option<String>,
    timeout: Duration,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            CompletionError::Provider("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> ClaudeClient {
        let client = ClaudeClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }
}

#[async_trait]
impl CompletionProvider for Claude {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let mut chat = ChatRequest::new(&self.model).message(WireMessage::user(request.prompt));
        if let Some(system) = request.system {
            chat = chat.system(system);
        }
        if let Some(max_tokens) = request.max_tokens {
            chat = chat.max_tokens(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            chat = chat.temperature(temperature);
        }

        let response = tokio::time::timeout(self.timeout, self.client().chat(&chat))
            .await
            .map_err(|_| CompletionError::Timeout(self.timeout))??;

        response.text().ok_or(CompletionError::Empty)
    }
}
