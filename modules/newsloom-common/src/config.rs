use std::env;

/// Application configuration loaded from environment variables.
///
/// Per-cycle tunables (criteria, thresholds, batch sizes) live in the
/// store's settings table and are loaded once per cycle into a
/// [`crate::CycleConfig`]; this struct only carries connection material.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // AI provider
    pub anthropic_api_key: String,
    pub model: String,

    // Notification sink (optional; absent means no-op)
    pub slack_webhook_url: Option<String>,

    // Image re-hosting service (optional; absent disables re-hosting)
    pub image_host_url: Option<String>,
    pub image_host_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            model: env::var("NEWSLOOM_MODEL")
                .unwrap_or_else(|_| "claude-haiku-4-5-20251001".to_string()),
            slack_webhook_url: env::var("SLACK_WEBHOOK_URL").ok(),
            image_host_url: env::var("IMAGE_HOST_URL").ok(),
            image_host_token: env::var("IMAGE_HOST_TOKEN").ok(),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
