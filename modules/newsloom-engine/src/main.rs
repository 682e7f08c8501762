use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::Claude;
use newsloom_common::Config;
use newsloom_engine::ingest::feed::FeedService;
use newsloom_engine::ingest::rehost::{HttpImageHost, NoRehost};
use newsloom_engine::notify::{NoopBackend, NotifyBackend, SlackWebhook};
use newsloom_engine::traits::ImageHost;
use newsloom_engine::Orchestrator;
use newsloom_store::Store;

/// Run one newsletter cycle end to end.
#[derive(Parser, Debug)]
#[command(name = "newsloom", version)]
struct Args {
    /// Cycle date (YYYY-MM-DD). Defaults to today, UTC.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("newsloom=info".parse()?))
        .init();

    let args = Args::parse();
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());

    info!(%date, "newsloom starting");

    let config = Config::from_env();

    let store = Store::connect(&config.database_url).await?;
    store.migrate().await?;

    let provider = Claude::new(config.anthropic_api_key.clone(), config.model.clone());
    let fetcher = FeedService::new();

    let image_host: Box<dyn ImageHost> = match &config.image_host_url {
        Some(endpoint) => Box::new(HttpImageHost::new(
            endpoint.clone(),
            config.image_host_token.clone(),
        )),
        None => Box::new(NoRehost),
    };

    let notifier: Box<dyn NotifyBackend> = match &config.slack_webhook_url {
        Some(url) => Box::new(SlackWebhook::new(url.clone())),
        None => Box::new(NoopBackend),
    };

    let orchestrator = Orchestrator::new(&store, &provider, &fetcher, &*image_host, &*notifier);
    let report = orchestrator.run_cycle(date).await?;

    info!(
        cycle_id = %report.cycle_id,
        activated = report.activated,
        subject = report.subject_line.as_deref().unwrap_or("(none)"),
        "newsloom finished"
    );

    Ok(())
}
