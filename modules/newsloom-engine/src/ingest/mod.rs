//! Feed ingestion: fetch, normalize, window-filter, dedup, image
//! extraction and optional re-hosting.

pub mod feed;
pub mod images;
pub mod rehost;

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use newsloom_common::{CycleConfig, Outcome, StageTally};
use newsloom_store::{Cycle, Feed, NewSourceItem, SourceItem};

use crate::traits::{FeedFetcher, ImageHost, PipelineStore};
use feed::RawItem;
use images::extract_image_url;

#[derive(Debug, Default)]
pub struct IngestReport {
    pub feeds: StageTally,
    pub items: StageTally,
    pub inserted: Vec<SourceItem>,
}

pub struct Ingestor<'a> {
    store: &'a dyn PipelineStore,
    fetcher: &'a dyn FeedFetcher,
    image_host: &'a dyn ImageHost,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        store: &'a dyn PipelineStore,
        fetcher: &'a dyn FeedFetcher,
        image_host: &'a dyn ImageHost,
    ) -> Self {
        Self {
            store,
            fetcher,
            image_host,
        }
    }

    /// Ingest every active feed into the cycle. Failing to load the feed
    /// list is fatal; a single feed's failure increments its error
    /// counter and never aborts the others.
    pub async fn run(&self, cycle: &Cycle, config: &CycleConfig) -> Result<IngestReport> {
        let feeds = self.store.active_feeds().await?;
        info!(feeds = feeds.len(), cycle_id = %cycle.id, "starting ingestion");

        let mut report = IngestReport::default();

        for feed in &feeds {
            match self.fetcher.fetch(&feed.url).await {
                Ok(raw_items) => {
                    for raw in raw_items {
                        let outcome = self.ingest_item(cycle, config, feed, raw, &mut report).await;
                        report.items.record(&outcome);
                    }
                    if let Err(e) = self.store.mark_feed_success(feed.id).await {
                        warn!(feed = %feed.url, error = %e, "failed to record feed success");
                    }
                    report.feeds.record(&Outcome::Success);
                }
                Err(e) => {
                    warn!(feed = %feed.url, error = %e, "feed fetch failed");
                    if let Err(e) = self.store.mark_feed_failure(feed.id).await {
                        warn!(feed = %feed.url, error = %e, "failed to record feed failure");
                    }
                    report.feeds.record(&Outcome::failed(e));
                }
            }
        }

        info!(
            feeds = %report.feeds,
            items = %report.items,
            "ingestion complete"
        );
        Ok(report)
    }

    async fn ingest_item(
        &self,
        cycle: &Cycle,
        config: &CycleConfig,
        feed: &Feed,
        raw: RawItem,
        report: &mut IngestReport,
    ) -> Outcome {
        let cutoff = Utc::now() - Duration::hours(config.ingest_window_hours);
        let published_at = match raw.published_at {
            Some(ts) if ts >= cutoff => ts,
            Some(_) => return Outcome::skipped("outside ingestion window"),
            None => return Outcome::skipped("no publish timestamp"),
        };

        match self.store.item_exists(feed.id, &raw.external_id).await {
            Ok(true) => return Outcome::skipped("already ingested"),
            Ok(false) => {}
            Err(e) => return Outcome::failed(e),
        }

        let image_url = match extract_image_url(&raw) {
            Some(original) => Some(self.rehost(feed, &raw, original, config).await),
            None => None,
        };

        let item = NewSourceItem {
            feed_id: feed.id,
            external_id: raw.external_id,
            title: raw.title,
            description: raw.description,
            author: raw.author,
            published_at,
            url: raw.url,
            image_url,
            cycle_id: cycle.id,
        };

        match self.store.insert_item(item).await {
            Ok(inserted) => {
                report.inserted.push(inserted);
                Outcome::Success
            }
            Err(e) => {
                warn!(feed = %feed.url, error = %e, "failed to insert item");
                Outcome::failed(e)
            }
        }
    }

    /// Re-host an image unless the author is blocklisted. Any failure or
    /// a declined upload keeps the original URL.
    async fn rehost(
        &self,
        feed: &Feed,
        raw: &RawItem,
        original: String,
        config: &CycleConfig,
    ) -> String {
        if let Some(author) = &raw.author {
            let author = author.to_lowercase();
            if config
                .image_author_blocklist
                .iter()
                .any(|blocked| blocked.to_lowercase() == author)
            {
                return original;
            }
        }

        let label = format!("{}/{}", feed.name, raw.external_id);
        match self.image_host.upload_image(&original, &label).await {
            Ok(Some(hosted)) => hosted,
            Ok(None) => original,
            Err(e) => {
                warn!(url = %original, error = %e, "image re-hosting failed, keeping original");
                original
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{today_cycle, FixedImageHost, MockFeedFetcher, MockStore, NullImageHost};

    fn raw(external_id: &str, hours_ago: i64) -> RawItem {
        RawItem {
            external_id: external_id.to_string(),
            title: format!("Story {external_id}"),
            description: "A story body".to_string(),
            author: None,
            published_at: Some(Utc::now() - Duration::hours(hours_ago)),
            url: format!("https://example.com/{external_id}"),
            media_urls: Vec::new(),
            thumbnail_urls: Vec::new(),
        }
    }

    #[tokio::test]
    async fn one_failing_feed_does_not_abort_others() {
        let store = MockStore::new();
        let good = store.add_feed("good", "https://good.example/rss");
        let bad = store.add_feed("bad", "https://bad.example/rss");
        let cycle = today_cycle(&store).await;

        let fetcher = MockFeedFetcher::new().on_feed("https://good.example/rss", vec![raw("a", 1)]);
        let ingestor = Ingestor::new(&store, &fetcher, &NullImageHost);

        let report = ingestor
            .run(&cycle, &CycleConfig::default())
            .await
            .unwrap();

        assert_eq!(report.feeds.succeeded, 1);
        assert_eq!(report.feeds.failed, 1);
        assert_eq!(report.inserted.len(), 1);
        assert_eq!(store.feed_error_count(bad), 1);
        assert_eq!(store.feed_error_count(good), 0);
    }

    #[tokio::test]
    async fn success_resets_error_counter() {
        let store = MockStore::new();
        let feed_id = store.add_feed("news", "https://news.example/rss");
        store.set_feed_error_count(feed_id, 4);
        let cycle = today_cycle(&store).await;

        let fetcher = MockFeedFetcher::new().on_feed("https://news.example/rss", vec![raw("a", 1)]);
        Ingestor::new(&store, &fetcher, &NullImageHost)
            .run(&cycle, &CycleConfig::default())
            .await
            .unwrap();

        assert_eq!(store.feed_error_count(feed_id), 0);
    }

    #[tokio::test]
    async fn filters_items_outside_window() {
        let store = MockStore::new();
        store.add_feed("news", "https://news.example/rss");
        let cycle = today_cycle(&store).await;

        let fetcher = MockFeedFetcher::new().on_feed(
            "https://news.example/rss",
            vec![raw("fresh", 2), raw("stale", 48)],
        );
        let report = Ingestor::new(&store, &fetcher, &NullImageHost)
            .run(&cycle, &CycleConfig::default())
            .await
            .unwrap();

        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.inserted[0].external_id, "fresh");
        assert_eq!(report.items.skipped, 1);
    }

    #[tokio::test]
    async fn skips_already_seen_external_ids() {
        let store = MockStore::new();
        store.add_feed("news", "https://news.example/rss");
        let cycle = today_cycle(&store).await;

        let fetcher = MockFeedFetcher::new()
            .on_feed("https://news.example/rss", vec![raw("a", 1), raw("b", 1)]);
        let ingestor = Ingestor::new(&store, &fetcher, &NullImageHost);

        ingestor.run(&cycle, &CycleConfig::default()).await.unwrap();
        let second = ingestor.run(&cycle, &CycleConfig::default()).await.unwrap();

        assert_eq!(second.inserted.len(), 0);
        assert_eq!(second.items.skipped, 2);
    }

    #[tokio::test]
    async fn declined_rehost_keeps_original_image() {
        let store = MockStore::new();
        store.add_feed("news", "https://news.example/rss");
        let cycle = today_cycle(&store).await;

        let mut item = raw("a", 1);
        item.media_urls = vec!["https://cdn.example.com/pic.jpg".to_string()];
        let fetcher = MockFeedFetcher::new().on_feed("https://news.example/rss", vec![item]);

        // NullImageHost always declines.
        let report = Ingestor::new(&store, &fetcher, &NullImageHost)
            .run(&cycle, &CycleConfig::default())
            .await
            .unwrap();

        assert_eq!(
            report.inserted[0].image_url.as_deref(),
            Some("https://cdn.example.com/pic.jpg")
        );
    }

    #[tokio::test]
    async fn rehost_replaces_image_url() {
        let store = MockStore::new();
        store.add_feed("news", "https://news.example/rss");
        let cycle = today_cycle(&store).await;

        let mut item = raw("a", 1);
        item.media_urls = vec!["https://cdn.example.com/pic.jpg".to_string()];
        let fetcher = MockFeedFetcher::new().on_feed("https://news.example/rss", vec![item]);

        let host = FixedImageHost::new("https://img.newsloom.example/hosted.jpg");
        let report = Ingestor::new(&store, &fetcher, &host)
            .run(&cycle, &CycleConfig::default())
            .await
            .unwrap();

        assert_eq!(
            report.inserted[0].image_url.as_deref(),
            Some("https://img.newsloom.example/hosted.jpg")
        );
    }

    #[tokio::test]
    async fn blocklisted_author_skips_rehost() {
        let store = MockStore::new();
        store.add_feed("news", "https://news.example/rss");
        let cycle = today_cycle(&store).await;

        let mut item = raw("a", 1);
        item.author = Some("Syndicated Wire".to_string());
        item.media_urls = vec!["https://cdn.example.com/pic.jpg".to_string()];
        let fetcher = MockFeedFetcher::new().on_feed("https://news.example/rss", vec![item]);

        let mut config = CycleConfig::default();
        config.image_author_blocklist = vec!["syndicated wire".to_string()];

        let host = FixedImageHost::new("https://img.newsloom.example/hosted.jpg");
        let report = Ingestor::new(&store, &fetcher, &host)
            .run(&cycle, &config)
            .await
            .unwrap();

        assert_eq!(
            report.inserted[0].image_url.as_deref(),
            Some("https://cdn.example.com/pic.jpg")
        );
        assert_eq!(host.upload_count(), 0);
    }
}
