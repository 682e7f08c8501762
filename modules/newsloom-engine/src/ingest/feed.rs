// RSS/Atom feed fetching and normalization.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::traits::FeedFetcher;

/// One feed entry before store normalization. Image candidates are kept
/// separate per strategy so extraction can apply its fallback order.
#[derive(Debug, Clone, Default)]
pub struct RawItem {
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub url: String,
    /// Structured media attachment URLs (media:content, enclosures).
    pub media_urls: Vec<String>,
    /// Thumbnail-like fields (media:thumbnail and friends).
    pub thumbnail_urls: Vec<String>,
}

pub struct FeedService {
    client: reqwest::Client,
}

impl FeedService {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build feed HTTP client");
        Self { client }
    }
}

impl Default for FeedService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedFetcher for FeedService {
    async fn fetch(&self, url: &str) -> Result<Vec<RawItem>> {
        let resp = self
            .client
            .get(url)
            .header("User-Agent", "newsloom/0.1")
            .send()
            .await
            .context("feed fetch failed")?;

        let bytes = resp.bytes().await.context("failed to read feed body")?;
        let feed = feed_rs::parser::parse(&bytes[..]).context("failed to parse RSS/Atom feed")?;

        let items = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let url = entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;

                // The entry id is the feed-scoped dedup key; fall back to
                // the link for feeds that omit ids.
                let external_id = if entry.id.is_empty() {
                    url.clone()
                } else {
                    entry.id.clone()
                };

                let published_at = entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.with_timezone(&Utc));

                let description = entry
                    .summary
                    .map(|t| t.content)
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .unwrap_or_default();

                let mut media_urls = Vec::new();
                let mut thumbnail_urls = Vec::new();
                for media in &entry.media {
                    for content in &media.content {
                        if let Some(u) = content.url.as_ref() {
                            media_urls.push(u.to_string());
                        }
                    }
                    for thumb in &media.thumbnails {
                        thumbnail_urls.push(thumb.image.uri.clone());
                    }
                }

                Some(RawItem {
                    external_id,
                    title: entry.title.map(|t| t.content).unwrap_or_default(),
                    description,
                    author: entry.authors.first().map(|a| a.name.clone()),
                    published_at,
                    url,
                    media_urls,
                    thumbnail_urls,
                })
            })
            .collect();

        Ok(items)
    }
}
