// Trait abstractions for the pipeline's external dependencies.
//
// PipelineStore fronts the Postgres store, FeedFetcher the feed
// fetch/parse path, ImageHost the object-storage re-hosting service.
// These enable deterministic testing with MockStore, MockFeedFetcher,
// and NullImageHost: no network, no database, no Docker.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use newsloom_store::{
    ArchiveCounts, Article, Cycle, CycleCounts, CycleStatus, Feed, NewArticle, NewDuplicateGroup,
    NewRating, NewSourceItem, Rating, SourceItem, Store,
};

use crate::ingest::feed::RawItem;

// ---------------------------------------------------------------------------
// PipelineStore — fronts the durable store
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PipelineStore: Send + Sync {
    // --- Cycles ---
    async fn find_or_create_cycle(&self, date: NaiveDate) -> Result<Cycle>;
    async fn previous_cycle(&self, before: NaiveDate) -> Result<Option<Cycle>>;
    async fn update_cycle_status(&self, cycle_id: Uuid, status: CycleStatus) -> Result<()>;
    async fn set_subject_line(&self, cycle_id: Uuid, subject: &str) -> Result<()>;

    // --- Feeds ---
    async fn active_feeds(&self) -> Result<Vec<Feed>>;
    async fn mark_feed_success(&self, feed_id: Uuid) -> Result<()>;
    async fn mark_feed_failure(&self, feed_id: Uuid) -> Result<()>;

    // --- Source items ---
    async fn item_exists(&self, feed_id: Uuid, external_id: &str) -> Result<bool>;
    async fn insert_item(&self, item: NewSourceItem) -> Result<SourceItem>;
    async fn items_for_cycle(&self, cycle_id: Uuid) -> Result<Vec<SourceItem>>;

    // --- Ratings ---
    async fn insert_rating(&self, rating: NewRating) -> Result<Rating>;
    async fn ratings_for_cycle(&self, cycle_id: Uuid) -> Result<Vec<Rating>>;

    // --- Duplicates ---
    async fn insert_duplicate_group(&self, group: NewDuplicateGroup) -> Result<Uuid>;

    // --- Articles ---
    async fn insert_article(&self, article: NewArticle) -> Result<Article>;
    async fn articles_for_cycle(&self, cycle_id: Uuid) -> Result<Vec<Article>>;
    async fn activate_article(&self, article_id: Uuid, rank: i32) -> Result<()>;

    // --- Archival ---
    async fn archive_articles(&self, cycle: &Cycle, reason: &str) -> Result<u64>;
    async fn archive_items_and_ratings(&self, cycle: &Cycle, reason: &str) -> Result<(u64, u64)>;
    async fn clear_cycle(&self, cycle_id: Uuid) -> Result<()>;
    async fn cycle_counts(&self, cycle_id: Uuid) -> Result<CycleCounts>;
    async fn archived_counts(&self, cycle_id: Uuid) -> Result<ArchiveCounts>;

    // --- Settings ---
    async fn load_settings(&self) -> Result<HashMap<String, Value>>;
}

#[async_trait]
impl PipelineStore for Store {
    async fn find_or_create_cycle(&self, date: NaiveDate) -> Result<Cycle> {
        Ok(Store::find_or_create_cycle(self, date).await?)
    }

    async fn previous_cycle(&self, before: NaiveDate) -> Result<Option<Cycle>> {
        Ok(Store::previous_cycle(self, before).await?)
    }

    async fn update_cycle_status(&self, cycle_id: Uuid, status: CycleStatus) -> Result<()> {
        Ok(Store::update_cycle_status(self, cycle_id, status).await?)
    }

    async fn set_subject_line(&self, cycle_id: Uuid, subject: &str) -> Result<()> {
        Ok(Store::set_subject_line(self, cycle_id, subject).await?)
    }

    async fn active_feeds(&self) -> Result<Vec<Feed>> {
        Ok(Store::active_feeds(self).await?)
    }

    async fn mark_feed_success(&self, feed_id: Uuid) -> Result<()> {
        Ok(Store::mark_feed_success(self, feed_id).await?)
    }

    async fn mark_feed_failure(&self, feed_id: Uuid) -> Result<()> {
        Ok(Store::mark_feed_failure(self, feed_id).await?)
    }

    async fn item_exists(&self, feed_id: Uuid, external_id: &str) -> Result<bool> {
        Ok(Store::item_exists(self, feed_id, external_id).await?)
    }

    async fn insert_item(&self, item: NewSourceItem) -> Result<SourceItem> {
        Ok(Store::insert_item(self, item).await?)
    }

    async fn items_for_cycle(&self, cycle_id: Uuid) -> Result<Vec<SourceItem>> {
        Ok(Store::items_for_cycle(self, cycle_id).await?)
    }

    async fn insert_rating(&self, rating: NewRating) -> Result<Rating> {
        Ok(Store::insert_rating(self, rating).await?)
    }

    async fn ratings_for_cycle(&self, cycle_id: Uuid) -> Result<Vec<Rating>> {
        Ok(Store::ratings_for_cycle(self, cycle_id).await?)
    }

    async fn insert_duplicate_group(&self, group: NewDuplicateGroup) -> Result<Uuid> {
        Ok(Store::insert_duplicate_group(self, group).await?)
    }

    async fn insert_article(&self, article: NewArticle) -> Result<Article> {
        Ok(Store::insert_article(self, article).await?)
    }

    async fn articles_for_cycle(&self, cycle_id: Uuid) -> Result<Vec<Article>> {
        Ok(Store::articles_for_cycle(self, cycle_id).await?)
    }

    async fn activate_article(&self, article_id: Uuid, rank: i32) -> Result<()> {
        Ok(Store::activate_article(self, article_id, rank).await?)
    }

    async fn archive_articles(&self, cycle: &Cycle, reason: &str) -> Result<u64> {
        Ok(Store::archive_articles(self, cycle, reason).await?)
    }

    async fn archive_items_and_ratings(&self, cycle: &Cycle, reason: &str) -> Result<(u64, u64)> {
        Ok(Store::archive_items_and_ratings(self, cycle, reason).await?)
    }

    async fn clear_cycle(&self, cycle_id: Uuid) -> Result<()> {
        Ok(Store::clear_cycle(self, cycle_id).await?)
    }

    async fn cycle_counts(&self, cycle_id: Uuid) -> Result<CycleCounts> {
        Ok(Store::cycle_counts(self, cycle_id).await?)
    }

    async fn archived_counts(&self, cycle_id: Uuid) -> Result<ArchiveCounts> {
        Ok(Store::archived_counts(self, cycle_id).await?)
    }

    async fn load_settings(&self) -> Result<HashMap<String, Value>> {
        Ok(Store::load_settings(self).await?)
    }
}

// ---------------------------------------------------------------------------
// FeedFetcher — fetch and parse one feed URL
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<RawItem>>;
}

// ---------------------------------------------------------------------------
// ImageHost — object-storage re-hosting service
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Re-host an externally-hosted image. `Ok(None)` means the service
    /// declined; callers keep the original URL in that case.
    async fn upload_image(&self, source_url: &str, label: &str) -> Result<Option<String>>;
}
