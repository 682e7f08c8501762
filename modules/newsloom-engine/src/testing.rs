//! In-memory doubles for the pipeline's trait seams, plus fixture
//! helpers. Everything here is deterministic: no network, no database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use ai_client::{CompletionError, CompletionProvider, CompletionRequest};
use newsloom_store::{
    ArchiveCounts, Article, CriterionScore, Cycle, CycleCounts, CycleStatus, Feed, Json,
    NewArticle, NewDuplicateGroup, NewRating, NewSourceItem, Rating, SourceItem,
};

use crate::ingest::feed::RawItem;
use crate::traits::{FeedFetcher, ImageHost, PipelineStore};

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreInner {
    feeds: Vec<Feed>,
    cycles: Vec<Cycle>,
    items: Vec<SourceItem>,
    ratings: Vec<Rating>,
    articles: Vec<Article>,
    groups: Vec<NewDuplicateGroup>,
    archived: HashMap<Uuid, ArchiveCounts>,
    settings: HashMap<String, Value>,
    fail_next_archive: bool,
    lose_archive_rows: bool,
}

/// Stateful in-memory [`PipelineStore`].
#[derive(Default)]
pub struct MockStore {
    inner: Mutex<StoreInner>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_feed(&self, name: &str, url: &str) -> Uuid {
        let mut inner = self.inner.lock().unwrap();
        let feed = Feed {
            id: Uuid::new_v4(),
            name: name.to_string(),
            url: url.to_string(),
            active: true,
            last_processed_at: None,
            error_count: 0,
            created_at: Utc::now(),
        };
        let id = feed.id;
        inner.feeds.push(feed);
        id
    }

    pub fn set_feed_error_count(&self, feed_id: Uuid, count: i32) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(feed) = inner.feeds.iter_mut().find(|f| f.id == feed_id) {
            feed.error_count = count;
        }
    }

    pub fn feed_error_count(&self, feed_id: Uuid) -> i32 {
        let inner = self.inner.lock().unwrap();
        inner
            .feeds
            .iter()
            .find(|f| f.id == feed_id)
            .map(|f| f.error_count)
            .unwrap_or(0)
    }

    pub fn set_setting(&self, key: &str, value: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner.settings.insert(key.to_string(), value);
    }

    pub fn cycle(&self, cycle_id: Uuid) -> Cycle {
        let inner = self.inner.lock().unwrap();
        inner
            .cycles
            .iter()
            .find(|c| c.id == cycle_id)
            .cloned()
            .expect("unknown cycle")
    }

    pub fn cycle_status(&self, cycle_id: Uuid) -> String {
        self.cycle(cycle_id).status
    }

    pub fn cycle_subject(&self, cycle_id: Uuid) -> Option<String> {
        self.cycle(cycle_id).subject_line
    }

    pub fn article_count(&self, cycle_id: Uuid) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .articles
            .iter()
            .filter(|a| a.cycle_id == cycle_id)
            .count()
    }

    pub fn cycle_counts_sync(&self, cycle_id: Uuid) -> CycleCounts {
        let inner = self.inner.lock().unwrap();
        counts_of(&inner, cycle_id)
    }

    pub fn archived_counts_sync(&self, cycle_id: Uuid) -> ArchiveCounts {
        let inner = self.inner.lock().unwrap();
        inner.archived.get(&cycle_id).copied().unwrap_or_default()
    }

    /// Make the next archive call fail, for rotation atomicity tests.
    pub fn fail_next_archive(&self) {
        self.inner.lock().unwrap().fail_next_archive = true;
    }

    /// Make archive calls report success without banking any rows, for
    /// archive verification tests.
    pub fn lose_archive_rows(&self) {
        self.inner.lock().unwrap().lose_archive_rows = true;
    }
}

fn counts_of(inner: &StoreInner, cycle_id: Uuid) -> CycleCounts {
    CycleCounts {
        items: inner.items.iter().filter(|i| i.cycle_id == cycle_id).count() as i64,
        ratings: inner
            .ratings
            .iter()
            .filter(|r| r.cycle_id == cycle_id)
            .count() as i64,
        articles: inner
            .articles
            .iter()
            .filter(|a| a.cycle_id == cycle_id)
            .count() as i64,
        active_articles: inner
            .articles
            .iter()
            .filter(|a| a.cycle_id == cycle_id && a.active)
            .count() as i64,
    }
}

#[async_trait]
impl PipelineStore for MockStore {
    async fn find_or_create_cycle(&self, date: NaiveDate) -> Result<Cycle> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(cycle) = inner.cycles.iter().find(|c| c.date == date) {
            return Ok(cycle.clone());
        }
        let cycle = Cycle {
            id: Uuid::new_v4(),
            date,
            status: CycleStatus::Processing.as_str().to_string(),
            subject_line: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        inner.cycles.push(cycle.clone());
        Ok(cycle)
    }

    async fn previous_cycle(&self, before: NaiveDate) -> Result<Option<Cycle>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .cycles
            .iter()
            .filter(|c| c.date < before)
            .max_by_key(|c| c.date)
            .cloned())
    }

    async fn update_cycle_status(&self, cycle_id: Uuid, status: CycleStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(cycle) = inner.cycles.iter_mut().find(|c| c.id == cycle_id) {
            cycle.status = status.as_str().to_string();
            cycle.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_subject_line(&self, cycle_id: Uuid, subject: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(cycle) = inner.cycles.iter_mut().find(|c| c.id == cycle_id) {
            cycle.subject_line = Some(subject.to_string());
        }
        Ok(())
    }

    async fn active_feeds(&self) -> Result<Vec<Feed>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.feeds.iter().filter(|f| f.active).cloned().collect())
    }

    async fn mark_feed_success(&self, feed_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(feed) = inner.feeds.iter_mut().find(|f| f.id == feed_id) {
            feed.error_count = 0;
            feed.last_processed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_feed_failure(&self, feed_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(feed) = inner.feeds.iter_mut().find(|f| f.id == feed_id) {
            feed.error_count += 1;
        }
        Ok(())
    }

    async fn item_exists(&self, feed_id: Uuid, external_id: &str) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .items
            .iter()
            .any(|i| i.feed_id == feed_id && i.external_id == external_id))
    }

    async fn insert_item(&self, item: NewSourceItem) -> Result<SourceItem> {
        let mut inner = self.inner.lock().unwrap();
        let stored = SourceItem {
            id: Uuid::new_v4(),
            feed_id: item.feed_id,
            external_id: item.external_id,
            title: item.title,
            description: item.description,
            author: item.author,
            published_at: item.published_at,
            url: item.url,
            image_url: item.image_url,
            cycle_id: item.cycle_id,
            created_at: Utc::now(),
        };
        inner.items.push(stored.clone());
        Ok(stored)
    }

    async fn items_for_cycle(&self, cycle_id: Uuid) -> Result<Vec<SourceItem>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .items
            .iter()
            .filter(|i| i.cycle_id == cycle_id)
            .cloned()
            .collect())
    }

    async fn insert_rating(&self, rating: NewRating) -> Result<Rating> {
        let mut inner = self.inner.lock().unwrap();
        let stored = Rating {
            id: Uuid::new_v4(),
            source_item_id: rating.source_item_id,
            cycle_id: rating.cycle_id,
            criteria: Json(rating.criteria),
            total_score: rating.total_score,
            created_at: Utc::now(),
        };
        inner.ratings.push(stored.clone());
        Ok(stored)
    }

    async fn ratings_for_cycle(&self, cycle_id: Uuid) -> Result<Vec<Rating>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .ratings
            .iter()
            .filter(|r| r.cycle_id == cycle_id)
            .cloned()
            .collect())
    }

    async fn insert_duplicate_group(&self, group: NewDuplicateGroup) -> Result<Uuid> {
        let mut inner = self.inner.lock().unwrap();
        inner.groups.push(group);
        Ok(Uuid::new_v4())
    }

    async fn insert_article(&self, article: NewArticle) -> Result<Article> {
        let mut inner = self.inner.lock().unwrap();
        let stored = Article {
            id: Uuid::new_v4(),
            source_item_id: article.source_item_id,
            cycle_id: article.cycle_id,
            headline: article.headline,
            body: article.body,
            rank: None,
            active: false,
            fact_check_score: article.fact_check_score,
            fact_check_details: article.fact_check_details,
            word_count: article.word_count,
            created_at: Utc::now(),
        };
        inner.articles.push(stored.clone());
        Ok(stored)
    }

    async fn articles_for_cycle(&self, cycle_id: Uuid) -> Result<Vec<Article>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .articles
            .iter()
            .filter(|a| a.cycle_id == cycle_id)
            .cloned()
            .collect())
    }

    async fn activate_article(&self, article_id: Uuid, rank: i32) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(article) = inner.articles.iter_mut().find(|a| a.id == article_id) {
            article.active = true;
            article.rank = Some(rank);
        }
        Ok(())
    }

    async fn archive_articles(&self, cycle: &Cycle, _reason: &str) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_next_archive {
            inner.fail_next_archive = false;
            bail!("injected archive failure");
        }
        let count = inner
            .articles
            .iter()
            .filter(|a| a.cycle_id == cycle.id)
            .count() as u64;
        if !inner.lose_archive_rows {
            inner.archived.entry(cycle.id).or_default().articles += count;
        }
        Ok(count)
    }

    async fn archive_items_and_ratings(&self, cycle: &Cycle, _reason: &str) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_next_archive {
            inner.fail_next_archive = false;
            bail!("injected archive failure");
        }
        let items = inner
            .items
            .iter()
            .filter(|i| i.cycle_id == cycle.id)
            .count() as u64;
        let ratings = inner
            .ratings
            .iter()
            .filter(|r| r.cycle_id == cycle.id)
            .count() as u64;
        if !inner.lose_archive_rows {
            let archived = inner.archived.entry(cycle.id).or_default();
            archived.items += items;
            archived.ratings += ratings;
        }
        Ok((items, ratings))
    }

    async fn clear_cycle(&self, cycle_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.articles.retain(|a| a.cycle_id != cycle_id);
        inner.ratings.retain(|r| r.cycle_id != cycle_id);
        inner.groups.retain(|g| g.cycle_id != cycle_id);
        inner.items.retain(|i| i.cycle_id != cycle_id);
        Ok(())
    }

    async fn cycle_counts(&self, cycle_id: Uuid) -> Result<CycleCounts> {
        Ok(self.cycle_counts_sync(cycle_id))
    }

    async fn archived_counts(&self, cycle_id: Uuid) -> Result<ArchiveCounts> {
        Ok(self.archived_counts_sync(cycle_id))
    }

    async fn load_settings(&self) -> Result<HashMap<String, Value>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.settings.clone())
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Canned completion provider. Rules match by substring of the user
/// prompt, in registration order; unmatched prompts fall through to the
/// default response, or an error when there is none.
#[derive(Default)]
pub struct MockProvider {
    rules: Vec<(String, String)>,
    default: Option<String>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_when(mut self, needle: &str, response: &str) -> Self {
        self.rules.push((needle.to_string(), response.to_string()));
        self
    }

    pub fn with_default(mut self, response: &str) -> Self {
        self.default = Some(response.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> ai_client::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for (needle, response) in &self.rules {
            if request.prompt.contains(needle) {
                return Ok(response.clone());
            }
        }
        match &self.default {
            Some(response) => Ok(response.clone()),
            None => Err(CompletionError::Provider(format!(
                "no canned response for prompt: {}",
                ai_client::truncate_utf8(&request.prompt, 80)
            ))),
        }
    }
}

/// Provider that always fails.
pub struct FailingProvider;

#[async_trait]
impl CompletionProvider for FailingProvider {
    async fn complete(&self, _request: CompletionRequest) -> ai_client::Result<String> {
        Err(CompletionError::Provider("provider down".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Feed fetcher and image hosts
// ---------------------------------------------------------------------------

/// Canned feed fetcher keyed by feed URL; unregistered URLs fail.
#[derive(Default)]
pub struct MockFeedFetcher {
    feeds: HashMap<String, Vec<RawItem>>,
}

impl MockFeedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_feed(mut self, url: &str, items: Vec<RawItem>) -> Self {
        self.feeds.insert(url.to_string(), items);
        self
    }
}

#[async_trait]
impl FeedFetcher for MockFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<RawItem>> {
        match self.feeds.get(url) {
            Some(items) => Ok(items.clone()),
            None => bail!("connection refused: {url}"),
        }
    }
}

/// Image host that always declines.
pub struct NullImageHost;

#[async_trait]
impl ImageHost for NullImageHost {
    async fn upload_image(&self, _source_url: &str, _label: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Image host that accepts every upload and returns a fixed URL.
pub struct FixedImageHost {
    hosted_url: String,
    uploads: AtomicUsize,
}

impl FixedImageHost {
    pub fn new(hosted_url: &str) -> Self {
        Self {
            hosted_url: hosted_url.to_string(),
            uploads: AtomicUsize::new(0),
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageHost for FixedImageHost {
    async fn upload_image(&self, _source_url: &str, _label: &str) -> Result<Option<String>> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.hosted_url.clone()))
    }
}

// ---------------------------------------------------------------------------
// Fixture helpers
// ---------------------------------------------------------------------------

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn today_cycle(store: &MockStore) -> Cycle {
    cycle_for(store, today()).await
}

pub async fn cycle_for(store: &MockStore, date: NaiveDate) -> Cycle {
    store
        .find_or_create_cycle(date)
        .await
        .expect("mock cycle creation cannot fail")
}

/// Insert a source item whose title (and thus every prompt built from
/// it) contains `title`, for `MockProvider::respond_when` matching.
pub async fn source_item(store: &MockStore, cycle: &Cycle, title: &str) -> SourceItem {
    let external_id = Uuid::new_v4().to_string();
    store
        .insert_item(NewSourceItem {
            feed_id: Uuid::new_v4(),
            external_id: external_id.clone(),
            title: title.to_string(),
            description: format!("{title} full text"),
            author: None,
            published_at: Utc::now(),
            url: format!("https://example.com/{external_id}"),
            image_url: None,
            cycle_id: cycle.id,
        })
        .await
        .expect("mock item insert cannot fail")
}

/// Insert a single-criterion rating with the given weighted total.
pub async fn rating_for(store: &MockStore, cycle: &Cycle, item: &SourceItem, total: f64) -> Rating {
    store
        .insert_rating(NewRating {
            source_item_id: item.id,
            cycle_id: cycle.id,
            criteria: vec![CriterionScore {
                name: "relevance".to_string(),
                score: total,
                weight: 1.0,
                reason: String::new(),
            }],
            total_score: total,
        })
        .await
        .expect("mock rating insert cannot fail")
}

/// Insert an inactive article headlined with the item's title.
pub async fn article_for(
    store: &MockStore,
    cycle: &Cycle,
    item: &SourceItem,
    fact_check_score: f64,
) -> Article {
    store
        .insert_article(NewArticle {
            source_item_id: item.id,
            cycle_id: cycle.id,
            headline: item.title.clone(),
            body: format!("{} rewritten body", item.title),
            fact_check_score,
            fact_check_details: json!({
                "score": fact_check_score,
                "passed": fact_check_score >= 15.0,
                "issues": [],
            }),
            word_count: 3,
        })
        .await
        .expect("mock article insert cannot fail")
}
