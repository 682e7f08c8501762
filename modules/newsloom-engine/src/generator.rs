//! Article generation with the fact-check gate. Every rated,
//! non-duplicate item gets rewritten copy plus a fact-check verdict; the
//! article row is stored whether or not the check passes so failed
//! generations stay auditable.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use ai_client::{parse_completion, CompletionProvider, CompletionRequest};
use newsloom_common::{CycleConfig, Outcome, StageTally};
use newsloom_store::{Article, NewArticle, Rating, SourceItem};

use crate::batch::run_batched;
use crate::prompts;
use crate::traits::PipelineStore;

#[derive(Debug, Deserialize)]
struct GeneratedCopy {
    headline: String,
    body: String,
}

/// Stored verbatim as the article's fact-check detail payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct FactCheckVerdict {
    pub score: f64,
    pub passed: bool,
    #[serde(default)]
    pub issues: Vec<String>,
}

#[derive(Debug, Default)]
pub struct GenerationReport {
    pub articles: Vec<Article>,
    pub tally: StageTally,
}

pub struct ArticleGenerator<'a> {
    provider: &'a dyn CompletionProvider,
    store: &'a dyn PipelineStore,
}

impl<'a> ArticleGenerator<'a> {
    pub fn new(provider: &'a dyn CompletionProvider, store: &'a dyn PipelineStore) -> Self {
        Self { provider, store }
    }

    /// Generate articles for every rated item that is not a duplicate
    /// member. One item's failure produces no row and never aborts the
    /// batch.
    pub async fn generate(
        &self,
        config: &CycleConfig,
        cycle_id: Uuid,
        items: &[SourceItem],
        ratings: &HashMap<Uuid, Rating>,
        excluded: &HashSet<Uuid>,
    ) -> GenerationReport {
        let eligible: Vec<&SourceItem> = items
            .iter()
            .filter(|item| ratings.contains_key(&item.id) && !excluded.contains(&item.id))
            .collect();

        let delay = Duration::from_millis(config.batch_delay_ms);
        let outcomes = run_batched(eligible, config.batch_size, delay, |item| async move {
            (item.id, self.generate_one(cycle_id, item).await)
        })
        .await;

        let mut report = GenerationReport::default();
        for (item_id, result) in outcomes {
            match result {
                Ok(article) => {
                    report.articles.push(article);
                    report.tally.record(&Outcome::Success);
                }
                Err(e) => {
                    warn!(item_id = %item_id, error = %e, "article generation failed, skipping item");
                    report.tally.record(&Outcome::failed(e));
                }
            }
        }

        info!(tally = %report.tally, "article generation complete");
        report
    }

    async fn generate_one(&self, cycle_id: Uuid, item: &SourceItem) -> Result<Article> {
        let rewrite = CompletionRequest::new(prompts::rewrite_prompt(item))
            .system(prompts::REWRITE_SYSTEM_PROMPT)
            .max_tokens(2048)
            .temperature(0.7);
        let raw = self
            .provider
            .complete(rewrite)
            .await
            .context("rewrite call failed")?;
        let copy: GeneratedCopy =
            parse_completion(&raw).context("rewrite response unparseable")?;

        let check = CompletionRequest::new(prompts::fact_check_prompt(
            &copy.headline,
            &copy.body,
            item,
        ))
        .system(prompts::FACT_CHECK_SYSTEM_PROMPT)
        .max_tokens(1024)
        .temperature(0.0);
        let raw = self
            .provider
            .complete(check)
            .await
            .context("fact-check call failed")?;
        let verdict: FactCheckVerdict =
            parse_completion(&raw).context("fact-check response unparseable")?;

        let word_count = copy.body.split_whitespace().count() as i32;
        let article = self
            .store
            .insert_article(NewArticle {
                source_item_id: item.id,
                cycle_id,
                headline: copy.headline,
                body: copy.body,
                fact_check_score: verdict.score,
                fact_check_details: serde_json::to_value(&verdict)?,
                word_count,
            })
            .await?;

        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{rating_for, source_item, today_cycle, MockProvider, MockStore};

    const COPY: &str = r#"{"headline": "New Head", "body": "three word body"}"#;
    const PASS: &str = r#"{"score": 18, "passed": true, "issues": []}"#;

    #[tokio::test]
    async fn duplicate_members_get_no_articles() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;
        let primary = source_item(&store, &cycle, "Primary").await;
        let dup = source_item(&store, &cycle, "Dup").await;

        let mut ratings = HashMap::new();
        ratings.insert(primary.id, rating_for(&store, &cycle, &primary, 20.0).await);
        ratings.insert(dup.id, rating_for(&store, &cycle, &dup, 25.0).await);

        let mut excluded = HashSet::new();
        excluded.insert(dup.id);

        let provider = MockProvider::new()
            .respond_when("Rewritten headline", PASS)
            .with_default(COPY);

        let mut config = CycleConfig::default();
        config.batch_delay_ms = 0;

        let report = ArticleGenerator::new(&provider, &store)
            .generate(&config, cycle.id, &[primary.clone(), dup.clone()], &ratings, &excluded)
            .await;

        assert_eq!(report.articles.len(), 1);
        assert_eq!(report.articles[0].source_item_id, primary.id);
    }

    #[tokio::test]
    async fn unrated_items_are_not_generated() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;
        let rated = source_item(&store, &cycle, "Rated").await;
        let unrated = source_item(&store, &cycle, "Unrated").await;

        let mut ratings = HashMap::new();
        ratings.insert(rated.id, rating_for(&store, &cycle, &rated, 15.0).await);

        let provider = MockProvider::new()
            .respond_when("Rewritten headline", PASS)
            .with_default(COPY);

        let mut config = CycleConfig::default();
        config.batch_delay_ms = 0;

        let report = ArticleGenerator::new(&provider, &store)
            .generate(
                &config,
                cycle.id,
                &[rated.clone(), unrated.clone()],
                &ratings,
                &HashSet::new(),
            )
            .await;

        assert_eq!(report.articles.len(), 1);
        assert_eq!(report.articles[0].source_item_id, rated.id);
    }

    #[tokio::test]
    async fn failed_fact_check_still_stores_article_inactive() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;
        let item = source_item(&store, &cycle, "Shaky").await;

        let mut ratings = HashMap::new();
        ratings.insert(item.id, rating_for(&store, &cycle, &item, 20.0).await);

        let provider = MockProvider::new()
            .respond_when(
                "Rewritten headline",
                r#"{"score": 6, "passed": false, "issues": ["made-up quote"]}"#,
            )
            .with_default(COPY);

        let mut config = CycleConfig::default();
        config.batch_delay_ms = 0;

        let report = ArticleGenerator::new(&provider, &store)
            .generate(&config, cycle.id, &[item.clone()], &ratings, &HashSet::new())
            .await;

        assert_eq!(report.articles.len(), 1);
        let article = &report.articles[0];
        assert_eq!(article.fact_check_score, 6.0);
        assert!(!article.active);
        assert_eq!(article.fact_check_details["issues"][0], "made-up quote");
    }

    #[tokio::test]
    async fn one_bad_generation_skips_item_without_row() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;
        let good = source_item(&store, &cycle, "Fine Story").await;
        let bad = source_item(&store, &cycle, "Broken Story").await;

        let mut ratings = HashMap::new();
        ratings.insert(good.id, rating_for(&store, &cycle, &good, 20.0).await);
        ratings.insert(bad.id, rating_for(&store, &cycle, &bad, 20.0).await);

        let provider = MockProvider::new()
            .respond_when("Broken Story", "total nonsense")
            .respond_when("Rewritten headline", PASS)
            .with_default(COPY);

        let mut config = CycleConfig::default();
        config.batch_delay_ms = 0;

        let report = ArticleGenerator::new(&provider, &store)
            .generate(&config, cycle.id, &[good.clone(), bad.clone()], &ratings, &HashSet::new())
            .await;

        assert_eq!(report.articles.len(), 1);
        assert_eq!(report.articles[0].source_item_id, good.id);
        assert_eq!(report.tally.failed, 1);
        assert_eq!(store.article_count(cycle.id), 1);
    }

    #[tokio::test]
    async fn word_count_is_computed_from_body() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;
        let item = source_item(&store, &cycle, "Counted").await;

        let mut ratings = HashMap::new();
        ratings.insert(item.id, rating_for(&store, &cycle, &item, 20.0).await);

        let provider = MockProvider::new()
            .respond_when("Rewritten headline", PASS)
            .with_default(COPY);

        let mut config = CycleConfig::default();
        config.batch_delay_ms = 0;

        let report = ArticleGenerator::new(&provider, &store)
            .generate(&config, cycle.id, &[item.clone()], &ratings, &HashSet::new())
            .await;

        assert_eq!(report.articles[0].word_count, 3);
    }
}
