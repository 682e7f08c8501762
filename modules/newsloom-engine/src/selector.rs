//! Selection: pick the top fact-checked articles, assign dense ranks,
//! and give the cycle a subject line when it does not have one yet.

use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::Result;
use tracing::{info, warn};
use uuid::Uuid;

use ai_client::{CompletionProvider, CompletionRequest};
use newsloom_common::CycleConfig;
use newsloom_store::{Article, Cycle, Rating};

use crate::prompts;
use crate::traits::PipelineStore;

const MAX_SUBJECT_CHARS: usize = 70;

#[derive(Debug, Default)]
pub struct SelectionReport {
    /// Activated articles in rank order.
    pub activated: Vec<Article>,
    pub subject_line: Option<String>,
}

pub struct Selector<'a> {
    provider: &'a dyn CompletionProvider,
    store: &'a dyn PipelineStore,
}

impl<'a> Selector<'a> {
    pub fn new(provider: &'a dyn CompletionProvider, store: &'a dyn PipelineStore) -> Self {
        Self { provider, store }
    }

    /// Activate the top candidates with dense ranks 1..N and, if the
    /// cycle has no subject line yet, generate one from the lead story.
    /// Subject generation is best-effort; its failure never fails
    /// selection.
    pub async fn select(
        &self,
        config: &CycleConfig,
        cycle: &Cycle,
        articles: &[Article],
        ratings: &HashMap<Uuid, Rating>,
    ) -> Result<SelectionReport> {
        let ranked = rank_candidates(articles, ratings, config);

        let mut report = SelectionReport::default();
        for (i, article) in ranked.into_iter().take(config.max_active_articles).enumerate() {
            let rank = (i + 1) as i32;
            self.store.activate_article(article.id, rank).await?;
            let mut activated = article;
            activated.active = true;
            activated.rank = Some(rank);
            report.activated.push(activated);
        }

        info!(
            activated = report.activated.len(),
            candidates = articles.len(),
            "selection complete"
        );

        if cycle.subject_line.is_none() {
            if let Some(lead) = report.activated.first() {
                report.subject_line = self.generate_subject(cycle, lead).await;
            }
        } else {
            report.subject_line = cycle.subject_line.clone();
        }

        Ok(report)
    }

    async fn generate_subject(&self, cycle: &Cycle, lead: &Article) -> Option<String> {
        let request = CompletionRequest::new(prompts::subject_prompt(lead))
            .system(prompts::SUBJECT_SYSTEM_PROMPT)
            .max_tokens(256)
            .temperature(0.7);

        let raw = match self.provider.complete(request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "subject line generation failed, cycle keeps none");
                return None;
            }
        };

        let subject = clean_subject(&raw);
        if subject.is_empty() {
            warn!("subject line generation returned nothing usable");
            return None;
        }

        if let Err(e) = self.store.set_subject_line(cycle.id, &subject).await {
            warn!(error = %e, "failed to persist subject line");
            return None;
        }
        Some(subject)
    }
}

/// Order the cycle's candidates for activation: drop articles that
/// failed the fact-check threshold or whose source item has no rating,
/// then sort by weighted rating total descending, oldest article first
/// on ties.
pub fn rank_candidates(
    articles: &[Article],
    ratings: &HashMap<Uuid, Rating>,
    config: &CycleConfig,
) -> Vec<Article> {
    let mut candidates: Vec<(&Article, f64)> = articles
        .iter()
        .filter(|a| a.fact_check_score >= config.fact_check_threshold)
        .filter_map(|a| ratings.get(&a.source_item_id).map(|r| (a, r.total_score)))
        .collect();

    candidates.sort_by(|(a, a_total), (b, b_total)| {
        b_total
            .partial_cmp(a_total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });

    candidates.into_iter().map(|(a, _)| a.clone()).collect()
}

/// Providers sometimes wrap subject lines in quotes or pad them with
/// extra lines. Keep the first non-empty line, strip wrapping quotes,
/// and cap the length in characters, since a multi-byte subject is as
/// wide in an inbox as an ASCII one.
fn clean_subject(raw: &str) -> String {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    let line = line
        .trim_matches(|c| c == '"' || c == '\'' || c == '\u{201c}' || c == '\u{201d}')
        .trim();
    line.chars().take(MAX_SUBJECT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        article_for, rating_for, source_item, today_cycle, FailingProvider, MockProvider, MockStore,
    };

    #[test]
    fn clean_subject_strips_quotes_and_extra_lines() {
        assert_eq!(clean_subject("\"Big news today\"\nSecond line"), "Big news today");
        assert_eq!(clean_subject("  \n 'Quiet day' "), "Quiet day");
        assert_eq!(clean_subject(""), "");
    }

    #[test]
    fn clean_subject_caps_length_in_characters() {
        let long = "x".repeat(200);
        assert_eq!(clean_subject(&long).chars().count(), MAX_SUBJECT_CHARS);

        // Multi-byte subjects get the same visible width, not fewer
        // characters for the same byte budget.
        let wide = "日".repeat(200);
        assert_eq!(clean_subject(&wide).chars().count(), MAX_SUBJECT_CHARS);
    }

    #[tokio::test]
    async fn ranks_by_rating_total_and_applies_threshold_and_cap() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;

        // Five candidates: one fails the fact check, the rest rank by
        // rating total with only three activation slots.
        let mut ratings = HashMap::new();
        let mut articles = Vec::new();
        for (title, total, fact_check) in [
            ("Alpha", 12.0, 18.0),
            ("Bravo", 25.0, 16.0),
            ("Charlie", 19.0, 20.0),
            ("Delta", 30.0, 9.0), // best rating, fails fact check
            ("Echo", 16.0, 15.0),
        ] {
            let item = source_item(&store, &cycle, title).await;
            let rating = rating_for(&store, &cycle, &item, total).await;
            ratings.insert(item.id, rating);
            articles.push(article_for(&store, &cycle, &item, fact_check).await);
        }

        let provider = MockProvider::new().with_default("Daily digest");
        let config = CycleConfig::default();
        let report = Selector::new(&provider, &store)
            .select(&config, &cycle, &articles, &ratings)
            .await
            .unwrap();

        let headlines: Vec<&str> = report
            .activated
            .iter()
            .map(|a| a.headline.as_str())
            .collect();
        assert_eq!(headlines, vec!["Bravo", "Charlie", "Echo"]);
        assert_eq!(
            report.activated.iter().map(|a| a.rank).collect::<Vec<_>>(),
            vec![Some(1), Some(2), Some(3)]
        );
        assert!(report.activated.iter().all(|a| a.active));
    }

    #[tokio::test]
    async fn articles_without_ratings_are_not_activated() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;

        let rated = source_item(&store, &cycle, "Rated").await;
        let unrated = source_item(&store, &cycle, "Unrated").await;

        let mut ratings = HashMap::new();
        ratings.insert(rated.id, rating_for(&store, &cycle, &rated, 10.0).await);

        let articles = vec![
            article_for(&store, &cycle, &rated, 18.0).await,
            article_for(&store, &cycle, &unrated, 20.0).await,
        ];

        let provider = MockProvider::new().with_default("Daily digest");
        let report = Selector::new(&provider, &store)
            .select(&CycleConfig::default(), &cycle, &articles, &ratings)
            .await
            .unwrap();

        assert_eq!(report.activated.len(), 1);
        assert_eq!(report.activated[0].headline, "Rated");
    }

    #[tokio::test]
    async fn generates_subject_only_when_absent() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;
        let item = source_item(&store, &cycle, "Lead").await;

        let mut ratings = HashMap::new();
        ratings.insert(item.id, rating_for(&store, &cycle, &item, 10.0).await);
        let articles = vec![article_for(&store, &cycle, &item, 18.0).await];

        let provider = MockProvider::new().with_default("\"Fresh off the wire\"");
        let report = Selector::new(&provider, &store)
            .select(&CycleConfig::default(), &cycle, &articles, &ratings)
            .await
            .unwrap();

        assert_eq!(report.subject_line.as_deref(), Some("Fresh off the wire"));
        assert_eq!(
            store.cycle_subject(cycle.id).as_deref(),
            Some("Fresh off the wire")
        );

        // Second run with the subject already set must not call the
        // provider again.
        let refreshed = store.cycle(cycle.id);
        let quiet = MockProvider::new();
        let report = Selector::new(&quiet, &store)
            .select(&CycleConfig::default(), &refreshed, &articles, &ratings)
            .await
            .unwrap();
        assert_eq!(report.subject_line.as_deref(), Some("Fresh off the wire"));
        assert_eq!(quiet.call_count(), 0);
    }

    #[tokio::test]
    async fn subject_failure_does_not_fail_selection() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;
        let item = source_item(&store, &cycle, "Lead").await;

        let mut ratings = HashMap::new();
        ratings.insert(item.id, rating_for(&store, &cycle, &item, 10.0).await);
        let articles = vec![article_for(&store, &cycle, &item, 18.0).await];

        let report = Selector::new(&FailingProvider, &store)
            .select(&CycleConfig::default(), &cycle, &articles, &ratings)
            .await
            .unwrap();

        assert_eq!(report.activated.len(), 1);
        assert!(report.subject_line.is_none());
        assert!(store.cycle_subject(cycle.id).is_none());
    }

    #[tokio::test]
    async fn no_candidates_means_no_subject_call() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;

        let provider = MockProvider::new();
        let report = Selector::new(&provider, &store)
            .select(&CycleConfig::default(), &cycle, &[], &HashMap::new())
            .await
            .unwrap();

        assert!(report.activated.is_empty());
        assert_eq!(provider.call_count(), 0);
    }
}
