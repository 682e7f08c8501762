//! Scoring engine: evaluates each item against the enabled criteria via
//! the AI provider and computes a weighted aggregate.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use ai_client::{parse_completion, CompletionProvider, CompletionRequest};
use newsloom_common::{CycleConfig, Outcome, StageTally};
use newsloom_store::{CriterionScore, NewRating, Rating, SourceItem};

use crate::batch::run_batched;
use crate::prompts;
use crate::traits::PipelineStore;

/// What the provider returns for one criterion.
#[derive(Debug, Deserialize)]
struct CriterionVerdict {
    score: f64,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Default)]
pub struct ScoringReport {
    pub ratings: HashMap<Uuid, Rating>,
    pub tally: StageTally,
}

pub struct Scorer<'a> {
    provider: &'a dyn CompletionProvider,
    store: &'a dyn PipelineStore,
}

impl<'a> Scorer<'a> {
    pub fn new(provider: &'a dyn CompletionProvider, store: &'a dyn PipelineStore) -> Self {
        Self { provider, store }
    }

    /// Score every item. Items run in fixed-size batches, concurrently
    /// within a batch; one item's failure never aborts its siblings —
    /// the item just ends up without a Rating and out of the ranking.
    pub async fn score_items(
        &self,
        config: &CycleConfig,
        cycle_id: Uuid,
        items: &[SourceItem],
    ) -> ScoringReport {
        let delay = Duration::from_millis(config.batch_delay_ms);
        let outcomes = run_batched(
            items.iter().collect::<Vec<_>>(),
            config.batch_size,
            delay,
            |item| async move { (item.id, self.score_item(config, cycle_id, item).await) },
        )
        .await;

        let mut report = ScoringReport::default();
        for (item_id, result) in outcomes {
            match result {
                Ok(rating) => {
                    report.ratings.insert(item_id, rating);
                    report.tally.record(&Outcome::Success);
                }
                Err(e) => {
                    warn!(item_id = %item_id, error = %e, "scoring failed, item gets no rating");
                    report.tally.record(&Outcome::failed(e));
                }
            }
        }

        info!(tally = %report.tally, "scoring complete");
        report
    }

    async fn score_item(
        &self,
        config: &CycleConfig,
        cycle_id: Uuid,
        item: &SourceItem,
    ) -> Result<Rating> {
        let mut criteria = Vec::with_capacity(config.criteria.len());

        for criterion in &config.criteria {
            let request = CompletionRequest::new(prompts::criterion_prompt(criterion, item))
                .system(prompts::SCORING_SYSTEM_PROMPT)
                .max_tokens(1024)
                .temperature(0.0);

            let raw = self
                .provider
                .complete(request)
                .await
                .with_context(|| format!("criterion '{}' call failed", criterion.name))?;

            let verdict: CriterionVerdict = parse_completion(&raw)
                .with_context(|| format!("criterion '{}' response unparseable", criterion.name))?;

            if !verdict.score.is_finite() || !(0.0..=10.0).contains(&verdict.score) {
                bail!(
                    "criterion '{}' score {} outside [0, 10]",
                    criterion.name,
                    verdict.score
                );
            }

            criteria.push(CriterionScore {
                name: criterion.name.clone(),
                score: verdict.score,
                weight: criterion.weight,
                reason: verdict.reason,
            });
        }

        let total_score = weighted_total(&criteria);
        let rating = self
            .store
            .insert_rating(NewRating {
                source_item_id: item.id,
                cycle_id,
                criteria,
                total_score,
            })
            .await?;

        Ok(rating)
    }
}

/// The aggregate is an unnormalized weighted sum: its maximum depends on
/// how many criteria are enabled and their weights, so totals are only
/// comparable within one configuration. Preserved deliberately — ranking
/// semantics depend on it.
pub fn weighted_total(criteria: &[CriterionScore]) -> f64 {
    criteria.iter().map(|c| c.score * c.weight).sum()
}
