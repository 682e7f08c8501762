//! Cycle orchestration: rotation, ingestion, scoring, duplicate
//! detection, generation, and selection in order, with a digest
//! notification at the end. Per-unit failures are absorbed by the
//! stages; only store-level failures abort a cycle.

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{error, info, warn};
use uuid::Uuid;

use ai_client::CompletionProvider;
use newsloom_common::{CycleConfig, StageTally};
use newsloom_store::{ArchiveCounts, CycleCounts, CycleStatus, Rating, SourceItem};

use crate::archiver::{Archiver, Rotation};
use crate::dedup::DuplicateDetector;
use crate::generator::ArticleGenerator;
use crate::ingest::Ingestor;
use crate::notify::NotifyBackend;
use crate::scorer::Scorer;
use crate::selector::Selector;
use crate::traits::{FeedFetcher, ImageHost, PipelineStore};

/// What one cycle run produced, stage by stage.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub date: NaiveDate,
    pub archived: Option<ArchiveCounts>,
    pub feeds: StageTally,
    pub items: StageTally,
    pub scored: StageTally,
    pub duplicates_excluded: usize,
    pub generated: StageTally,
    pub activated: usize,
    pub subject_line: Option<String>,
}

/// Which stage left the pipeline empty, inferred from live row counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDiagnosis {
    NoItemsIngested,
    NoItemsScored,
    NoArticlesGenerated,
    NoArticlesSelected,
}

impl FailureDiagnosis {
    /// The first stage whose output count is zero, or `None` when the
    /// cycle has live articles.
    pub fn from_counts(counts: &CycleCounts) -> Option<Self> {
        if counts.items == 0 {
            Some(Self::NoItemsIngested)
        } else if counts.ratings == 0 {
            Some(Self::NoItemsScored)
        } else if counts.articles == 0 {
            Some(Self::NoArticlesGenerated)
        } else if counts.active_articles == 0 {
            Some(Self::NoArticlesSelected)
        } else {
            None
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::NoItemsIngested => "no items ingested: check feed health and the ingestion window",
            Self::NoItemsScored => "no items scored: every scoring call failed",
            Self::NoArticlesGenerated => "no articles generated: every generation call failed",
            Self::NoArticlesSelected => {
                "no articles selected: every candidate failed the fact-check threshold"
            }
        }
    }
}

pub struct Orchestrator<'a> {
    store: &'a dyn PipelineStore,
    provider: &'a dyn CompletionProvider,
    fetcher: &'a dyn FeedFetcher,
    image_host: &'a dyn ImageHost,
    notifier: &'a dyn NotifyBackend,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        store: &'a dyn PipelineStore,
        provider: &'a dyn CompletionProvider,
        fetcher: &'a dyn FeedFetcher,
        image_host: &'a dyn ImageHost,
        notifier: &'a dyn NotifyBackend,
    ) -> Self {
        Self {
            store,
            provider,
            fetcher,
            image_host,
            notifier,
        }
    }

    /// Run one full cycle for `date`. The cycle moves to `draft` only
    /// after selection finishes; a store failure anywhere leaves it in
    /// `processing` and raises an alert.
    pub async fn run_cycle(&self, date: NaiveDate) -> Result<CycleReport> {
        let settings = self.store.load_settings().await?;
        let config = CycleConfig::from_settings(&settings);

        match self.run_stages(date, &config).await {
            Ok(report) => {
                if let Err(e) = self.notifier.cycle_complete(&report).await {
                    warn!(error = %e, "cycle digest notification failed");
                }
                Ok(report)
            }
            Err(e) => {
                error!(date = %date, error = %e, "cycle aborted");
                let detail = match self.diagnose(date).await {
                    Some(diagnosis) => format!("{e:#}\nLikely stage: {}", diagnosis.describe()),
                    None => format!("{e:#}"),
                };
                if let Err(notify_err) = self
                    .notifier
                    .alert(&format!("Cycle {date} aborted"), &detail)
                    .await
                {
                    warn!(error = %notify_err, "abort alert failed");
                }
                Err(e)
            }
        }
    }

    /// Best-effort stage diagnosis for a failed run, from whatever row
    /// counts the cycle accumulated before dying.
    async fn diagnose(&self, date: NaiveDate) -> Option<FailureDiagnosis> {
        let cycle = self.store.find_or_create_cycle(date).await.ok()?;
        let counts = self.store.cycle_counts(cycle.id).await.ok()?;
        FailureDiagnosis::from_counts(&counts)
    }

    async fn run_stages(&self, date: NaiveDate, config: &CycleConfig) -> Result<CycleReport> {
        // A failed archive must not block ingestion, but it risks losing
        // rank metadata, so it is escalated loudly. The previous cycle's
        // rows stay in place; the clear step never ran.
        let archived = match Archiver::new(self.store).rotate_before(date).await {
            Ok(Rotation::Archived { counts, .. }) => Some(counts),
            Ok(Rotation::NoPrevious) => None,
            Err(e) => {
                error!(error = %e, "pre-cycle archival failed, previous cycle left in place");
                if let Err(notify_err) = self
                    .notifier
                    .alert(
                        &format!("Archival before cycle {date} failed"),
                        &format!("{e:#}"),
                    )
                    .await
                {
                    warn!(error = %notify_err, "archival failure alert failed");
                }
                None
            }
        };

        let cycle = self.store.find_or_create_cycle(date).await?;
        if !cycle.is_processing() {
            info!(cycle_id = %cycle.id, status = %cycle.status, "re-running a finished cycle");
        }
        info!(cycle_id = %cycle.id, date = %date, "cycle started");

        let mut report = CycleReport {
            cycle_id: cycle.id,
            date,
            archived,
            ..CycleReport::default()
        };

        let ingest = Ingestor::new(self.store, self.fetcher, self.image_host)
            .run(&cycle, config)
            .await?;
        report.feeds = ingest.feeds;
        report.items = ingest.items;

        // Re-runs pick up items bound to the cycle by earlier attempts,
        // along with any ratings and articles those attempts persisted,
        // so a crashed run never pays the provider twice for the same
        // work.
        let items = self.store.items_for_cycle(cycle.id).await?;
        let mut ratings: HashMap<Uuid, Rating> = self
            .store
            .ratings_for_cycle(cycle.id)
            .await?
            .into_iter()
            .map(|r| (r.source_item_id, r))
            .collect();

        let unscored: Vec<SourceItem> = items
            .iter()
            .filter(|item| !ratings.contains_key(&item.id))
            .cloned()
            .collect();
        let scoring = Scorer::new(self.provider, self.store)
            .score_items(config, cycle.id, &unscored)
            .await;
        report.scored = scoring.tally;
        ratings.extend(scoring.ratings);

        let excluded = DuplicateDetector::new(self.provider, self.store)
            .detect(cycle.id, &items)
            .await;
        report.duplicates_excluded = excluded.len();

        let existing_articles = self.store.articles_for_cycle(cycle.id).await?;
        let mut skip = excluded.clone();
        skip.extend(existing_articles.iter().map(|a| a.source_item_id));

        let generation = ArticleGenerator::new(self.provider, self.store)
            .generate(config, cycle.id, &items, &ratings, &skip)
            .await;
        report.generated = generation.tally;

        let mut candidates = existing_articles;
        candidates.extend(generation.articles);

        let selection = Selector::new(self.provider, self.store)
            .select(config, &cycle, &candidates, &ratings)
            .await?;
        report.activated = selection.activated.len();
        report.subject_line = selection.subject_line;

        self.store
            .update_cycle_status(cycle.id, CycleStatus::Draft)
            .await?;

        if report.activated == 0 {
            let counts = self.store.cycle_counts(cycle.id).await?;
            if let Some(diagnosis) = FailureDiagnosis::from_counts(&counts) {
                warn!(cycle_id = %cycle.id, "{}", diagnosis.describe());
                if let Err(e) = self
                    .notifier
                    .alert(
                        &format!("Cycle {date} produced no live articles"),
                        diagnosis.describe(),
                    )
                    .await
                {
                    warn!(error = %e, "empty-cycle alert failed");
                }
            }
        }

        info!(
            cycle_id = %cycle.id,
            activated = report.activated,
            "cycle complete"
        );
        Ok(report)
    }
}
