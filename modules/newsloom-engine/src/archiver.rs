//! Pre-cycle rotation: before a new cycle starts, copy the previous
//! cycle's articles, items, and ratings into the archive tables, then
//! clear the live tables. Clearing only happens after every copy
//! succeeded, so a failed archive never loses data.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::info;

use newsloom_store::{ArchiveCounts, Cycle};

use crate::traits::PipelineStore;

const ROTATION_REASON: &str = "cycle_rotation";

#[derive(Debug)]
pub enum Rotation {
    Archived {
        cycle: Cycle,
        counts: ArchiveCounts,
    },
    NoPrevious,
}

pub struct Archiver<'a> {
    store: &'a dyn PipelineStore,
}

impl<'a> Archiver<'a> {
    pub fn new(store: &'a dyn PipelineStore) -> Self {
        Self { store }
    }

    /// Archive and clear the most recent cycle dated strictly before
    /// `date`. The first run, with no previous cycle, is a no-op.
    pub async fn rotate_before(&self, date: NaiveDate) -> Result<Rotation> {
        let previous = match self.store.previous_cycle(date).await? {
            Some(cycle) => cycle,
            None => {
                info!("no previous cycle to archive");
                return Ok(Rotation::NoPrevious);
            }
        };

        let live = self.store.cycle_counts(previous.id).await?;

        let articles = self
            .store
            .archive_articles(&previous, ROTATION_REASON)
            .await
            .with_context(|| format!("archiving articles for cycle {}", previous.date))?;
        let (items, ratings) = self
            .store
            .archive_items_and_ratings(&previous, ROTATION_REASON)
            .await
            .with_context(|| format!("archiving items for cycle {}", previous.date))?;

        // The archive tables must hold at least the rows the live
        // tables do before anything is deleted. Ratings are not checked
        // here: a missing archived_ratings table is tolerated upstream.
        let banked = self.store.archived_counts(previous.id).await?;
        if banked.articles < live.articles as u64 || banked.items < live.items as u64 {
            bail!(
                "archive for cycle {} is short ({}/{} articles, {}/{} items), refusing to clear",
                previous.date,
                banked.articles,
                live.articles,
                banked.items,
                live.items,
            );
        }

        self.store
            .clear_cycle(previous.id)
            .await
            .with_context(|| format!("clearing cycle {}", previous.date))?;

        let counts = ArchiveCounts {
            articles,
            items,
            ratings,
        };
        info!(
            cycle_date = %previous.date,
            articles = counts.articles,
            items = counts.items,
            ratings = counts.ratings,
            "previous cycle archived and cleared"
        );

        Ok(Rotation::Archived {
            cycle: previous,
            counts,
        })
    }
}
