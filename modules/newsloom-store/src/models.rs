use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// Cycle lifecycle. `processing` while feeds/scoring/generation run;
/// `draft` once selection completed. States beyond `draft` are owned by
/// downstream collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Processing,
    Draft,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Processing => "processing",
            CycleStatus::Draft => "draft",
        }
    }
}

impl std::fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dated run of the ingestion-to-selection pipeline.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Cycle {
    pub id: Uuid,
    pub date: NaiveDate,
    pub status: String,
    pub subject_line: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cycle {
    pub fn is_processing(&self) -> bool {
        self.status == CycleStatus::Processing.as_str()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub active: bool,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub error_count: i32,
    pub created_at: DateTime<Utc>,
}

/// One normalized feed entry bound to a cycle.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceItem {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub url: String,
    pub image_url: Option<String>,
    pub cycle_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSourceItem {
    pub feed_id: Uuid,
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
    pub url: String,
    pub image_url: Option<String>,
    pub cycle_id: Uuid,
}

/// One criterion's verdict inside a rating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriterionScore {
    pub name: String,
    pub score: f64,
    pub weight: f64,
    pub reason: String,
}

/// The scoring engine's weighted multi-criteria result for one item.
/// One-to-one with `SourceItem`; never mutated after creation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub source_item_id: Uuid,
    pub cycle_id: Uuid,
    pub criteria: Json<Vec<CriterionScore>>,
    pub total_score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRating {
    pub source_item_id: Uuid,
    pub cycle_id: Uuid,
    pub criteria: Vec<CriterionScore>,
    pub total_score: f64,
}

/// Generated, fact-checked candidate copy for one source item.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Article {
    pub id: Uuid,
    pub source_item_id: Uuid,
    pub cycle_id: Uuid,
    pub headline: String,
    pub body: String,
    pub rank: Option<i32>,
    pub active: bool,
    pub fact_check_score: f64,
    pub fact_check_details: serde_json::Value,
    pub word_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub source_item_id: Uuid,
    pub cycle_id: Uuid,
    pub headline: String,
    pub body: String,
    pub fact_check_score: f64,
    pub fact_check_details: serde_json::Value,
    pub word_count: i32,
}

/// One duplicate group: the primary item stays eligible, the listed
/// members are excluded from generation and selection.
#[derive(Debug, Clone)]
pub struct NewDuplicateGroup {
    pub cycle_id: Uuid,
    pub primary_item_id: Uuid,
    pub topic_signature: String,
    pub member_item_ids: Vec<Uuid>,
}

/// Live row counts for one cycle, used for failure diagnosis and the
/// archive round-trip check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleCounts {
    pub items: i64,
    pub ratings: i64,
    pub articles: i64,
    pub active_articles: i64,
}

/// Rows copied by one archival pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveCounts {
    pub articles: u64,
    pub items: u64,
    pub ratings: u64,
}
