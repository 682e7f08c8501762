//! The newsloom pipeline: feed ingestion, rubric scoring, duplicate
//! detection, article generation with a fact-check gate, top-N
//! selection, and pre-cycle archival, sequenced by the orchestrator.

pub mod archiver;
pub mod batch;
pub mod dedup;
pub mod generator;
pub mod ingest;
pub mod notify;
pub mod orchestrator;
pub mod prompts;
pub mod scorer;
pub mod selector;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use orchestrator::{CycleReport, FailureDiagnosis, Orchestrator};
pub use traits::{FeedFetcher, ImageHost, PipelineStore};
