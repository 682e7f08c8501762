pub mod config;
pub mod cycle_config;
pub mod outcome;

pub use config::Config;
pub use cycle_config::{Criterion, CycleConfig};
pub use outcome::{Outcome, StageTally};
