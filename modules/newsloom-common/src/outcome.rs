use std::fmt;

/// Result of one unit of work (one feed, one item, one criterion).
///
/// Best-effort stages record an `Outcome` per unit instead of scattering
/// ad hoc error swallowing; the orchestrator aggregates them into the
/// final notification payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Skipped(String),
    Failed(String),
}

impl Outcome {
    pub fn failed(err: impl fmt::Display) -> Self {
        Self::Failed(err.to_string())
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }
}

/// Per-stage aggregation of unit outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageTally {
    pub succeeded: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl StageTally {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Success => self.succeeded += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.succeeded + self.skipped + self.failed
    }
}

impl fmt::Display for StageTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ok, {} skipped, {} failed",
            self.succeeded, self.skipped, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_each_variant() {
        let mut tally = StageTally::default();
        tally.record(&Outcome::Success);
        tally.record(&Outcome::Success);
        tally.record(&Outcome::skipped("duplicate"));
        tally.record(&Outcome::failed("bad score"));

        assert_eq!(tally.succeeded, 2);
        assert_eq!(tally.skipped, 1);
        assert_eq!(tally.failed, 1);
        assert_eq!(tally.total(), 4);
        assert_eq!(tally.to_string(), "2 ok, 1 skipped, 1 failed");
    }
}
