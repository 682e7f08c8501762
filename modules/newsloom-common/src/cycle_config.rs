use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Upper bound on enabled scoring criteria.
pub const MAX_CRITERIA: usize = 5;

/// One scoring criterion: display name, weight, and a short description
/// the scorer folds into its prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub guidance: String,
}

fn default_weight() -> f64 {
    1.0
}

/// Per-cycle pipeline tunables, loaded once from the settings table at
/// the start of a run and passed down through the stages.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// 1 to [`MAX_CRITERIA`] enabled scoring criteria.
    pub criteria: Vec<Criterion>,
    /// Minimum fact-check score for an article to be activatable.
    pub fact_check_threshold: f64,
    /// Max articles marked active per cycle.
    pub max_active_articles: usize,
    /// Items evaluated concurrently per batch.
    pub batch_size: usize,
    /// Pause between batches, bounding request rate to the AI provider.
    pub batch_delay_ms: u64,
    /// Only ingest feed items published within this trailing window.
    pub ingest_window_hours: i64,
    /// Authors whose items never get their images re-hosted.
    pub image_author_blocklist: Vec<String>,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            criteria: vec![
                Criterion {
                    name: "relevance".to_string(),
                    weight: 1.0,
                    guidance: "How relevant is this story to the newsletter audience?"
                        .to_string(),
                },
                Criterion {
                    name: "impact".to_string(),
                    weight: 1.0,
                    guidance: "How significant are the consequences of this story?".to_string(),
                },
                Criterion {
                    name: "novelty".to_string(),
                    weight: 1.0,
                    guidance: "How new or surprising is this story?".to_string(),
                },
            ],
            fact_check_threshold: 15.0,
            max_active_articles: 3,
            batch_size: 3,
            batch_delay_ms: 2_000,
            ingest_window_hours: 24,
            image_author_blocklist: Vec::new(),
        }
    }
}

impl CycleConfig {
    /// Build a cycle config from raw settings rows. Unknown or malformed
    /// values fall back to defaults with a warning; a missing or empty
    /// criteria list falls back to the default rubric, and an oversized
    /// one is truncated to [`MAX_CRITERIA`].
    pub fn from_settings(settings: &HashMap<String, Value>) -> Self {
        let defaults = Self::default();

        let mut criteria = settings
            .get("scoring_criteria")
            .and_then(|v| serde_json::from_value::<Vec<Criterion>>(v.clone()).ok())
            .unwrap_or_else(|| {
                if settings.contains_key("scoring_criteria") {
                    warn!("scoring_criteria setting is malformed, using default rubric");
                }
                defaults.criteria.clone()
            });
        if criteria.is_empty() {
            warn!("scoring_criteria setting is empty, using default rubric");
            criteria = defaults.criteria.clone();
        }
        if criteria.len() > MAX_CRITERIA {
            warn!(
                configured = criteria.len(),
                max = MAX_CRITERIA,
                "too many scoring criteria, truncating"
            );
            criteria.truncate(MAX_CRITERIA);
        }

        Self {
            criteria,
            fact_check_threshold: f64_setting(
                settings,
                "fact_check_threshold",
                defaults.fact_check_threshold,
            ),
            max_active_articles: usize_setting(
                settings,
                "max_active_articles",
                defaults.max_active_articles,
            ),
            batch_size: usize_setting(settings, "batch_size", defaults.batch_size).max(1),
            batch_delay_ms: f64_setting(
                settings,
                "batch_delay_ms",
                defaults.batch_delay_ms as f64,
            ) as u64,
            ingest_window_hours: f64_setting(
                settings,
                "ingest_window_hours",
                defaults.ingest_window_hours as f64,
            ) as i64,
            image_author_blocklist: settings
                .get("image_author_blocklist")
                .and_then(|v| serde_json::from_value::<Vec<String>>(v.clone()).ok())
                .unwrap_or_default(),
        }
    }
}

fn f64_setting(settings: &HashMap<String, Value>, key: &str, default: f64) -> f64 {
    match settings.get(key) {
        None => default,
        Some(value) => match value.as_f64() {
            Some(n) => n,
            None => {
                warn!(key, "setting is not numeric, using default");
                default
            }
        },
    }
}

fn usize_setting(settings: &HashMap<String, Value>, key: &str, default: usize) -> usize {
    match settings.get(key) {
        None => default,
        Some(value) => match value.as_u64() {
            Some(n) => n as usize,
            None => {
                warn!(key, "setting is not a non-negative integer, using default");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_when_settings_empty() {
        let config = CycleConfig::from_settings(&HashMap::new());
        assert_eq!(config.criteria.len(), 3);
        assert_eq!(config.fact_check_threshold, 15.0);
        assert_eq!(config.max_active_articles, 3);
        assert_eq!(config.batch_size, 3);
    }

    #[test]
    fn reads_configured_values() {
        let mut settings = HashMap::new();
        settings.insert(
            "scoring_criteria".to_string(),
            json!([{"name": "depth", "weight": 2.5, "guidance": "How deep?"}]),
        );
        settings.insert("fact_check_threshold".to_string(), json!(12));
        settings.insert("max_active_articles".to_string(), json!(5));

        let config = CycleConfig::from_settings(&settings);
        assert_eq!(config.criteria.len(), 1);
        assert_eq!(config.criteria[0].name, "depth");
        assert_eq!(config.criteria[0].weight, 2.5);
        assert_eq!(config.fact_check_threshold, 12.0);
        assert_eq!(config.max_active_articles, 5);
    }

    #[test]
    fn criterion_weight_defaults_to_one() {
        let mut settings = HashMap::new();
        settings.insert("scoring_criteria".to_string(), json!([{"name": "clarity"}]));
        let config = CycleConfig::from_settings(&settings);
        assert_eq!(config.criteria[0].weight, 1.0);
    }

    #[test]
    fn oversized_rubric_is_truncated() {
        let criteria: Vec<Value> = (0..8).map(|i| json!({"name": format!("c{i}")})).collect();
        let mut settings = HashMap::new();
        settings.insert("scoring_criteria".to_string(), json!(criteria));
        let config = CycleConfig::from_settings(&settings);
        assert_eq!(config.criteria.len(), MAX_CRITERIA);
    }

    #[test]
    fn empty_rubric_falls_back_to_default() {
        let mut settings = HashMap::new();
        settings.insert("scoring_criteria".to_string(), json!([]));
        let config = CycleConfig::from_settings(&settings);
        assert_eq!(config.criteria.len(), 3);
    }

    #[test]
    fn malformed_value_falls_back() {
        let mut settings = HashMap::new();
        settings.insert("fact_check_threshold".to_string(), json!("high"));
        let config = CycleConfig::from_settings(&settings);
        assert_eq!(config.fact_check_threshold, 15.0);
    }
}
