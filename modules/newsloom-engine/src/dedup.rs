//! Cross-item duplicate detection: one AI call per cycle over all item
//! summaries. Best-effort — any failure skips detection entirely and
//! every item is treated as unique.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use ai_client::{parse_completion, CompletionProvider, CompletionRequest};
use newsloom_store::{NewDuplicateGroup, SourceItem};

use crate::prompts;
use crate::traits::PipelineStore;

#[derive(Debug, Deserialize)]
struct ProposedGroup {
    primary: usize,
    #[serde(default)]
    duplicates: Vec<usize>,
    #[serde(default)]
    topic: String,
}

#[derive(Debug, Deserialize)]
struct DuplicateReport {
    #[serde(default)]
    groups: Vec<ProposedGroup>,
}

pub struct DuplicateDetector<'a> {
    provider: &'a dyn CompletionProvider,
    store: &'a dyn PipelineStore,
}

impl<'a> DuplicateDetector<'a> {
    pub fn new(provider: &'a dyn CompletionProvider, store: &'a dyn PipelineStore) -> Self {
        Self { provider, store }
    }

    /// Detect duplicate groups among the cycle's items. Returns the set
    /// of source item ids excluded from generation/selection (every
    /// non-primary group member). The primary stays eligible.
    pub async fn detect(&self, cycle_id: Uuid, items: &[SourceItem]) -> HashSet<Uuid> {
        if items.len() < 2 {
            return HashSet::new();
        }

        let request = CompletionRequest::new(prompts::dedup_prompt(items))
            .system(prompts::DEDUP_SYSTEM_PROMPT)
            .max_tokens(2048)
            .temperature(0.0);

        let raw = match self.provider.complete(request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "duplicate detection call failed, treating all items as unique");
                return HashSet::new();
            }
        };

        let report: DuplicateReport = match parse_completion(&raw) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "duplicate detection response unparseable, treating all items as unique");
                return HashSet::new();
            }
        };

        let groups = validate_groups(report, items.len());
        let mut excluded = HashSet::new();

        for (primary_idx, member_idxs, topic) in groups {
            let members: Vec<Uuid> = member_idxs.iter().map(|&i| items[i].id).collect();
            excluded.extend(members.iter().copied());

            let group = NewDuplicateGroup {
                cycle_id,
                primary_item_id: items[primary_idx].id,
                topic_signature: topic,
                member_item_ids: members,
            };
            if let Err(e) = self.store.insert_duplicate_group(group).await {
                warn!(error = %e, "failed to persist duplicate group");
            }
        }

        info!(excluded = excluded.len(), "duplicate detection complete");
        excluded
    }
}

/// Validate the provider's 1-based groups against the item list: drop
/// out-of-range indices, self-references, items claimed by an earlier
/// group, and groups left with no members. Returns 0-based
/// `(primary, members, topic)` triples.
fn validate_groups(report: DuplicateReport, item_count: usize) -> Vec<(usize, Vec<usize>, String)> {
    let mut claimed: HashSet<usize> = HashSet::new();
    let mut groups = Vec::new();

    for proposed in report.groups {
        if proposed.primary == 0 || proposed.primary > item_count {
            warn!(primary = proposed.primary, "duplicate group primary out of range, dropping group");
            continue;
        }
        let primary = proposed.primary - 1;
        if claimed.contains(&primary) {
            continue;
        }

        let mut members = Vec::new();
        for idx in proposed.duplicates {
            if idx == 0 || idx > item_count {
                warn!(index = idx, "duplicate index out of range, dropping member");
                continue;
            }
            let member = idx - 1;
            if member == primary || claimed.contains(&member) || members.contains(&member) {
                continue;
            }
            members.push(member);
        }

        if members.is_empty() {
            continue;
        }

        claimed.insert(primary);
        claimed.extend(members.iter().copied());
        groups.push((primary, members, proposed.topic));
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{source_item, today_cycle, FailingProvider, MockProvider, MockStore};

    fn proposed(primary: usize, duplicates: Vec<usize>) -> ProposedGroup {
        ProposedGroup {
            primary,
            duplicates,
            topic: "topic".to_string(),
        }
    }

    #[test]
    fn validate_drops_out_of_range_and_self_references() {
        let report = DuplicateReport {
            groups: vec![proposed(2, vec![2, 4, 9]), proposed(0, vec![1])],
        };
        let groups = validate_groups(report, 5);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, 1);
        assert_eq!(groups[0].1, vec![3]);
    }

    #[test]
    fn validate_drops_groups_claimed_twice() {
        let report = DuplicateReport {
            groups: vec![proposed(1, vec![2]), proposed(3, vec![2, 4])],
        };
        let groups = validate_groups(report, 5);
        assert_eq!(groups.len(), 2);
        // Item 2 already belongs to the first group.
        assert_eq!(groups[1].1, vec![3]);
    }

    #[test]
    fn validate_drops_empty_groups() {
        let report = DuplicateReport {
            groups: vec![proposed(1, vec![])],
        };
        assert!(validate_groups(report, 3).is_empty());
    }

    #[tokio::test]
    async fn detect_excludes_members_not_primary() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;
        let mut items = Vec::new();
        for title in ["One", "Two", "Three", "Four", "Five"] {
            items.push(source_item(&store, &cycle, title).await);
        }

        let provider = MockProvider::new().with_default(
            r#"{"groups": [{"primary": 2, "duplicates": [4], "topic": "same event"}]}"#,
        );

        let excluded = DuplicateDetector::new(&provider, &store)
            .detect(cycle.id, &items)
            .await;

        assert_eq!(excluded.len(), 1);
        assert!(excluded.contains(&items[3].id));
        assert!(!excluded.contains(&items[1].id));
    }

    #[tokio::test]
    async fn provider_failure_skips_detection() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;
        let a = source_item(&store, &cycle, "A").await;
        let b = source_item(&store, &cycle, "B").await;

        let provider = FailingProvider;
        let excluded = DuplicateDetector::new(&provider, &store)
            .detect(cycle.id, &[a, b])
            .await;

        assert!(excluded.is_empty());
    }

    #[tokio::test]
    async fn unparseable_response_skips_detection() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;
        let a = source_item(&store, &cycle, "A").await;
        let b = source_item(&store, &cycle, "B").await;

        let provider = MockProvider::new().with_default("no json here");
        let excluded = DuplicateDetector::new(&provider, &store)
            .detect(cycle.id, &[a, b])
            .await;

        assert!(excluded.is_empty());
    }

    #[tokio::test]
    async fn single_item_never_calls_provider() {
        let store = MockStore::new();
        let cycle = today_cycle(&store).await;
        let only = source_item(&store, &cycle, "Only").await;

        let provider = MockProvider::new();
        let excluded = DuplicateDetector::new(&provider, &store)
            .detect(cycle.id, &[only])
            .await;

        assert!(excluded.is_empty());
        assert_eq!(provider.call_count(), 0);
    }
}
