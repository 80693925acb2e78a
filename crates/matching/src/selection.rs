//! Step 5 — cycle materialization, scoring, and disjoint selection (§4.5).

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use swapgraph_core::{
    canonical::canonical_hash, CompatibilityEdge, EdgeOrigin, ParticipantEntry, SwapIntent, CycleProposal,
};

/// Tunable constants the specification leaves open (§9 open questions):
/// `confidence_score` is contractually bounded `[0,1]`, deterministic, and
/// monotone in `prefer_strength`, but its exact formula is unspecified
/// beyond that. `base_compatibility` and `value_delta_fraction` are the
/// tuning knobs that contract allows.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Per-edge confidence before `prefer_strength` is applied.
    pub base_compatibility: f64,
    /// `value_delta` is included in `explainability` when the cycle's
    /// `value_spread` is within this fraction of the mean give-value.
    pub value_delta_fraction: f64,
    /// How long a materialized proposal remains acceptable.
    pub proposal_ttl: Duration,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { base_compatibility: 0.8, value_delta_fraction: 0.1, proposal_ttl: Duration::hours(1) }
    }
}

/// Materialize one candidate proposal from a canonical cycle (a sequence of
/// intent ids, already rotated so the smallest leads).
pub fn build_proposal(
    canonical_ids: &[String],
    intents_by_id: &HashMap<&str, &SwapIntent>,
    edges_by_pair: &HashMap<(&str, &str), &CompatibilityEdge>,
    now: DateTime<Utc>,
    config: &MatchingConfig,
) -> CycleProposal {
    let k = canonical_ids.len();

    // give[i] = the portion of participant i's offer satisfying participant
    // (i-1)'s want (§3, §4.5 step 5).
    let gives: Vec<_> = (0..k)
        .map(|i| {
            let this_intent = intents_by_id[canonical_ids[i].as_str()];
            let prev_intent = intents_by_id[canonical_ids[(i + k - 1) % k].as_str()];
            prev_intent.want_spec.matching_assets(&this_intent.offer).into_iter().cloned().collect::<Vec<_>>()
        })
        .collect();

    let participants: Vec<ParticipantEntry> = (0..k)
        .map(|i| {
            let intent = intents_by_id[canonical_ids[i].as_str()];
            ParticipantEntry {
                intent_id: intent.id.clone(),
                actor: intent.owner.clone(),
                give: gives[i].clone(),
                get: gives[(i + k - 1) % k].clone(),
            }
        })
        .collect();

    let cycle_edges: Vec<&CompatibilityEdge> = (0..k)
        .map(|i| {
            let from = canonical_ids[i].as_str();
            let to = canonical_ids[(i + 1) % k].as_str();
            *edges_by_pair.get(&(from, to)).expect("a cycle edge must exist in the compatibility graph")
        })
        .collect();

    let confidence_score = cycle_edges
        .iter()
        .map(|e| (config.base_compatibility * (1.0 + e.prefer_strength)).clamp(0.0, 1.0))
        .product::<f64>()
        .clamp(0.0, 1.0);

    let give_values: Vec<f64> = participants.iter().map(|p| p.give_value_usd()).collect();
    let max_give = give_values.iter().cloned().fold(f64::MIN, f64::max);
    let min_give = give_values.iter().cloned().fold(f64::MAX, f64::min);
    let value_spread = max_give - min_give;
    let mean_value = give_values.iter().sum::<f64>() / give_values.len() as f64;

    let mut explainability = vec!["confidence".to_string()];
    if mean_value > 0.0 && value_spread <= config.value_delta_fraction * mean_value {
        explainability.push("value_delta".to_string());
    }
    if cycle_edges.iter().all(|e| e.origin == EdgeOrigin::Derived) {
        explainability.push("constraint_fit".to_string());
    }

    let id_hash = canonical_hash(canonical_ids).expect("a vec of strings always canonicalizes");

    CycleProposal {
        id: format!("proposal_{}", id_hash.short_hex(12)),
        participants,
        confidence_score,
        value_spread,
        explainability,
        expires_at: now + config.proposal_ttl,
    }
}

/// Greedy disjoint-by-intent selection (§4.5 step 5): candidates are first
/// sorted by `(higher confidence, lower value_spread, lower cycle length,
/// lex canonical key)`; a candidate is kept iff none of its participant
/// intent ids was already claimed by an earlier-kept candidate.
pub fn select_disjoint(mut candidates: Vec<CycleProposal>, max_proposals: Option<usize>) -> Vec<CycleProposal> {
    candidates.sort_by(|a, b| {
        b.confidence_score
            .partial_cmp(&a.confidence_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.value_spread.partial_cmp(&b.value_spread).unwrap_or(Ordering::Equal))
            .then_with(|| a.participants.len().cmp(&b.participants.len()))
            .then_with(|| a.participant_intent_ids().cmp(&b.participant_intent_ids()))
    });

    let mut claimed: HashSet<String> = HashSet::new();
    let mut selected = Vec::new();

    for candidate in candidates {
        if let Some(cap) = max_proposals {
            if selected.len() >= cap {
                break;
            }
        }
        let ids = candidate.participant_intent_ids();
        if ids.iter().any(|id| claimed.contains(*id)) {
            continue;
        }
        for id in ids {
            claimed.insert(id.to_string());
        }
        selected.push(candidate);
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::test_support::{asset, edge_intent, intent};
    use swapgraph_core::EdgeIntentType;

    fn edges_map<'a>(edges: &'a [CompatibilityEdge]) -> HashMap<(&'a str, &'a str), &'a CompatibilityEdge> {
        edges.iter().map(|e| ((e.from_intent_id.as_str(), e.to_intent_id.as_str()), e)).collect()
    }

    #[test]
    fn two_party_cycle_give_get_mirror_each_other() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 100.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "x", 80.0, 120.0, now);
        let refs = vec![&a, &b];
        let g = build_graph(&refs, &[], now);
        let by_id: HashMap<&str, &SwapIntent> = refs.iter().map(|i| (i.id.as_str(), *i)).collect();
        let edges_by_pair = edges_map(&g.edges);
        let canonical = vec!["intent_a".to_string(), "intent_b".to_string()];
        let proposal = build_proposal(&canonical, &by_id, &edges_by_pair, now, &MatchingConfig::default());
        assert_eq!(proposal.participants[0].give[0].asset_id, "y");
        assert_eq!(proposal.participants[1].get, proposal.participants[0].give);
        assert!(proposal.explainability.contains(&"confidence".to_string()));
        assert!(proposal.explainability.contains(&"constraint_fit".to_string()));
    }

    #[test]
    fn prefer_strength_strictly_increases_confidence() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 100.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "x", 80.0, 120.0, now);
        let refs = vec![&a, &b];
        let by_id: HashMap<&str, &SwapIntent> = refs.iter().map(|i| (i.id.as_str(), *i)).collect();
        let canonical = vec!["intent_a".to_string(), "intent_b".to_string()];

        let g_plain = build_graph(&refs, &[], now);
        let plain = build_proposal(&canonical, &by_id, &edges_map(&g_plain.edges), now, &MatchingConfig::default());

        let prefer = edge_intent("intent_a", "intent_b", EdgeIntentType::Prefer, Some(0.5));
        let g_preferred = build_graph(&refs, &[&prefer], now);
        let preferred =
            build_proposal(&canonical, &by_id, &edges_map(&g_preferred.edges), now, &MatchingConfig::default());

        assert!(preferred.confidence_score > plain.confidence_score);
    }

    #[test]
    fn selection_is_disjoint_by_intent_id() {
        let p1 = dummy_proposal("x", vec!["intent_a", "intent_b"], 0.9, 1.0);
        let p2 = dummy_proposal("y", vec!["intent_b", "intent_c"], 0.95, 0.5);
        let selected = select_disjoint(vec![p1, p2], None);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "proposal_y");
    }

    fn dummy_proposal(suffix: &str, ids: Vec<&str>, confidence: f64, value_spread: f64) -> CycleProposal {
        use swapgraph_core::{Actor, ActorType};
        CycleProposal {
            id: format!("proposal_{suffix}"),
            participants: ids
                .into_iter()
                .map(|id| ParticipantEntry {
                    intent_id: id.to_string(),
                    actor: Actor::new(ActorType::User, format!("owner_{id}")),
                    give: vec![],
                    get: vec![],
                })
                .collect(),
            confidence_score: confidence,
            value_spread,
            explainability: vec!["confidence".to_string()],
            expires_at: Utc::now() + Duration::hours(1),
        }
    }
}
