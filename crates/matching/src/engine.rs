//! Top-level orchestration of a single matching run (§4.5).

use std::collections::HashMap;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use swapgraph_core::{CompatibilityEdge, EdgeIntent, SwapIntent, CycleProposal};

use crate::cycles::{enumerate_cycles, EnumerationBounds};
use crate::error::{MatchingError, Result};
use crate::graph::build_graph;
use crate::scc::strongly_connected_components;
use crate::selection::{build_proposal, select_disjoint, MatchingConfig};
use crate::stats::MatchStats;

pub struct MatchingInput<'a> {
    /// Active intents the run considers — already filtered by `is_active`.
    pub intents: Vec<&'a SwapIntent>,
    /// All edge-intents known to the caller; inactive/expired ones are
    /// filtered inside graph construction.
    pub edge_intents: Vec<&'a EdgeIntent>,
    pub now: DateTime<Utc>,
    pub min_cycle_length: usize,
    pub max_cycle_length: usize,
    pub max_enumerated_cycles: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub max_proposals: Option<usize>,
    pub config: MatchingConfig,
}

impl<'a> MatchingInput<'a> {
    pub fn new(intents: Vec<&'a SwapIntent>, edge_intents: Vec<&'a EdgeIntent>, now: DateTime<Utc>) -> Self {
        Self {
            intents,
            edge_intents,
            now,
            min_cycle_length: 2,
            max_cycle_length: 3,
            max_enumerated_cycles: None,
            timeout_ms: None,
            max_proposals: None,
            config: MatchingConfig::default(),
        }
    }
}

pub struct MatchRunResult {
    pub proposals: Vec<CycleProposal>,
    pub stats: MatchStats,
    /// Ordered canonical cycle keys considered during enumeration (§8 I4).
    pub trace: Vec<Vec<String>>,
}

/// Run the full pipeline: graph build, SCC decomposition, bounded cycle
/// enumeration, proposal materialization, and disjoint selection.
pub fn run_matching(input: &MatchingInput) -> Result<MatchRunResult> {
    if input.min_cycle_length < 2 {
        return Err(MatchingError::CycleLengthTooShort(input.min_cycle_length));
    }
    if input.min_cycle_length > input.max_cycle_length {
        return Err(MatchingError::InvalidBounds { min: input.min_cycle_length, max: input.max_cycle_length });
    }

    let graph = build_graph(&input.intents, &input.edge_intents, input.now);
    let sccs = strongly_connected_components(&graph);

    let bounds = EnumerationBounds {
        min_len: input.min_cycle_length,
        max_len: input.max_cycle_length,
        max_enumerated_cycles: input.max_enumerated_cycles,
        timeout: input.timeout_ms.map(StdDuration::from_millis),
    };
    let enumeration = enumerate_cycles(&graph, &sccs, &bounds);

    let intents_by_id: HashMap<&str, &SwapIntent> = input.intents.iter().map(|i| (i.id.as_str(), *i)).collect();
    let edges_by_pair: HashMap<(&str, &str), &CompatibilityEdge> = graph
        .edges
        .iter()
        .map(|e| ((e.from_intent_id.as_str(), e.to_intent_id.as_str()), e))
        .collect();

    let candidates: Vec<CycleProposal> = enumeration
        .cycles
        .iter()
        .map(|cycle| build_proposal(cycle, &intents_by_id, &edges_by_pair, input.now, &input.config))
        .collect();
    let candidate_proposals = candidates.len();

    let selected = select_disjoint(candidates, input.max_proposals);

    let stats = MatchStats {
        candidate_cycles: enumeration.cycles.len(),
        candidate_proposals,
        selected_proposals: selected.len(),
        intents_active: input.intents.len(),
        edges: graph.edge_count(),
        cycle_enumeration_limited: enumeration.limited,
        cycle_enumeration_timed_out: enumeration.timed_out,
    };

    Ok(MatchRunResult { proposals: selected, stats, trace: enumeration.trace })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{asset, edge_intent, intent};
    use swapgraph_core::EdgeIntentType;

    #[test]
    fn two_party_happy_path_selects_exactly_one_proposal() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 100.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 101.0)], "steam", "x", 80.0, 120.0, now);
        let refs = vec![&a, &b];
        let input = MatchingInput::new(refs, vec![], now);
        let result = run_matching(&input).unwrap();
        assert_eq!(result.proposals.len(), 1);
        assert_eq!(result.stats.selected_proposals, 1);
        let mut ids = result.proposals[0].participant_intent_ids();
        ids.sort();
        assert_eq!(ids, vec!["intent_a", "intent_b"]);
    }

    #[test]
    fn determinism_under_intent_insertion_order() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 100.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "z", 80.0, 120.0, now);
        let c = intent("intent_c", vec![asset("steam", "z", 100.0)], "steam", "x", 80.0, 120.0, now);

        let order1 = MatchingInput::new(vec![&a, &b, &c], vec![], now);
        let order2 = MatchingInput::new(vec![&c, &a, &b], vec![], now);

        let r1 = run_matching(&order1).unwrap();
        let r2 = run_matching(&order2).unwrap();

        assert_eq!(r1.stats.candidate_cycles, r2.stats.candidate_cycles);
        assert_eq!(r1.stats.selected_proposals, r2.stats.selected_proposals);
        assert_eq!(r1.trace, r2.trace);
        assert_eq!(
            r1.proposals.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
            r2.proposals.iter().map(|p| p.id.clone()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn prefer_edge_raises_confidence_over_all_derived_control() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 100.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "z", 80.0, 120.0, now);
        let c = intent("intent_c", vec![asset("steam", "z", 100.0)], "steam", "x", 80.0, 120.0, now);
        let refs = vec![&a, &b, &c];

        let control = MatchingInput::new(refs.clone(), vec![], now);
        let control_result = run_matching(&control).unwrap();

        let prefer = edge_intent("intent_a", "intent_b", EdgeIntentType::Prefer, Some(0.5));
        let with_prefer = MatchingInput::new(refs, vec![&prefer], now);
        let prefer_result = run_matching(&with_prefer).unwrap();

        assert_eq!(control_result.proposals.len(), 1);
        assert_eq!(prefer_result.proposals.len(), 1);
        assert!(prefer_result.proposals[0].confidence_score > control_result.proposals[0].confidence_score);
    }

    #[test]
    fn max_enumerated_cycles_zero_yields_no_proposals_and_limited_flag() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 100.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "x", 80.0, 120.0, now);
        let mut input = MatchingInput::new(vec![&a, &b], vec![], now);
        input.max_enumerated_cycles = Some(0);
        let result = run_matching(&input).unwrap();
        assert!(result.proposals.is_empty());
        assert!(result.stats.cycle_enumeration_limited);
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        let now = Utc::now();
        let mut input = MatchingInput::new(vec![], vec![], now);
        input.min_cycle_length = 4;
        input.max_cycle_length = 3;
        assert!(run_matching(&input).is_err());
    }
}
