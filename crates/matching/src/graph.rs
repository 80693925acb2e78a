//! Step 1 — compatibility graph build (§4.5).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use swapgraph_core::{CompatibilityEdge, EdgeIntent, EdgeIntentType, EdgeOrigin, SwapIntent};

/// The compatibility graph over a fixed, sorted node order. Nodes are
/// indexed by position in `node_ids`, which is sorted ascending by intent
/// id — this is the order every downstream step (SCC, enumeration) relies
/// on for determinism.
#[derive(Debug, Clone)]
pub struct CompatibilityGraph {
    pub node_ids: Vec<String>,
    pub edges: Vec<CompatibilityEdge>,
    /// `node index -> sorted list of (target node index, edge index)`.
    pub adjacency: Vec<Vec<(usize, usize)>>,
}

impl CompatibilityGraph {
    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn index_of(&self, intent_id: &str) -> Option<usize> {
        self.node_ids.iter().position(|id| id == intent_id)
    }
}

/// Build the compatibility graph over `intents` (already filtered to those
/// active at `now`). `edge_intents` may include inactive/expired entries —
/// they are filtered here, and any edge whose endpoint is not among
/// `intents` is dropped (§4.5 step 1).
pub fn build_graph(intents: &[&SwapIntent], edge_intents: &[&EdgeIntent], now: DateTime<Utc>) -> CompatibilityGraph {
    let mut node_ids: Vec<String> = intents.iter().map(|i| i.id.clone()).collect();
    node_ids.sort();

    let index_of: HashMap<&str, usize> =
        node_ids.iter().enumerate().map(|(idx, id)| (id.as_str(), idx)).collect();
    let by_id: HashMap<&str, &SwapIntent> = intents.iter().map(|i| (i.id.as_str(), *i)).collect();

    // Explicit directives, keyed by (source, target), restricted to edges
    // active at `now` whose both endpoints are present nodes.
    let mut explicit: HashMap<(usize, usize), (EdgeIntentType, f64)> = HashMap::new();
    for e in edge_intents {
        if !e.is_active(now) {
            continue;
        }
        let (Some(&from), Some(&to)) =
            (index_of.get(e.source_intent_id.as_str()), index_of.get(e.target_intent_id.as_str()))
        else {
            continue;
        };
        let strength = e.strength.unwrap_or(0.0);
        // A `block` always wins over any prior `allow`/`prefer` seen for the
        // same ordered pair, and is never overridden by one seen later.
        match explicit.get(&(from, to)) {
            Some((EdgeIntentType::Block, _)) => {}
            _ => {
                explicit.insert((from, to), (e.intent_type, strength));
            }
        }
    }

    let n = node_ids.len();
    let mut edges = Vec::new();
    let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];

    for a_idx in 0..n {
        for b_idx in 0..n {
            if a_idx == b_idx {
                continue;
            }
            let a = by_id[node_ids[a_idx].as_str()];
            let b = by_id[node_ids[b_idx].as_str()];

            let derived = a.want_spec.is_satisfied_by_any(&b.offer) && a.value_band.contains(b.offer_value_usd());

            let directive = explicit.get(&(a_idx, b_idx));
            let (present, origin, prefer_strength) = match directive {
                Some((EdgeIntentType::Block, _)) => (false, EdgeOrigin::Derived, 0.0),
                Some((EdgeIntentType::Allow, _)) => {
                    (true, if derived { EdgeOrigin::Hybrid } else { EdgeOrigin::Explicit }, 0.0)
                }
                Some((EdgeIntentType::Prefer, strength)) => {
                    (true, if derived { EdgeOrigin::Hybrid } else { EdgeOrigin::Explicit }, *strength)
                }
                None => (derived, EdgeOrigin::Derived, 0.0),
            };

            if !present {
                continue;
            }

            let edge_index = edges.len();
            edges.push(CompatibilityEdge {
                from_intent_id: node_ids[a_idx].clone(),
                to_intent_id: node_ids[b_idx].clone(),
                origin,
                prefer_strength,
            });
            adjacency[a_idx].push((b_idx, edge_index));
        }
    }

    for list in adjacency.iter_mut() {
        list.sort_by_key(|(target, _)| *target);
    }

    CompatibilityGraph { node_ids, edges, adjacency }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{asset, edge_intent, intent};

    #[test]
    fn derived_edge_present_when_want_and_value_band_satisfied() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 50.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "x", 10.0, 200.0, now);
        let refs = vec![&a, &b];
        let g = build_graph(&refs, &[], now);
        assert_eq!(g.edge_count(), 2);
        let ai = g.index_of("intent_a").unwrap();
        let bi = g.index_of("intent_b").unwrap();
        assert!(g.adjacency[ai].iter().any(|(t, _)| *t == bi));
        assert!(g.adjacency[bi].iter().any(|(t, _)| *t == ai));
    }

    #[test]
    fn value_band_outside_range_suppresses_edge() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 50.0)], "steam", "y", 1.0, 5.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "x", 1.0, 5.0, now);
        let refs = vec![&a, &b];
        let g = build_graph(&refs, &[], now);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn block_edge_suppresses_derived_edge() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 50.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "x", 10.0, 200.0, now);
        let block = edge_intent("intent_a", "intent_b", EdgeIntentType::Block, None);
        let refs = vec![&a, &b];
        let g = build_graph(&refs, &[&block], now);
        // a->b derived edge is blocked; b->a remains.
        assert_eq!(g.edge_count(), 1);
        let bi = g.index_of("intent_b").unwrap();
        let ai = g.index_of("intent_a").unwrap();
        assert!(g.adjacency[bi].iter().any(|(t, _)| *t == ai));
        assert!(!g.adjacency[ai].iter().any(|(t, _)| *t == bi));
    }
}
