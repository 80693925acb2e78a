//! Step 3 — bounded simple-cycle enumeration, and step 4 — termination and
//! diagnostics (§4.5).
//!
//! Enumeration runs over an explicit path stack rather than recursion: a
//! cycle of length `max_len` would otherwise recurse `max_len` deep per
//! start node, and Rust gives no tail-call guarantee (§9).

use std::collections::HashSet;
use std::time::{Duration, Instant};

use swapgraph_core::rotate_to_smallest;

use crate::graph::CompatibilityGraph;

pub struct EnumerationBounds {
    pub min_len: usize,
    pub max_len: usize,
    pub max_enumerated_cycles: Option<usize>,
    pub timeout: Option<Duration>,
}

pub struct EnumerationResult {
    /// Deduplicated canonical cycles, sorted by length ascending then
    /// lexicographically by canonical key.
    pub cycles: Vec<Vec<String>>,
    /// Every canonical key considered during the walk, in discovery order,
    /// including duplicates later folded into `cycles` — this is the
    /// `trace` named in §8 I4.
    pub trace: Vec<Vec<String>>,
    pub limited: bool,
    pub timed_out: bool,
}

struct Frame {
    node: usize,
    child_cursor: usize,
}

/// Walk every strongly connected component in `sccs` (each already sorted
/// ascending, components themselves ordered by smallest contained index)
/// looking for simple cycles within `bounds`.
pub fn enumerate_cycles(graph: &CompatibilityGraph, sccs: &[Vec<usize>], bounds: &EnumerationBounds) -> EnumerationResult {
    let started_at = Instant::now();
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut cycles: Vec<Vec<String>> = Vec::new();
    let mut trace: Vec<Vec<String>> = Vec::new();
    let mut limited = false;
    let mut timed_out = false;

    'components: for component in sccs {
        let comp_set: HashSet<usize> = component.iter().copied().collect();

        for &start in component {
            if let Some(cap) = bounds.max_enumerated_cycles {
                if cycles.len() >= cap {
                    limited = true;
                    break 'components;
                }
            }
            if let Some(budget) = bounds.timeout {
                if started_at.elapsed() >= budget {
                    timed_out = true;
                    break 'components;
                }
            }

            let mut path: Vec<usize> = vec![start];
            let mut on_path: HashSet<usize> = HashSet::from([start]);
            let mut stack: Vec<Frame> = vec![Frame { node: start, child_cursor: 0 }];

            while let Some(frame) = stack.last_mut() {
                if let Some(cap) = bounds.max_enumerated_cycles {
                    if cycles.len() >= cap {
                        limited = true;
                        break 'components;
                    }
                }
                if let Some(budget) = bounds.timeout {
                    if started_at.elapsed() >= budget {
                        timed_out = true;
                        break 'components;
                    }
                }

                let v = frame.node;
                let neighbors = &graph.adjacency[v];

                if frame.child_cursor >= neighbors.len() {
                    stack.pop();
                    path.pop();
                    on_path.remove(&v);
                    continue;
                }

                let (w, _edge_index) = neighbors[frame.child_cursor];
                frame.child_cursor += 1;

                if !comp_set.contains(&w) || w < start {
                    continue;
                }

                if w == start {
                    if path.len() >= bounds.min_len && path.len() <= bounds.max_len {
                        let ids: Vec<String> = path.iter().map(|&idx| graph.node_ids[idx].clone()).collect();
                        let canonical = rotate_to_smallest(&ids);
                        trace.push(canonical.clone());
                        if seen.insert(canonical.clone()) {
                            cycles.push(canonical);
                        }
                    }
                    continue;
                }

                if on_path.contains(&w) || path.len() >= bounds.max_len {
                    continue;
                }

                path.push(w);
                on_path.insert(w);
                stack.push(Frame { node: w, child_cursor: 0 });
            }
        }
    }

    cycles.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

    EnumerationResult { cycles, trace, limited, timed_out }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::scc::strongly_connected_components;
    use crate::test_support::{asset, intent};
    use chrono::Utc;

    fn default_bounds() -> EnumerationBounds {
        EnumerationBounds { min_len: 2, max_len: 3, max_enumerated_cycles: None, timeout: None }
    }

    #[test]
    fn two_party_mutual_want_yields_one_cycle() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 100.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "x", 80.0, 120.0, now);
        let refs = vec![&a, &b];
        let g = build_graph(&refs, &[], now);
        let sccs = strongly_connected_components(&g);
        let result = enumerate_cycles(&g, &sccs, &default_bounds());
        assert_eq!(result.cycles, vec![vec!["intent_a".to_string(), "intent_b".to_string()]]);
        assert!(!result.limited);
        assert!(!result.timed_out);
    }

    #[test]
    fn three_party_cycle_is_found_and_canonicalized() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 100.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "z", 80.0, 120.0, now);
        let c = intent("intent_c", vec![asset("steam", "z", 100.0)], "steam", "x", 80.0, 120.0, now);
        let refs = vec![&a, &b, &c];
        let g = build_graph(&refs, &[], now);
        let sccs = strongly_connected_components(&g);
        let result = enumerate_cycles(&g, &sccs, &default_bounds());
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.cycles[0][0], "intent_a");
    }

    #[test]
    fn zero_cap_yields_no_cycles_and_sets_limited() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 100.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "x", 80.0, 120.0, now);
        let refs = vec![&a, &b];
        let g = build_graph(&refs, &[], now);
        let sccs = strongly_connected_components(&g);
        let bounds = EnumerationBounds { min_len: 2, max_len: 3, max_enumerated_cycles: Some(0), timeout: None };
        let result = enumerate_cycles(&g, &sccs, &bounds);
        assert!(result.cycles.is_empty());
        assert!(result.limited);
    }

    #[test]
    fn determinism_under_component_input_order() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 100.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "z", 80.0, 120.0, now);
        let c = intent("intent_c", vec![asset("steam", "z", 100.0)], "steam", "x", 80.0, 120.0, now);
        let refs_a = vec![&a, &b, &c];
        let refs_b = vec![&c, &a, &b];
        let g1 = build_graph(&refs_a, &[], now);
        let g2 = build_graph(&refs_b, &[], now);
        let sccs1 = strongly_connected_components(&g1);
        let sccs2 = strongly_connected_components(&g2);
        let r1 = enumerate_cycles(&g1, &sccs1, &default_bounds());
        let r2 = enumerate_cycles(&g2, &sccs2, &default_bounds());
        assert_eq!(r1.cycles, r2.cycles);
        assert_eq!(r1.trace, r2.trace);
    }
}
