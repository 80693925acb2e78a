//! Step 2 — Tarjan's strongly-connected-components decomposition.
//!
//! Implemented with an explicit work stack rather than recursion (§9: "no
//! tail recursion guarantee" applies to every bounded-depth traversal in
//! this crate, not only cycle enumeration).

use crate::graph::CompatibilityGraph;

/// One iterative Tarjan frame: the node being visited and how far through
/// its adjacency list the simulated call has progressed.
struct Frame {
    node: usize,
    child_cursor: usize,
}

/// Strongly connected components containing at least one cycle (i.e. a
/// self-loop, or size ≥ 2), ordered by the smallest node index each
/// contains — the order step 3 iterates in.
pub fn strongly_connected_components(graph: &CompatibilityGraph) -> Vec<Vec<usize>> {
    let n = graph.node_count();
    let mut index = vec![None; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut components: Vec<Vec<usize>> = Vec::new();

    for root in 0..n {
        if index[root].is_some() {
            continue;
        }
        let mut work: Vec<Frame> = vec![Frame { node: root, child_cursor: 0 }];
        index[root] = Some(next_index);
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(frame) = work.last_mut() {
            let v = frame.node;
            let neighbors = &graph.adjacency[v];

            if frame.child_cursor < neighbors.len() {
                let (w, _edge) = neighbors[frame.child_cursor];
                frame.child_cursor += 1;

                if index[w].is_none() {
                    index[w] = Some(next_index);
                    lowlink[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    work.push(Frame { node: w, child_cursor: 0 });
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w].expect("checked Some"));
                }
            } else {
                work.pop();
                if let Some(parent) = work.last() {
                    lowlink[parent.node] = lowlink[parent.node].min(lowlink[v]);
                }
                if lowlink[v] == index[v].expect("root has an index") {
                    let mut component = Vec::new();
                    loop {
                        let w = stack.pop().expect("component root is on the stack");
                        on_stack[w] = false;
                        component.push(w);
                        if w == v {
                            break;
                        }
                    }
                    component.sort_unstable();
                    components.push(component);
                }
            }
        }
    }

    let has_self_loop =
        |node: usize| graph.adjacency[node].iter().any(|(target, _)| *target == node);
    let mut retained: Vec<Vec<usize>> = components
        .into_iter()
        .filter(|c| c.len() > 1 || (c.len() == 1 && has_self_loop(c[0])))
        .collect();
    retained.sort_by_key(|c| c[0]);
    retained
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::test_support::{asset, intent};
    use chrono::Utc;

    #[test]
    fn two_party_mutual_want_forms_one_component() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 100.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "x", 80.0, 120.0, now);
        let refs = vec![&a, &b];
        let g = build_graph(&refs, &[], now);
        let sccs = strongly_connected_components(&g);
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0].len(), 2);
    }

    #[test]
    fn acyclic_graph_has_no_retained_components() {
        let now = Utc::now();
        // a wants something nobody offers: no edges at all.
        let a = intent("intent_a", vec![asset("steam", "x", 100.0)], "steam", "nonexistent", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "also_missing", 80.0, 120.0, now);
        let refs = vec![&a, &b];
        let g = build_graph(&refs, &[], now);
        assert!(strongly_connected_components(&g).is_empty());
    }

    #[test]
    fn three_party_cycle_forms_one_component_ordered_by_smallest_index() {
        let now = Utc::now();
        let a = intent("intent_a", vec![asset("steam", "x", 100.0)], "steam", "y", 80.0, 120.0, now);
        let b = intent("intent_b", vec![asset("steam", "y", 100.0)], "steam", "z", 80.0, 120.0, now);
        let c = intent("intent_c", vec![asset("steam", "z", 100.0)], "steam", "x", 80.0, 120.0, now);
        let refs = vec![&a, &b, &c];
        let g = build_graph(&refs, &[], now);
        let sccs = strongly_connected_components(&g);
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0], vec![0, 1, 2]);
    }
}
