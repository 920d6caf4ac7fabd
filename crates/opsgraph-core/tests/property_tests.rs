//! # Property-Based Tests
//!
//! Determinism and round-trip invariants checked over generated graphs.

use opsgraph_core::{from_yaml, to_yaml, Graph, Resource, ResourceId};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;

// =============================================================================
// GENERATORS
// =============================================================================

fn arb_resource_id() -> impl Strategy<Value = ResourceId> {
    ("[a-z]{1,4}", "[a-z]{1,6}", "[a-z0-9_-]{1,8}")
        .prop_map(|(provider, rtype, name)| ResourceId::new(provider, rtype, name))
}

/// A graph built from generated vertices plus index pairs taken modulo the
/// vertex count, duplicates and self-loops dropped.
fn arb_graph() -> impl Strategy<Value = Graph> {
    (
        vec(arb_resource_id(), 1..20),
        vec((0usize..20, 0usize..20), 0..40),
    )
        .prop_map(|(ids, raw_edges)| {
            let ids: Vec<ResourceId> = ids
                .into_iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let mut graph = Graph::new();
            for id in &ids {
                graph.add_vertex(Resource::new(id.clone())).expect("vertex");
            }
            for (a, b) in raw_edges {
                let from = &ids[a % ids.len()];
                let to = &ids[b % ids.len()];
                if from != to && !graph.contains_edge(from, to) {
                    graph.add_edge(from, to).expect("edge");
                }
            }
            graph
        })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Identical construction produces an identical topological order.
    #[test]
    fn topological_sort_is_deterministic(graph in arb_graph()) {
        let copy = graph.clone();
        prop_assert_eq!(graph.topological_sort(), copy.topological_sort());
    }

    /// Sorting visits every vertex exactly once, cycles included.
    #[test]
    fn topological_sort_is_a_permutation(graph in arb_graph()) {
        let order = graph.topological_sort();
        prop_assert_eq!(order.len(), graph.vertex_count());
        let unique: BTreeSet<_> = order.iter().collect();
        prop_assert_eq!(unique.len(), order.len());
    }

    /// The reverse order is exactly the forward order reversed.
    #[test]
    fn reverse_order_mirrors_forward(graph in arb_graph()) {
        let mut forward = graph.topological_sort();
        forward.reverse();
        prop_assert_eq!(graph.reverse_topological_sort(), forward);
    }

    /// Acyclic orders respect every edge.
    #[test]
    fn acyclic_order_respects_edges(graph in arb_graph()) {
        let order = graph.topological_sort();
        let rank: std::collections::BTreeMap<_, _> =
            order.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        let mut any_backward = false;
        for (from, to) in graph.edges() {
            if rank[from] > rank[to] {
                any_backward = true;
            }
        }
        // A backward edge is only legitimate when the graph has a cycle.
        if any_backward {
            let has_cycle = graph
                .vertex_ids()
                .any(|v| graph.downstream(v).iter().any(|d| graph.has_path(d, v)));
            prop_assert!(has_cycle);
        }
    }

    /// Stable serialization order is itself deterministic.
    #[test]
    fn stable_order_is_deterministic(graph in arb_graph()) {
        prop_assert_eq!(graph.stable_order(), graph.clone().stable_order());
        prop_assert_eq!(graph.stable_order().len(), graph.vertex_count());
    }

    /// serialize -> load -> serialize is byte-identical, cycles included.
    #[test]
    fn serialization_round_trips_byte_identical(graph in arb_graph()) {
        let first = to_yaml(&graph).expect("serialize");
        let reloaded = from_yaml(&first).expect("load");
        prop_assert_eq!(&reloaded, &graph);
        let second = to_yaml(&reloaded).expect("serialize");
        prop_assert_eq!(first, second);
    }

    /// Resource ids survive the round trip through their text form.
    #[test]
    fn resource_id_text_round_trips(id in arb_resource_id()) {
        let text = id.to_string();
        let parsed: ResourceId = text.parse().expect("parse");
        prop_assert_eq!(parsed, id);
    }

    /// Namespaced ids round-trip too.
    #[test]
    fn namespaced_id_text_round_trips(
        (provider, rtype, namespace, name) in
            ("[a-z]{1,4}", "[a-z]{1,6}", "[a-z0-9_-]{1,8}", "[a-z0-9_-]{1,8}")
    ) {
        let id = ResourceId::namespaced(provider, rtype, namespace, name);
        let parsed: ResourceId = id.to_string().parse().expect("parse");
        prop_assert_eq!(parsed, id);
    }

    /// Removing a vertex removes every incident edge.
    #[test]
    fn vertex_removal_drops_incident_edges(graph in arb_graph()) {
        let mut graph = graph;
        let Some(victim) = graph.vertex_ids().next().cloned() else {
            return Ok(());
        };
        graph.remove_vertex(&victim).expect("remove");
        for (from, to) in graph.edges() {
            prop_assert_ne!(from, &victim);
            prop_assert_ne!(to, &victim);
        }
    }
}
