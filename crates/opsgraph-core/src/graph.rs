//! # Resource Graph
//!
//! The directed graph underlying both the Dataflow and Deployment views.
//!
//! All data structures use `BTreeMap`/`BTreeSet` for deterministic ordering;
//! every algorithm that faces a tie breaks it by `ResourceId` ordering, so
//! the same logical graph always produces byte-identical output.
//!
//! The Dataflow graph may contain cycles; cycle-intolerant callers
//! (serialization, hashing) go through [`Graph::stable_order`], which breaks
//! cycles on a spanning subgraph before sorting.

use crate::types::{OpsError, Resource, ResourceId};
use std::collections::{BTreeMap, BTreeSet};

/// Default weight assigned to edges added without an explicit weight.
pub const DEFAULT_EDGE_WEIGHT: i64 = 1;

/// Hard bound on reconstructed path length, guarding the predecessor walk.
pub const MAX_PATH_LENGTH: usize = 1_000;

/// An edge-skip predicate for [`Graph::shortest_path_filtered`].
///
/// Returning `true` excludes the edge from relaxation; used to re-evaluate
/// routes while pretending certain edges do not exist.
pub type EdgeSkip<'a> = &'a dyn Fn(&ResourceId, &ResourceId) -> bool;

// =============================================================================
// GRAPH
// =============================================================================

/// A directed graph of resources keyed by [`ResourceId`].
///
/// Uses `BTreeMap` exclusively. No `HashMap` allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    /// Vertex storage: id -> resource.
    vertices: BTreeMap<ResourceId, Resource>,
    /// Adjacency: from -> (to -> weight).
    out: BTreeMap<ResourceId, BTreeMap<ResourceId, i64>>,
    /// Predecessors: to -> set of from.
    inc: BTreeMap<ResourceId, BTreeSet<ResourceId>>,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // VERTEX CRUD
    // =========================================================================

    /// Add a vertex. Errors with [`OpsError::VertexExists`] on duplicates.
    pub fn add_vertex(&mut self, resource: Resource) -> Result<(), OpsError> {
        if self.vertices.contains_key(&resource.id) {
            return Err(OpsError::VertexExists(resource.id));
        }
        self.out.entry(resource.id.clone()).or_default();
        self.inc.entry(resource.id.clone()).or_default();
        self.vertices.insert(resource.id.clone(), resource);
        Ok(())
    }

    /// Remove a vertex and every incident edge, returning the resource.
    pub fn remove_vertex(&mut self, id: &ResourceId) -> Result<Resource, OpsError> {
        let resource = self
            .vertices
            .remove(id)
            .ok_or_else(|| OpsError::VertexNotFound(id.clone()))?;

        if let Some(targets) = self.out.remove(id) {
            for to in targets.keys() {
                if let Some(preds) = self.inc.get_mut(to) {
                    preds.remove(id);
                }
            }
        }
        if let Some(preds) = self.inc.remove(id) {
            for from in preds {
                if let Some(targets) = self.out.get_mut(&from) {
                    targets.remove(id);
                }
            }
        }
        Ok(resource)
    }

    /// Look up a vertex.
    #[must_use]
    pub fn vertex(&self, id: &ResourceId) -> Option<&Resource> {
        self.vertices.get(id)
    }

    /// Look up a vertex mutably.
    #[must_use]
    pub fn vertex_mut(&mut self, id: &ResourceId) -> Option<&mut Resource> {
        self.vertices.get_mut(id)
    }

    /// True if the vertex exists.
    #[must_use]
    pub fn contains_vertex(&self, id: &ResourceId) -> bool {
        self.vertices.contains_key(id)
    }

    /// All vertices in id order.
    pub fn vertices(&self) -> impl Iterator<Item = &Resource> {
        self.vertices.values()
    }

    /// All vertex ids in id order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.vertices.keys()
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    // =========================================================================
    // EDGE CRUD
    // =========================================================================

    /// Add an edge with the default weight.
    pub fn add_edge(&mut self, from: &ResourceId, to: &ResourceId) -> Result<(), OpsError> {
        self.add_edge_weighted(from, to, DEFAULT_EDGE_WEIGHT)
    }

    /// Add an edge with an explicit weight.
    ///
    /// Errors with [`OpsError::VertexNotFound`] for missing endpoints and
    /// [`OpsError::EdgeExists`] for duplicates.
    pub fn add_edge_weighted(
        &mut self,
        from: &ResourceId,
        to: &ResourceId,
        weight: i64,
    ) -> Result<(), OpsError> {
        if !self.vertices.contains_key(from) {
            return Err(OpsError::VertexNotFound(from.clone()));
        }
        if !self.vertices.contains_key(to) {
            return Err(OpsError::VertexNotFound(to.clone()));
        }
        let targets = self.out.entry(from.clone()).or_default();
        if targets.contains_key(to) {
            return Err(OpsError::EdgeExists(from.clone(), to.clone()));
        }
        targets.insert(to.clone(), weight);
        self.inc.entry(to.clone()).or_default().insert(from.clone());
        Ok(())
    }

    /// Remove an edge.
    pub fn remove_edge(&mut self, from: &ResourceId, to: &ResourceId) -> Result<(), OpsError> {
        let removed = self
            .out
            .get_mut(from)
            .is_some_and(|targets| targets.remove(to).is_some());
        if !removed {
            return Err(OpsError::EdgeNotFound(from.clone(), to.clone()));
        }
        if let Some(preds) = self.inc.get_mut(to) {
            preds.remove(from);
        }
        Ok(())
    }

    /// True if the edge exists.
    #[must_use]
    pub fn contains_edge(&self, from: &ResourceId, to: &ResourceId) -> bool {
        self.out
            .get(from)
            .is_some_and(|targets| targets.contains_key(to))
    }

    /// The weight of an edge, if present.
    #[must_use]
    pub fn edge_weight(&self, from: &ResourceId, to: &ResourceId) -> Option<i64> {
        self.out.get(from)?.get(to).copied()
    }

    /// All edges in deterministic (from, to) order.
    pub fn edges(&self) -> impl Iterator<Item = (&ResourceId, &ResourceId)> {
        self.out
            .iter()
            .flat_map(|(from, targets)| targets.keys().map(move |to| (from, to)))
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.out.values().map(BTreeMap::len).sum()
    }

    /// Downstream neighbors (outgoing edge targets) in id order.
    #[must_use]
    pub fn downstream(&self, id: &ResourceId) -> Vec<ResourceId> {
        self.out
            .get(id)
            .map(|targets| targets.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Upstream neighbors (incoming edge sources) in id order.
    #[must_use]
    pub fn upstream(&self, id: &ResourceId) -> Vec<ResourceId> {
        self.inc
            .get(id)
            .map(|preds| preds.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The full adjacency map.
    #[must_use]
    pub fn adjacency_map(&self) -> &BTreeMap<ResourceId, BTreeMap<ResourceId, i64>> {
        &self.out
    }

    /// The full predecessor map.
    #[must_use]
    pub fn predecessor_map(&self) -> &BTreeMap<ResourceId, BTreeSet<ResourceId>> {
        &self.inc
    }

    // =========================================================================
    // REACHABILITY
    // =========================================================================

    /// True if a directed path `from -> ... -> to` exists.
    #[must_use]
    pub fn has_path(&self, from: &ResourceId, to: &ResourceId) -> bool {
        if from == to {
            return true;
        }
        let mut visited = BTreeSet::new();
        let mut stack = vec![from.clone()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(targets) = self.out.get(&current) {
                for next in targets.keys() {
                    if next == to {
                        return true;
                    }
                    stack.push(next.clone());
                }
            }
        }
        false
    }

    /// True if adding `from -> to` would close a directed cycle.
    #[must_use]
    pub fn would_create_cycle(&self, from: &ResourceId, to: &ResourceId) -> bool {
        from == to || self.has_path(to, from)
    }

    /// Enumerate all simple paths `from -> ... -> to`, bounded by
    /// [`MAX_PATH_LENGTH`], in deterministic order.
    #[must_use]
    pub fn all_simple_paths(&self, from: &ResourceId, to: &ResourceId) -> Vec<Vec<ResourceId>> {
        let mut results = Vec::new();
        if !self.contains_vertex(from) || !self.contains_vertex(to) {
            return results;
        }
        let mut current = vec![from.clone()];
        let mut on_path: BTreeSet<ResourceId> = current.iter().cloned().collect();
        self.simple_paths_dfs(to, &mut current, &mut on_path, &mut results);
        results
    }

    fn simple_paths_dfs(
        &self,
        to: &ResourceId,
        current: &mut Vec<ResourceId>,
        on_path: &mut BTreeSet<ResourceId>,
        results: &mut Vec<Vec<ResourceId>>,
    ) {
        let Some(last) = current.last().cloned() else {
            return;
        };
        if current.len() >= MAX_PATH_LENGTH {
            return;
        }
        if let Some(targets) = self.out.get(&last) {
            for next in targets.keys() {
                if next == to {
                    current.push(next.clone());
                    results.push(current.clone());
                    current.pop();
                    continue;
                }
                if on_path.contains(next) {
                    continue;
                }
                current.push(next.clone());
                on_path.insert(next.clone());
                self.simple_paths_dfs(to, current, on_path, results);
                on_path.remove(next);
                current.pop();
            }
        }
    }

    // =========================================================================
    // STABLE TOPOLOGICAL SORT
    // =========================================================================

    /// Stable topological sort, tolerant of cycles.
    ///
    /// Kahn's algorithm with two deterministic rules:
    /// - among ready vertices (no unresolved predecessors), the smallest id
    ///   goes first;
    /// - when no vertex is ready (a cycle), the vertex with the fewest
    ///   unresolved predecessors goes next, again tie-broken by id.
    ///
    /// Re-running on an unchanged graph yields byte-identical output.
    #[must_use]
    pub fn topological_sort(&self) -> Vec<ResourceId> {
        let mut unresolved: BTreeMap<ResourceId, usize> = self
            .vertices
            .keys()
            .map(|id| {
                let preds = self.inc.get(id).map_or(0, BTreeSet::len);
                // Self-loops never resolve; ignore them up front.
                let self_loop = usize::from(self.contains_edge(id, id));
                (id.clone(), preds.saturating_sub(self_loop))
            })
            .collect();

        let mut order = Vec::with_capacity(unresolved.len());
        while !unresolved.is_empty() {
            // Smallest ready id, or the least-blocked id on a cycle.
            let next = unresolved
                .iter()
                .find(|(_, count)| **count == 0)
                .map(|(id, _)| id.clone())
                .or_else(|| {
                    unresolved
                        .iter()
                        .min_by_key(|(id, count)| (**count, (*id).clone()))
                        .map(|(id, _)| id.clone())
                });
            let Some(next) = next else { break };

            unresolved.remove(&next);
            if let Some(targets) = self.out.get(&next) {
                for to in targets.keys() {
                    if let Some(count) = unresolved.get_mut(to) {
                        *count = count.saturating_sub(1);
                    }
                }
            }
            order.push(next);
        }
        order
    }

    /// `reverse_topological_sort(G) == reverse(topological_sort(G))`, always.
    #[must_use]
    pub fn reverse_topological_sort(&self) -> Vec<ResourceId> {
        let mut order = self.topological_sort();
        order.reverse();
        order
    }

    /// Strict stable ordering for cycle-intolerant uses (serialization,
    /// content hashing).
    ///
    /// A spanning subgraph is computed first — edges are admitted in
    /// deterministic order, skipping any that would close a cycle — and the
    /// acyclic result is then topologically sorted.
    #[must_use]
    pub fn stable_order(&self) -> Vec<ResourceId> {
        let mut acyclic = Graph::new();
        for resource in self.vertices.values() {
            // Vertices are fresh; insertion cannot fail.
            let _ = acyclic.add_vertex(Resource::new(resource.id.clone()));
        }
        for (from, to) in self.edges() {
            if !acyclic.would_create_cycle(from, to) {
                let _ = acyclic.add_edge(from, to);
            }
        }
        acyclic.topological_sort()
    }

    // =========================================================================
    // SHORTEST PATH (Bellman–Ford)
    // =========================================================================

    /// Shortest path from `source` to `target` by total edge weight.
    ///
    /// Returns `Ok(None)` when the target is unreachable.
    pub fn shortest_path(
        &self,
        source: &ResourceId,
        target: &ResourceId,
    ) -> Result<Option<Vec<ResourceId>>, OpsError> {
        self.shortest_path_filtered(source, target, &|_, _| false)
    }

    /// Shortest path with an edge-skip predicate.
    ///
    /// A Bellman–Ford variant:
    /// - edges for which `skip` returns true are excluded from relaxation;
    /// - self-loops are ignored;
    /// - equal-distance relaxations tie-break by predecessor id ordering;
    /// - a negative-weight cycle raises [`OpsError::NegativeCycle`];
    /// - reconstruction detects predecessor-chain cycles and reports them
    ///   rather than looping unboundedly.
    pub fn shortest_path_filtered(
        &self,
        source: &ResourceId,
        target: &ResourceId,
        skip: EdgeSkip<'_>,
    ) -> Result<Option<Vec<ResourceId>>, OpsError> {
        if !self.contains_vertex(source) {
            return Err(OpsError::VertexNotFound(source.clone()));
        }
        if !self.contains_vertex(target) {
            return Err(OpsError::VertexNotFound(target.clone()));
        }
        if source == target {
            return Ok(Some(vec![source.clone()]));
        }

        let mut dist: BTreeMap<ResourceId, i64> = BTreeMap::new();
        let mut prev: BTreeMap<ResourceId, ResourceId> = BTreeMap::new();
        dist.insert(source.clone(), 0);

        let vertex_count = self.vertices.len();
        for _ in 1..vertex_count {
            let mut changed = false;
            for (from, targets) in &self.out {
                let Some(&from_dist) = dist.get(from) else {
                    continue;
                };
                for (to, &weight) in targets {
                    if from == to || skip(from, to) {
                        continue;
                    }
                    let candidate = from_dist.saturating_add(weight);
                    match dist.get(to) {
                        Some(&existing) if candidate > existing => {}
                        Some(&existing) if candidate == existing => {
                            // Tie: the smaller predecessor id wins.
                            if prev.get(to).is_some_and(|p| from < p) {
                                prev.insert(to.clone(), from.clone());
                                changed = true;
                            }
                        }
                        _ => {
                            dist.insert(to.clone(), candidate);
                            prev.insert(to.clone(), from.clone());
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }

        // One more relaxation pass: any improvement means a negative cycle.
        for (from, targets) in &self.out {
            let Some(&from_dist) = dist.get(from) else {
                continue;
            };
            for (to, &weight) in targets {
                if from == to || skip(from, to) {
                    continue;
                }
                if dist
                    .get(to)
                    .is_none_or(|&existing| from_dist.saturating_add(weight) < existing)
                {
                    return Err(OpsError::NegativeCycle(to.clone()));
                }
            }
        }

        if !prev.contains_key(target) {
            return Ok(None);
        }

        // Reconstruct, guarding against predecessor-chain cycles.
        let mut path = vec![target.clone()];
        let mut seen: BTreeSet<ResourceId> = [target.clone()].into_iter().collect();
        let mut current = target.clone();
        while &current != source {
            let Some(parent) = prev.get(&current) else {
                return Ok(None);
            };
            if !seen.insert(parent.clone()) || path.len() >= MAX_PATH_LENGTH {
                return Err(OpsError::PredecessorCycle(parent.clone()));
            }
            path.push(parent.clone());
            current = parent.clone();
        }
        path.reverse();
        Ok(Some(path))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ResourceId {
        s.parse().expect("id")
    }

    fn graph_of(edges: &[(&str, &str)]) -> Graph {
        let mut g = Graph::new();
        for (from, to) in edges {
            for v in [from, to] {
                if !g.contains_vertex(&id(v)) {
                    g.add_vertex(Resource::new(id(v))).expect("vertex");
                }
            }
            if !g.contains_edge(&id(from), &id(to)) {
                g.add_edge(&id(from), &id(to)).expect("edge");
            }
        }
        g
    }

    #[test]
    fn add_and_remove_vertex() {
        let mut g = Graph::new();
        g.add_vertex(Resource::new(id("p:t:a"))).expect("add");
        assert!(g.contains_vertex(&id("p:t:a")));
        assert!(matches!(
            g.add_vertex(Resource::new(id("p:t:a"))),
            Err(OpsError::VertexExists(_))
        ));

        let removed = g.remove_vertex(&id("p:t:a")).expect("remove");
        assert_eq!(removed.id, id("p:t:a"));
        assert!(matches!(
            g.remove_vertex(&id("p:t:a")),
            Err(OpsError::VertexNotFound(_))
        ));
    }

    #[test]
    fn remove_vertex_removes_incident_edges() {
        let mut g = graph_of(&[("p:t:a", "p:t:b"), ("p:t:b", "p:t:c")]);
        g.remove_vertex(&id("p:t:b")).expect("remove");
        assert_eq!(g.edge_count(), 0);
        assert!(g.upstream(&id("p:t:c")).is_empty());
        assert!(g.downstream(&id("p:t:a")).is_empty());
    }

    #[test]
    fn edge_requires_both_endpoints() {
        let mut g = Graph::new();
        g.add_vertex(Resource::new(id("p:t:a"))).expect("add");
        assert!(matches!(
            g.add_edge(&id("p:t:a"), &id("p:t:b")),
            Err(OpsError::VertexNotFound(_))
        ));
    }

    #[test]
    fn duplicate_edge_rejected() {
        let mut g = graph_of(&[("p:t:a", "p:t:b")]);
        assert!(matches!(
            g.add_edge(&id("p:t:a"), &id("p:t:b")),
            Err(OpsError::EdgeExists(_, _))
        ));
    }

    #[test]
    fn upstream_and_downstream() {
        let g = graph_of(&[("p:t:a", "p:t:b"), ("p:t:c", "p:t:b")]);
        assert_eq!(g.upstream(&id("p:t:b")), vec![id("p:t:a"), id("p:t:c")]);
        assert_eq!(g.downstream(&id("p:t:a")), vec![id("p:t:b")]);
    }

    #[test]
    fn topological_sort_acyclic() {
        let g = graph_of(&[("p:t:b", "p:t:c"), ("p:t:a", "p:t:b")]);
        assert_eq!(
            g.topological_sort(),
            vec![id("p:t:a"), id("p:t:b"), id("p:t:c")]
        );
    }

    #[test]
    fn topological_sort_breaks_ties_by_id() {
        // Two roots: the smaller id must come first.
        let g = graph_of(&[("p:t:b", "p:t:z"), ("p:t:a", "p:t:z")]);
        assert_eq!(
            g.topological_sort(),
            vec![id("p:t:a"), id("p:t:b"), id("p:t:z")]
        );
    }

    #[test]
    fn topological_sort_handles_cycles_deterministically() {
        let g = graph_of(&[("p:t:a", "p:t:b"), ("p:t:b", "p:t:a"), ("p:t:b", "p:t:c")]);
        let first = g.topological_sort();
        let second = g.topological_sort();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        // Least-blocked, id-tie-broken: a enters first.
        assert_eq!(first[0], id("p:t:a"));
    }

    #[test]
    fn reverse_sort_is_reverse_of_sort() {
        let g = graph_of(&[
            ("p:t:a", "p:t:b"),
            ("p:t:b", "p:t:c"),
            ("p:t:c", "p:t:a"),
            ("p:t:c", "p:t:d"),
        ]);
        let mut forward = g.topological_sort();
        forward.reverse();
        assert_eq!(g.reverse_topological_sort(), forward);
    }

    #[test]
    fn stable_order_breaks_cycles() {
        let g = graph_of(&[("p:t:a", "p:t:b"), ("p:t:b", "p:t:a")]);
        let order = g.stable_order();
        assert_eq!(order, vec![id("p:t:a"), id("p:t:b")]);
    }

    #[test]
    fn shortest_path_prefers_direct_edge() {
        // p:t:1 -> p:t:2 -> p:t:3 plus the direct p:t:1 -> p:t:3.
        let mut g = graph_of(&[("p:t:1", "p:t:2"), ("p:t:2", "p:t:3"), ("p:t:1", "p:t:3")]);
        let path = g
            .shortest_path(&id("p:t:1"), &id("p:t:3"))
            .expect("trajectory")
            .expect("path");
        assert_eq!(path, vec![id("p:t:1"), id("p:t:3")]);

        // A self-loop changes nothing.
        g.add_edge(&id("p:t:1"), &id("p:t:1")).expect("self-loop");
        let path = g
            .shortest_path(&id("p:t:1"), &id("p:t:3"))
            .expect("trajectory")
            .expect("path");
        assert_eq!(path, vec![id("p:t:1"), id("p:t:3")]);
    }

    #[test]
    fn shortest_path_tie_breaks_by_predecessor_id() {
        // Two equal-length routes into p:t:z; the p:t:a predecessor wins.
        let g = graph_of(&[
            ("p:t:s", "p:t:a"),
            ("p:t:s", "p:t:b"),
            ("p:t:a", "p:t:z"),
            ("p:t:b", "p:t:z"),
        ]);
        let path = g
            .shortest_path(&id("p:t:s"), &id("p:t:z"))
            .expect("trajectory")
            .expect("path");
        assert_eq!(path, vec![id("p:t:s"), id("p:t:a"), id("p:t:z")]);
    }

    #[test]
    fn shortest_path_respects_skip_predicate() {
        let g = graph_of(&[("p:t:1", "p:t:2"), ("p:t:2", "p:t:3"), ("p:t:1", "p:t:3")]);
        let skip_direct =
            |from: &ResourceId, to: &ResourceId| *from == id("p:t:1") && *to == id("p:t:3");
        let path = g
            .shortest_path_filtered(&id("p:t:1"), &id("p:t:3"), &skip_direct)
            .expect("trajectory")
            .expect("path");
        assert_eq!(path, vec![id("p:t:1"), id("p:t:2"), id("p:t:3")]);
    }

    #[test]
    fn shortest_path_unreachable_is_none() {
        let g = graph_of(&[("p:t:a", "p:t:b"), ("p:t:c", "p:t:d")]);
        let result = g.shortest_path(&id("p:t:a"), &id("p:t:d")).expect("ok");
        assert!(result.is_none());
    }

    #[test]
    fn shortest_path_detects_negative_cycle() {
        let mut g = Graph::new();
        for v in ["p:t:a", "p:t:b", "p:t:c"] {
            g.add_vertex(Resource::new(id(v))).expect("vertex");
        }
        g.add_edge_weighted(&id("p:t:a"), &id("p:t:b"), 1).expect("edge");
        g.add_edge_weighted(&id("p:t:b"), &id("p:t:a"), -2).expect("edge");
        g.add_edge_weighted(&id("p:t:b"), &id("p:t:c"), 1).expect("edge");
        assert!(matches!(
            g.shortest_path(&id("p:t:a"), &id("p:t:c")),
            Err(OpsError::NegativeCycle(_))
        ));
    }

    #[test]
    fn would_create_cycle_detection() {
        let g = graph_of(&[("p:t:a", "p:t:b"), ("p:t:b", "p:t:c")]);
        assert!(g.would_create_cycle(&id("p:t:c"), &id("p:t:a")));
        assert!(!g.would_create_cycle(&id("p:t:a"), &id("p:t:c")));
        assert!(g.would_create_cycle(&id("p:t:a"), &id("p:t:a")));
    }

    #[test]
    fn all_simple_paths_enumerates_both_routes() {
        let g = graph_of(&[("p:t:1", "p:t:2"), ("p:t:2", "p:t:3"), ("p:t:1", "p:t:3")]);
        let paths = g.all_simple_paths(&id("p:t:1"), &id("p:t:3"));
        assert_eq!(
            paths,
            vec![
                vec![id("p:t:1"), id("p:t:2"), id("p:t:3")],
                vec![id("p:t:1"), id("p:t:3")],
            ]
        );
    }

    #[test]
    fn all_simple_paths_ignores_cycles() {
        let g = graph_of(&[("p:t:1", "p:t:2"), ("p:t:2", "p:t:1"), ("p:t:2", "p:t:3")]);
        let paths = g.all_simple_paths(&id("p:t:1"), &id("p:t:3"));
        assert_eq!(paths, vec![vec![id("p:t:1"), id("p:t:2"), id("p:t:3")]]);
    }
}
