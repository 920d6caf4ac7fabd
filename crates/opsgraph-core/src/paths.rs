//! # Path Selection & Edge Expansion
//!
//! Turns a requested logical edge into a realized dataflow path. A direct
//! edge permitted by the knowledge base is marked operational in place; a
//! pair with no direct template is routed through intermediate resource
//! types discovered from the catalog's edge templates, bounded by the
//! configured hop limit.
//!
//! Edge constraints scoped to the exact pair act as filters: `must_contain`
//! pins the route through a specific resource, `must_not_contain` excludes
//! one. A required connectivity classification from the pair's path
//! satisfactions restricts which types may appear as intermediates.
//!
//! The speculative [`can_connect`] check and the parallel
//! [`valid_edge_targets`] probe run the same selection logic without
//! committing mutations.

use crate::constraints::{resolve_endpoint, Constraint, EdgeOperator};
use crate::graph::Graph;
use crate::knowledge::KnowledgeBase;
use crate::solution::SolutionContext;
use crate::types::{Decision, OpsError, Resource, ResourceId, TypeRef};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

// =============================================================================
// EDGE EXPANSION
// =============================================================================

/// Realize a logical edge `from -> to`, returning the dataflow path that now
/// carries it (two ids for a direct edge, more when intermediates were
/// inserted).
pub fn expand_edge(
    ctx: &mut SolutionContext,
    from: &ResourceId,
    to: &ResourceId,
) -> Result<Vec<ResourceId>, OpsError> {
    if !ctx.dataflow().contains_vertex(from) {
        return Err(OpsError::VertexNotFound(from.clone()));
    }
    if !ctx.dataflow().contains_vertex(to) {
        return Err(OpsError::VertexNotFound(to.clone()));
    }

    let filters = PairFilters::for_pair(ctx, from, to);

    // A direct template with no pinned intermediate realizes in place.
    let direct = ctx
        .knowledge_base()
        .edge_template(&from.type_ref(), &to.type_ref());
    if direct.is_some() && filters.pinned.is_empty() {
        realize_hop(ctx, from, to)?;
        return Ok(vec![from.clone(), to.clone()]);
    }

    let type_path = select_type_path(ctx, from, to, &filters)?;

    // Materialize intermediates: a pinned resource of the right type is
    // reused, otherwise a fresh resource is named after the pair it joins.
    let mut concrete = vec![from.clone()];
    for rtype in &type_path[1..type_path.len() - 1] {
        let id = filters
            .pinned
            .iter()
            .find(|p| p.type_ref() == *rtype)
            .cloned()
            .unwrap_or_else(|| rtype.instance(format!("{}-{}", from.name, to.name)));
        if !ctx.dataflow().contains_vertex(&id) {
            ctx.operational().add_resource(Resource::new(id.clone()))?;
        }
        concrete.push(id);
    }
    concrete.push(to.clone());

    // The two-node edge is replaced by the expanded chain.
    if ctx.dataflow().contains_edge(from, to) {
        ctx.raw().remove_edge(from, to)?;
    }
    for pair in concrete.windows(2) {
        realize_hop(ctx, &pair[0], &pair[1])?;
    }

    ctx.record(Decision::ExpandEdge(
        from.clone(),
        to.clone(),
        concrete.clone(),
    ));
    Ok(concrete)
}

/// Add one realized edge and run its template's operational rules. An edge
/// that already exists still gets its rules run, keeping expansion
/// idempotent.
fn realize_hop(
    ctx: &mut SolutionContext,
    from: &ResourceId,
    to: &ResourceId,
) -> Result<(), OpsError> {
    if !ctx.dataflow().contains_edge(from, to) {
        ctx.raw().add_edge(from, to)?;
    }
    let template = ctx.edge_template_or_default(from, to);
    ctx.operational()
        .run_operational_rules(from, to, &template.operational_rules)
}

// =============================================================================
// SELECTION
// =============================================================================

/// Constraint-derived filters for one (source, target) pair.
#[derive(Debug, Default)]
struct PairFilters {
    /// Resources the route must pass through.
    pinned: Vec<ResourceId>,
    /// Types the route must avoid.
    excluded: BTreeSet<TypeRef>,
    /// Whether any filter was bound to a specific resource instance. Such a
    /// selection cannot be memoized per type pair.
    instance_bound: bool,
}

impl PairFilters {
    fn for_pair(ctx: &SolutionContext, from: &ResourceId, to: &ResourceId) -> Self {
        let mut filters = Self::default();
        for constraint in ctx.constraints() {
            let Constraint::Edge {
                operator,
                target,
                node,
                ..
            } = constraint
            else {
                continue;
            };
            let sources = resolve_endpoint(&target.source, ctx.mapping());
            let targets = resolve_endpoint(&target.target, ctx.mapping());
            if !sources.contains(from) || !targets.contains(to) {
                continue;
            }
            match (operator, node) {
                (EdgeOperator::MustContain, Some(node)) => {
                    filters.pinned.push(node.clone());
                    filters.instance_bound = true;
                }
                (EdgeOperator::MustNotContain, Some(node)) => {
                    filters.excluded.insert(node.type_ref());
                    filters.instance_bound = true;
                }
                _ => {}
            }
        }
        filters
    }
}

/// Pick a type-level route from `from` to `to` through the catalog's edge
/// templates: shortest by hop count, first-discovered (lexicographic) among
/// equals, routed through every pinned type in order.
fn select_type_path(
    ctx: &SolutionContext,
    from: &ResourceId,
    to: &ResourceId,
    filters: &PairFilters,
) -> Result<Vec<TypeRef>, OpsError> {
    let kb = ctx.knowledge_base();
    let classification = ctx
        .knowledge_base()
        .path_satisfactions(&from.type_ref(), &to.type_ref())
        .into_iter()
        .find_map(|s| s.classification);
    let max_hops = ctx.config().max_expansion_hops;

    let mut waypoints = vec![from.type_ref()];
    waypoints.extend(filters.pinned.iter().map(ResourceId::type_ref));
    waypoints.push(to.type_ref());

    let mut route = vec![from.type_ref()];
    for leg in waypoints.windows(2) {
        let segment = type_search(
            kb,
            &leg[0],
            &leg[1],
            &filters.excluded,
            classification.as_deref(),
            max_hops,
        )
        .ok_or_else(|| OpsError::NoSatisfyingPath {
            from: from.clone(),
            to: to.clone(),
        })?;
        route.extend(segment.into_iter().skip(1));
    }
    if route.len().saturating_sub(1) > max_hops {
        return Err(OpsError::NoSatisfyingPath {
            from: from.clone(),
            to: to.clone(),
        });
    }
    Ok(route)
}

/// Search the type graph by building a temporary selection graph over the
/// reachable catalog types and taking its weighted shortest path.
///
/// Intermediate types must not be excluded and must carry the required
/// classification; endpoints are accepted as-is. Edge weights come from the
/// catalog's edge templates, and the shortest-path tie-breaks make equal
/// routes resolve to the lexicographically smallest one.
fn type_search(
    kb: &dyn KnowledgeBase,
    from: &TypeRef,
    to: &TypeRef,
    excluded: &BTreeSet<TypeRef>,
    classification: Option<&str>,
    max_hops: usize,
) -> Option<Vec<TypeRef>> {
    let usable_intermediate = |t: &TypeRef| -> bool {
        if excluded.contains(t) {
            return false;
        }
        match classification {
            Some(label) => kb
                .resource_template(t)
                .map(|tpl| tpl.classification.is(label))
                .unwrap_or(false),
            None => true,
        }
    };
    // One placeholder vertex per candidate type.
    let node = |t: &TypeRef| t.instance("candidate");

    let mut selection = Graph::new();
    let _ = selection.add_vertex(Resource::new(node(from)));
    let mut queue = VecDeque::from([from.clone()]);
    let mut seen = BTreeSet::from([from.clone()]);
    while let Some(current) = queue.pop_front() {
        for next in kb.edge_targets(&current) {
            if next != *to && !usable_intermediate(&next) {
                continue;
            }
            let weight = kb
                .edge_template(&current, &next)
                .map_or(crate::graph::DEFAULT_EDGE_WEIGHT, |t| t.weight);
            let next_id = node(&next);
            if !selection.contains_vertex(&next_id) {
                let _ = selection.add_vertex(Resource::new(next_id.clone()));
            }
            let _ = selection.add_edge_weighted(&node(&current), &next_id, weight);
            if seen.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }

    let path = selection.shortest_path(&node(from), &node(to)).ok()??;
    if path.len().saturating_sub(1) > max_hops {
        return None;
    }
    Some(
        path.iter()
            .map(|id| TypeRef::new(id.provider.clone(), id.rtype.clone()))
            .collect(),
    )
}

// =============================================================================
// SPECULATIVE PROBE
// =============================================================================

/// Result of one speculative connectivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    /// Whether a route exists.
    pub connectable: bool,
    /// Whether the answer holds for every instance pair of the same types.
    /// False when selection consulted an instance-bound constraint filter.
    pub cacheable: bool,
}

/// Check whether `from` could connect to `to` without committing mutations.
#[must_use]
pub fn can_connect(ctx: &SolutionContext, from: &ResourceId, to: &ResourceId) -> ProbeResult {
    let filters = PairFilters::for_pair(ctx, from, to);
    let direct = ctx
        .knowledge_base()
        .edge_template(&from.type_ref(), &to.type_ref())
        .is_some();
    let connectable = if direct && filters.pinned.is_empty() {
        true
    } else {
        select_type_path(ctx, from, to, &filters).is_ok()
    };
    ProbeResult {
        connectable,
        cacheable: !filters.instance_bound,
    }
}

/// Probe every candidate pair in parallel, returning the connectable ones.
///
/// Runs on a dedicated rayon pool sized by `probe_concurrency` with a
/// best-effort deadline: pairs picked up after the deadline are skipped, so
/// the result may be partial but never wrong. The per-type memo cache sits
/// behind a mutex; a miss under contention recomputes, trading redundant
/// work for correctness.
pub fn valid_edge_targets(
    ctx: &SolutionContext,
    candidates: &[(ResourceId, ResourceId)],
) -> Result<Vec<(ResourceId, ResourceId)>, OpsError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ctx.config().probe_concurrency)
        .build()
        .map_err(|e| OpsError::Config(e.to_string()))?;
    let deadline = Instant::now() + Duration::from_millis(ctx.config().probe_deadline_ms);
    let cache: Mutex<BTreeMap<(TypeRef, TypeRef), bool>> = Mutex::new(BTreeMap::new());

    let mut connectable: Vec<(ResourceId, ResourceId)> = pool.install(|| {
        candidates
            .par_iter()
            .filter_map(|(from, to)| {
                if Instant::now() >= deadline {
                    return None;
                }
                let key = (from.type_ref(), to.type_ref());
                if let Ok(memo) = cache.lock() {
                    if let Some(&hit) = memo.get(&key) {
                        return hit.then(|| (from.clone(), to.clone()));
                    }
                }
                let result = can_connect(ctx, from, to);
                if result.cacheable {
                    if let Ok(mut memo) = cache.lock() {
                        memo.insert(key, result.connectable);
                    }
                }
                result.connectable.then(|| (from.clone(), to.clone()))
            })
            .collect()
    });
    connectable.sort();
    Ok(connectable)
}

// =============================================================================
// TESTS
// =============================================================================
