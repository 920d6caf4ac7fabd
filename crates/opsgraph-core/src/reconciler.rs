//! # Reconciler
//!
//! Cascading removal of resources and paths. Removal is criteria-driven:
//! each resource type declares whether it may disappear while upstream or
//! downstream neighbors remain, and each edge template may flag a blocking
//! neighbor as deletion-dependent, meaning the neighbor's lifetime is tied
//! to the edge and it goes away with it.
//!
//! A removal that cannot proceed is not an error. It returns
//! [`RemovalOutcome::Blocked`] with the remaining dependency count. The
//! requested resource stays put, though a deletion-dependent bypass may
//! already have cascaded away some of its blockers before the re-check
//! found the rest still standing.

use crate::knowledge::DeletionCriteria;
use crate::solution::SolutionContext;
use crate::types::{OpsError, Resource, ResourceId};
use std::collections::BTreeSet;

// =============================================================================
// OUTCOME
// =============================================================================

/// What one removal request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The resource left both graphs, along with everything it cascaded to.
    Removed {
        /// The removed resource.
        resource: Resource,
        /// Ids removed by the cascade, in removal order.
        cascaded: Vec<ResourceId>,
    },
    /// The resource stayed. When no bypass applied, nothing was mutated;
    /// when a deletion-dependent bypass ran first, removable blockers are
    /// already gone and only the remaining ones are counted.
    Blocked {
        /// How many blocking dependencies remain.
        remaining: usize,
    },
}

impl RemovalOutcome {
    /// True when the requested resource was actually removed.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }
}

// =============================================================================
// RESOURCE REMOVAL
// =============================================================================

/// Remove a resource, honoring its deletion criteria and cascading to
/// dependents.
///
/// `explicit` marks a removal the caller asked for by name; it proceeds to
/// the criteria checks regardless of the resource's functionality. A
/// non-explicit (cascade) removal of a functional resource goes through
/// only once nothing connects to it any more.
pub fn remove_resource(
    ctx: &mut SolutionContext,
    id: &ResourceId,
    explicit: bool,
) -> Result<RemovalOutcome, OpsError> {
    let Some(snapshot) = ctx.dataflow().vertex(id).cloned() else {
        return Err(OpsError::VertexNotFound(id.clone()));
    };
    // Resources loaded without a catalog entry delete as plain glue.
    let template = ctx
        .knowledge_base()
        .resource_template(&id.type_ref())
        .unwrap_or_default();

    let upstream = ctx.dataflow().upstream(id);
    let downstream = ctx.dataflow().downstream(id);

    if !explicit && template.functionality.is_functional() {
        let remaining = upstream.len().saturating_add(downstream.len());
        if remaining > 0 {
            return Ok(RemovalOutcome::Blocked { remaining });
        }
    }

    let mut cascaded = Vec::new();
    let blockers = blocking_neighbors(template.deletion_criteria, &upstream, &downstream);
    if !blockers.is_empty() {
        // Bypass only when every blocking edge is deletion-dependent.
        let all_dependent = blockers.iter().all(|b| match b {
            Blocker::Upstream(n) => ctx.edge_template_or_default(n, id).deletion_dependent,
            Blocker::Downstream(n) => ctx.edge_template_or_default(id, n).deletion_dependent,
        });
        if all_dependent {
            for blocker in &blockers {
                let neighbor = blocker.id();
                if !ctx.dataflow().contains_vertex(neighbor) {
                    continue;
                }
                if let RemovalOutcome::Removed {
                    resource,
                    cascaded: nested,
                } = remove_resource(ctx, neighbor, false)?
                {
                    cascaded.push(resource.id);
                    cascaded.extend(nested);
                }
            }
        }
        // The cascade's own dangling cleanup may already have taken the
        // resource out.
        if !ctx.dataflow().contains_vertex(id) {
            cascaded.retain(|c| c != id);
            return Ok(RemovalOutcome::Removed {
                resource: snapshot,
                cascaded,
            });
        }
        // Re-check once the full pass is done; a partial cascade may still
        // leave blockers behind.
        let upstream = ctx.dataflow().upstream(id);
        let downstream = ctx.dataflow().downstream(id);
        let remaining =
            blocking_neighbors(template.deletion_criteria, &upstream, &downstream).len();
        if remaining > 0 {
            return Ok(RemovalOutcome::Blocked { remaining });
        }
    }

    // Pass-through removal preserves connectivity between the functional
    // neighbors on either side.
    let upstream = ctx.dataflow().upstream(id);
    let downstream = ctx.dataflow().downstream(id);
    for from in functional_only(ctx, &upstream) {
        for to in functional_only(ctx, &downstream) {
            if from == to || ctx.dataflow().contains_edge(&from, &to) {
                continue;
            }
            ctx.raw().add_edge(&from, &to)?;
        }
    }

    for from in &upstream {
        ctx.raw().remove_edge(from, id)?;
    }
    for to in &downstream {
        if to != id {
            ctx.raw().remove_edge(id, to)?;
        }
    }
    let resource = ctx.raw().remove_resource(id)?;

    // Children namespaced under the removed resource go with it.
    let children: Vec<ResourceId> = ctx
        .dataflow()
        .vertex_ids()
        .filter(|v| v.provider == id.provider && v.namespace == id.name)
        .cloned()
        .collect();
    for child in children {
        if let RemovalOutcome::Removed {
            resource: removed,
            cascaded: nested,
        } = remove_resource(ctx, &child, false)?
        {
            cascaded.push(removed.id);
            cascaded.extend(nested);
        }
    }

    // Former neighbors left without any edge are dangling glue.
    for neighbor in upstream.iter().chain(downstream.iter()) {
        if neighbor == id || !ctx.dataflow().contains_vertex(neighbor) {
            continue;
        }
        if ctx.dataflow().upstream(neighbor).is_empty()
            && ctx.dataflow().downstream(neighbor).is_empty()
        {
            if let RemovalOutcome::Removed {
                resource: removed,
                cascaded: nested,
            } = remove_resource(ctx, neighbor, false)?
            {
                cascaded.push(removed.id);
                cascaded.extend(nested);
            }
        }
    }

    Ok(RemovalOutcome::Removed { resource, cascaded })
}

/// One neighbor standing in the way of a removal.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Blocker {
    Upstream(ResourceId),
    Downstream(ResourceId),
}

impl Blocker {
    fn id(&self) -> &ResourceId {
        match self {
            Self::Upstream(id) | Self::Downstream(id) => id,
        }
    }
}

fn blocking_neighbors(
    criteria: DeletionCriteria,
    upstream: &[ResourceId],
    downstream: &[ResourceId],
) -> Vec<Blocker> {
    let mut blockers = Vec::new();
    let (check_up, check_down) = match criteria {
        DeletionCriteria::None => (false, false),
        DeletionCriteria::RequiresNoUpstream => (true, false),
        DeletionCriteria::RequiresNoDownstream => (false, true),
        DeletionCriteria::RequiresNoUpstreamOrDownstream => (true, true),
    };
    if check_up {
        blockers.extend(upstream.iter().cloned().map(Blocker::Upstream));
    }
    if check_down {
        blockers.extend(downstream.iter().cloned().map(Blocker::Downstream));
    }
    blockers
}

fn functional_only(ctx: &SolutionContext, ids: &[ResourceId]) -> Vec<ResourceId> {
    ids.iter()
        .filter(|n| {
            ctx.knowledge_base()
                .resource_template(&n.type_ref())
                .map(|t| t.functionality.is_functional())
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

// =============================================================================
// PATH REMOVAL
// =============================================================================

/// Remove every dataflow path `source -> ... -> target`, sparing edges that
/// other flows still need.
///
/// An edge on a candidate path is protected when its head still receives
/// traffic from outside the candidate set, or when the same segment lies on
/// a route the knowledge base declares for another resource reaching the
/// target. Intermediates stranded by the edge removals are cleaned up
/// non-explicitly.
pub fn remove_path(
    ctx: &mut SolutionContext,
    source: &ResourceId,
    target: &ResourceId,
) -> Result<(), OpsError> {
    let paths = ctx.dataflow().all_simple_paths(source, target);
    if paths.is_empty() {
        return Ok(());
    }
    let candidates: BTreeSet<ResourceId> = paths.iter().flatten().cloned().collect();

    let mut removable: BTreeSet<(ResourceId, ResourceId)> = BTreeSet::new();
    for path in &paths {
        for pair in path.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            if !edge_protected(ctx, from, to, &candidates, target) {
                removable.insert((from.clone(), to.clone()));
            }
        }
    }
    for (from, to) in removable {
        if ctx.dataflow().contains_edge(&from, &to) {
            ctx.raw().remove_edge(&from, &to)?;
        }
    }

    // Stranded intermediates go away with the path.
    for id in &candidates {
        if id == source || id == target || !ctx.dataflow().contains_vertex(id) {
            continue;
        }
        if ctx.dataflow().upstream(id).is_empty() && ctx.dataflow().downstream(id).is_empty() {
            let _ = remove_resource(ctx, id, false)?;
        }
    }
    Ok(())
}

fn edge_protected(
    ctx: &SolutionContext,
    from: &ResourceId,
    to: &ResourceId,
    candidates: &BTreeSet<ResourceId>,
    target: &ResourceId,
) -> bool {
    // An external feed into the tail means another flow still crosses this
    // segment on its way to the target.
    if ctx
        .dataflow()
        .upstream(from)
        .iter()
        .any(|u| !candidates.contains(u))
    {
        return true;
    }
    // The segment carries a declared route from some outside resource to the
    // same target.
    let outside: Vec<ResourceId> = ctx
        .dataflow()
        .vertex_ids()
        .filter(|v| !candidates.contains(v))
        .cloned()
        .collect();
    for other in outside {
        if ctx
            .knowledge_base()
            .path_satisfactions(&other.type_ref(), &target.type_ref())
            .is_empty()
        {
            continue;
        }
        let routes = ctx.dataflow().all_simple_paths(&other, target);
        if routes.iter().any(|route| {
            route
                .windows(2)
                .any(|pair| &pair[0] == from && &pair[1] == to)
        }) {
            return true;
        }
    }
    false
}

// =============================================================================
// TESTS
// =============================================================================
