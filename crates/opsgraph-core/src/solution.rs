//! # Solution Context
//!
//! The aggregate root of a solve: a pair of parallel graphs (Dataflow for
//! logical connectivity, Deployment for provisioning order), the append-only
//! decision log, the active constraints, and the abstract-to-concrete
//! mapping table for constructs.
//!
//! Mutations go through one of two views sharing semantics but differing in
//! side effects:
//! - the **raw view** touches both graphs and appends a decision record;
//! - the **operational view** additionally runs knowledge-base property
//!   rules over new resources, path selection for new logical edges, and
//!   operational rules for every realized edge.
//!
//! All mutation inside one context is strictly sequential.

use crate::config::EngineConfig;
use crate::constraints::{
    resolve_endpoint, ApplicationOperator, Constraint, ConstructMapping, EdgeOperator,
    ResourceOperator,
};
use crate::graph::Graph;
use crate::knowledge::{
    EdgeTemplate, KnowledgeBase, OperationalRule, RuleAction, RuleSubject, RuleValue,
};
use crate::properties::{map_leaves, PropertyPath};
use crate::types::{Decision, DecisionRecord, OpsError, PropertyRef, Resource, ResourceId, Value};
use crate::{paths, reconciler};
use std::sync::{Arc, Mutex};

// =============================================================================
// GRAPH PAIR
// =============================================================================

/// The Dataflow and Deployment graphs, mutated atomically.
///
/// Every dataflow edge has a deployment counterpart, direction possibly
/// reversed per the edge template. The dataflow graph is authoritative
/// during clone/replace; the deployment graph must stay acyclic and rejects
/// edges that would close a cycle (rolling the dataflow write back).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphPair {
    dataflow: Graph,
    deployment: Graph,
}

impl GraphPair {
    /// Create an empty pair.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The logical connectivity view. May contain cycles.
    #[must_use]
    pub fn dataflow(&self) -> &Graph {
        &self.dataflow
    }

    /// The provisioning-order view. Acyclic.
    #[must_use]
    pub fn deployment(&self) -> &Graph {
        &self.deployment
    }

    /// Add a resource to both graphs.
    pub fn add_resource(&mut self, resource: Resource) -> Result<(), OpsError> {
        self.dataflow.add_vertex(resource.clone())?;
        // The pair is kept in lockstep; the second insert cannot collide.
        let _ = self.deployment.add_vertex(resource);
        Ok(())
    }

    /// Remove a resource from both graphs, returning the dataflow copy.
    pub fn remove_resource(&mut self, id: &ResourceId) -> Result<Resource, OpsError> {
        let resource = self.dataflow.remove_vertex(id)?;
        let _ = self.deployment.remove_vertex(id);
        Ok(resource)
    }

    /// Add a dataflow edge and its deployment counterpart.
    ///
    /// `reversed` flips the deployment direction (dependency-style edges
    /// deploy target-first). Atomic: a deployment cycle rolls back the
    /// dataflow write and surfaces [`OpsError::DeploymentCycle`].
    pub fn add_edge(
        &mut self,
        from: &ResourceId,
        to: &ResourceId,
        reversed: bool,
        weight: i64,
    ) -> Result<(), OpsError> {
        self.dataflow.add_edge_weighted(from, to, weight)?;
        let (dep_from, dep_to) = if reversed { (to, from) } else { (from, to) };
        if self.deployment.would_create_cycle(dep_from, dep_to) {
            let _ = self.dataflow.remove_edge(from, to);
            return Err(OpsError::DeploymentCycle(from.clone(), to.clone()));
        }
        match self.deployment.add_edge_weighted(dep_from, dep_to, weight) {
            Ok(()) | Err(OpsError::EdgeExists(_, _)) => Ok(()),
            Err(e) => {
                let _ = self.dataflow.remove_edge(from, to);
                Err(e)
            }
        }
    }

    /// Remove a dataflow edge and its deployment counterpart.
    pub fn remove_edge(
        &mut self,
        from: &ResourceId,
        to: &ResourceId,
        reversed: bool,
    ) -> Result<(), OpsError> {
        self.dataflow.remove_edge(from, to)?;
        let (dep_from, dep_to) = if reversed { (to, from) } else { (from, to) };
        let _ = self.deployment.remove_edge(dep_from, dep_to);
        Ok(())
    }

    /// Mutable access to the dataflow graph's resources, for rule
    /// evaluation. Structural mutation goes through the pair's own methods.
    pub(crate) fn resource_mut(&mut self, id: &ResourceId) -> Option<&mut Resource> {
        self.dataflow.vertex_mut(id)
    }

    /// Propagate a dataflow resource's properties to its deployment twin.
    ///
    /// Called after rule evaluation; the dataflow copy is authoritative.
    pub(crate) fn sync_resource(&mut self, id: &ResourceId) {
        if let Some(updated) = self.dataflow.vertex(id).cloned() {
            if let Some(twin) = self.deployment.vertex_mut(id) {
                *twin = updated;
            }
        }
    }
}

// =============================================================================
// SOLUTION CONTEXT
// =============================================================================

/// The aggregate root of one solve.
pub struct SolutionContext {
    pub(crate) pair: GraphPair,
    pub(crate) kb: Arc<dyn KnowledgeBase>,
    pub(crate) config: EngineConfig,
    /// Append-only decision log, shared across clones.
    decisions: Arc<Mutex<Vec<DecisionRecord>>>,
    /// Operation stack for decision-record context.
    op_stack: Vec<String>,
    pub(crate) mapping: ConstructMapping,
    pub(crate) constraints: Vec<Constraint>,
}

impl SolutionContext {
    /// Create an empty context over the given knowledge base.
    pub fn new(kb: Arc<dyn KnowledgeBase>, config: EngineConfig) -> Result<Self, OpsError> {
        config.validate()?;
        Ok(Self {
            pair: GraphPair::new(),
            kb,
            config,
            decisions: Arc::new(Mutex::new(Vec::new())),
            op_stack: Vec::new(),
            mapping: ConstructMapping::new(),
            constraints: Vec::new(),
        })
    }

    /// Deep-copy both graphs; share the append-only decision log and the
    /// immutable knowledge base by reference.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self {
            pair: self.pair.clone(),
            kb: Arc::clone(&self.kb),
            config: self.config.clone(),
            decisions: Arc::clone(&self.decisions),
            op_stack: self.op_stack.clone(),
            mapping: self.mapping.clone(),
            constraints: self.constraints.clone(),
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// The logical connectivity graph.
    #[must_use]
    pub fn dataflow(&self) -> &Graph {
        self.pair.dataflow()
    }

    /// The provisioning-order graph.
    #[must_use]
    pub fn deployment(&self) -> &Graph {
        self.pair.deployment()
    }

    /// The knowledge base this context consumes.
    #[must_use]
    pub fn knowledge_base(&self) -> &dyn KnowledgeBase {
        self.kb.as_ref()
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The construct mapping table.
    #[must_use]
    pub fn mapping(&self) -> &ConstructMapping {
        &self.mapping
    }

    /// The constraints loaded into this context.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Snapshot of the decision log.
    #[must_use]
    pub fn decisions(&self) -> Vec<DecisionRecord> {
        self.decisions
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    // =========================================================================
    // DECISION LOG
    // =========================================================================

    /// Append a decision with the current context stack. Records are only
    /// written for operations that succeeded.
    pub(crate) fn record(&self, decision: Decision) {
        if let Ok(mut log) = self.decisions.lock() {
            log.push(DecisionRecord {
                context: self.op_stack.clone(),
                decision,
            });
        }
    }

    pub(crate) fn push_context(&mut self, name: &str) {
        self.op_stack.push(name.to_string());
    }

    pub(crate) fn pop_context(&mut self) {
        self.op_stack.pop();
    }

    // =========================================================================
    // VIEWS
    // =========================================================================

    /// The raw mutation view: no cascading behavior.
    pub fn raw(&mut self) -> RawView<'_> {
        RawView { ctx: self }
    }

    /// The operational mutation view: rule evaluation and path expansion.
    pub fn operational(&mut self) -> OperationalView<'_> {
        OperationalView { ctx: self }
    }

    // =========================================================================
    // LOADING
    // =========================================================================

    /// Load an initial graph through the raw view.
    ///
    /// Structural "already exists" errors are tolerated as no-ops so that
    /// re-loading the same document is idempotent; everything else aborts
    /// the context.
    pub fn load_graph(&mut self, graph: &Graph) -> Result<(), OpsError> {
        self.push_context("load_graph");
        let result = (|| {
            for resource in graph.vertices() {
                match self.raw().add_resource(resource.clone()) {
                    Ok(()) => {}
                    Err(e) if e.is_idempotent_noop() => {}
                    Err(e) => return Err(e),
                }
            }
            for (from, to) in graph.edges() {
                match self.raw().add_edge(from, to) {
                    Ok(()) => {}
                    Err(e) if e.is_idempotent_noop() => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        })();
        self.pop_context();
        result
    }

    /// Register constraints for verification without applying them.
    pub fn load_constraints(&mut self, constraints: Vec<Constraint>) {
        self.constraints.extend(constraints);
    }

    // =========================================================================
    // CONSTRAINT APPLICATION
    // =========================================================================

    /// Apply constraints through the operational view, in fixed order:
    /// Application (with Resource edits), then Construct bindings, then
    /// Edge constraints — Edge constraints may reference resources an
    /// Application constraint just created.
    ///
    /// Failures of independent constraints are aggregated into one combined
    /// error; decisions are recorded only for the operations that succeeded.
    pub fn apply_constraints(&mut self, constraints: Vec<Constraint>) -> Result<(), OpsError> {
        for constraint in &constraints {
            constraint.validate()?;
        }
        self.constraints.extend(constraints.iter().cloned());

        self.push_context("apply_constraints");
        let mut errors = Vec::new();

        let phases: [fn(&Constraint) -> bool; 4] = [
            |c| matches!(c, Constraint::Application { .. }),
            |c| matches!(c, Constraint::Resource { .. }),
            |c| matches!(c, Constraint::Construct { .. }),
            |c| matches!(c, Constraint::Edge { .. }),
        ];
        for phase in phases {
            for constraint in constraints.iter().filter(|c| phase(c)) {
                if let Err(e) = self.apply_constraint(constraint) {
                    errors.push(e);
                }
            }
        }

        self.pop_context();
        OpsError::aggregate(errors)
    }

    fn apply_constraint(&mut self, constraint: &Constraint) -> Result<(), OpsError> {
        match constraint {
            Constraint::Application {
                operator,
                node,
                replacement_node,
            } => match operator {
                ApplicationOperator::Add => {
                    match self.operational().add_resource(Resource::new(node.clone())) {
                        Ok(()) => Ok(()),
                        Err(e) if e.is_idempotent_noop() => Ok(()),
                        Err(e) => Err(e),
                    }
                }
                ApplicationOperator::Remove => {
                    if self.pair.dataflow().contains_vertex(node) {
                        reconciler::remove_resource(self, node, true).map(|_| ())
                    } else {
                        Ok(())
                    }
                }
                ApplicationOperator::Replace => {
                    let replacement = replacement_node.as_ref().ok_or_else(|| {
                        OpsError::ConstraintValidation(format!(
                            "replace constraint on {node} needs a replacement_node"
                        ))
                    })?;
                    self.rename_resource(node, replacement)
                }
            },
            Constraint::Resource {
                operator,
                target,
                property,
                value,
            } => self.apply_resource_edit(*operator, target, property, value),
            Constraint::Construct { target, node, .. } => {
                self.mapping
                    .entry(target.clone())
                    .or_default()
                    .insert(node.clone());
                if !self.pair.dataflow().contains_vertex(node) {
                    match self.operational().add_resource(Resource::new(node.clone())) {
                        Ok(()) => {}
                        Err(e) if e.is_idempotent_noop() => {}
                        Err(e) => return Err(e),
                    }
                }
                Ok(())
            }
            Constraint::Edge {
                operator, target, ..
            } => {
                let sources = resolve_endpoint(&target.source, &self.mapping);
                let targets = resolve_endpoint(&target.target, &self.mapping);
                let mut errors = Vec::new();
                for source in &sources {
                    for end in &targets {
                        let result = match operator {
                            EdgeOperator::MustExist | EdgeOperator::MustContain => {
                                self.operational().add_edge(source, end).map(|_| ())
                            }
                            EdgeOperator::MustNotExist => {
                                reconciler::remove_path(self, source, end)
                            }
                            // Pure filter: it shapes path selection for the
                            // pair's MustExist and gets re-checked at verify
                            // time, but triggers no mutation of its own.
                            EdgeOperator::MustNotContain => Ok(()),
                        };
                        if let Err(e) = result {
                            errors.push(e);
                        }
                    }
                }
                OpsError::aggregate(errors)
            }
        }
    }

    fn apply_resource_edit(
        &mut self,
        operator: ResourceOperator,
        target: &ResourceId,
        property: &str,
        value: &Value,
    ) -> Result<(), OpsError> {
        let path = PropertyPath::parse(property)?;
        let coerced = self.kb.coerce(value);
        let resource = self
            .pair
            .resource_mut(target)
            .ok_or_else(|| OpsError::VertexNotFound(target.clone()))?;
        match operator {
            ResourceOperator::Equals => path.set(&mut resource.properties, coerced)?,
            ResourceOperator::Add => path.append(&mut resource.properties, coerced)?,
            ResourceOperator::Remove => path.remove(&mut resource.properties, Some(&coerced))?,
        }
        self.pair.sync_resource(target);
        self.record(Decision::SetProperty(target.clone(), property.to_string()));
        Ok(())
    }

    /// Verify loaded constraints against the current graph, returning the
    /// unsatisfied ones.
    #[must_use]
    pub fn unsatisfied_constraints(&self) -> Vec<&Constraint> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied(self.pair.dataflow(), self.kb.as_ref(), &self.mapping))
            .collect()
    }

    // =========================================================================
    // ID REWRITE
    // =========================================================================

    /// Rename a resource, atomically rewriting every reference to it across
    /// the whole graph: vertex keys in both graphs, incident edges, property
    /// references in every bag, and the construct mapping table.
    pub fn rename_resource(
        &mut self,
        old: &ResourceId,
        new: &ResourceId,
    ) -> Result<(), OpsError> {
        if self.pair.dataflow().contains_vertex(new) {
            return Err(OpsError::VertexExists(new.clone()));
        }

        // Re-attaching under the new id can fail partway, e.g. when the new
        // type's edge templates reverse deployment direction into a cycle.
        // Roll the whole pair back so the rename stays all-or-nothing.
        let snapshot = self.pair.clone();
        if let Err(e) = self.rewire_vertex(old, new) {
            self.pair = snapshot;
            return Err(e);
        }

        // Rewrite references in every property bag of both graphs.
        let ids: Vec<ResourceId> = self.pair.dataflow().vertex_ids().cloned().collect();
        let old_text = old.to_string();
        for id in ids {
            if let Some(resource) = self.pair.resource_mut(&id) {
                map_leaves(&mut resource.properties, &mut |leaf| {
                    rewrite_leaf(leaf, old, new, &old_text);
                });
            }
            self.pair.sync_resource(&id);
        }

        // The mapping table follows the rename on both sides.
        if let Some(concrete) = self.mapping.remove(old) {
            self.mapping.insert(new.clone(), concrete);
        }
        for concrete in self.mapping.values_mut() {
            if concrete.remove(old) {
                concrete.insert(new.clone());
            }
        }

        self.record(Decision::RenameResource(old.clone(), new.clone()));
        Ok(())
    }

    /// Move a vertex and its incident edges from `old` to `new` in both
    /// graphs. On error the pair is left partially rewired; the caller
    /// restores from a snapshot.
    fn rewire_vertex(&mut self, old: &ResourceId, new: &ResourceId) -> Result<(), OpsError> {
        let dataflow_out = self.pair.dataflow().downstream(old);
        let dataflow_in = self.pair.dataflow().upstream(old);
        let weights: Vec<(ResourceId, i64)> = dataflow_out
            .iter()
            .map(|to| (to.clone(), self.pair.dataflow().edge_weight(old, to).unwrap_or(1)))
            .collect();
        let in_weights: Vec<(ResourceId, i64)> = dataflow_in
            .iter()
            .map(|from| (from.clone(), self.pair.dataflow().edge_weight(from, old).unwrap_or(1)))
            .collect();

        // Detach the old vertex, re-attach under the new id.
        let mut resource = self.pair.remove_resource(old)?;
        resource.id = new.clone();
        self.pair.add_resource(resource)?;

        for (to, weight) in weights {
            let reversed = self.edge_reversed(new, &to);
            let to = if &to == old { new.clone() } else { to };
            self.pair.add_edge(new, &to, reversed, weight)?;
        }
        for (from, weight) in in_weights {
            if &from == old {
                continue; // self-loop, already re-added above
            }
            let reversed = self.edge_reversed(&from, new);
            self.pair.add_edge(&from, new, reversed, weight)?;
        }
        Ok(())
    }

    /// Resolve a lazy property reference against the current dataflow graph.
    #[must_use]
    pub fn resolve_property_ref(&self, prop_ref: &PropertyRef) -> Option<Value> {
        let resource = self.pair.dataflow().vertex(&prop_ref.resource)?;
        let path = PropertyPath::parse(&prop_ref.path).ok()?;
        path.get(&resource.properties).cloned()
    }

    /// The deployment-order-reversed flag for a concrete edge, defaulting to
    /// false when the knowledge base has no template for the pair.
    pub(crate) fn edge_reversed(&self, from: &ResourceId, to: &ResourceId) -> bool {
        self.kb
            .edge_template(&from.type_ref(), &to.type_ref())
            .map(|t| t.deployment_order_reversed)
            .unwrap_or(false)
    }

    pub(crate) fn edge_template_or_default(
        &self,
        from: &ResourceId,
        to: &ResourceId,
    ) -> EdgeTemplate {
        self.kb
            .edge_template(&from.type_ref(), &to.type_ref())
            .unwrap_or_default()
    }
}

fn rewrite_leaf(leaf: &mut Value, old: &ResourceId, new: &ResourceId, old_text: &str) {
    match leaf {
        Value::Ref(id) if id == old => *id = new.clone(),
        Value::PropRef(r) if r.resource == *old => r.resource = new.clone(),
        Value::String(s) if s == old_text => *s = new.to_string(),
        _ => {}
    }
}

// =============================================================================
// RAW VIEW
// =============================================================================

/// Mutations that touch both graphs and append a decision record, with no
/// cascading behavior.
pub struct RawView<'a> {
    ctx: &'a mut SolutionContext,
}

impl RawView<'_> {
    /// Add a resource to both graphs.
    pub fn add_resource(&mut self, resource: Resource) -> Result<(), OpsError> {
        let id = resource.id.clone();
        self.ctx.pair.add_resource(resource)?;
        self.ctx.record(Decision::AddResource(id));
        Ok(())
    }

    /// Add a dataflow edge and its deployment counterpart. No path
    /// selection runs; the edge is taken as-is.
    pub fn add_edge(&mut self, from: &ResourceId, to: &ResourceId) -> Result<(), OpsError> {
        let template = self.ctx.edge_template_or_default(from, to);
        self.ctx
            .pair
            .add_edge(from, to, template.deployment_order_reversed, template.weight)?;
        self.ctx.record(Decision::AddEdge(from.clone(), to.clone()));
        Ok(())
    }

    /// Remove a resource from both graphs. No cascade.
    pub fn remove_resource(&mut self, id: &ResourceId) -> Result<Resource, OpsError> {
        let resource = self.ctx.pair.remove_resource(id)?;
        self.ctx.record(Decision::RemoveResource(id.clone()));
        Ok(resource)
    }

    /// Remove a dataflow edge and its deployment counterpart.
    pub fn remove_edge(&mut self, from: &ResourceId, to: &ResourceId) -> Result<(), OpsError> {
        let reversed = self.ctx.edge_reversed(from, to);
        self.ctx.pair.remove_edge(from, to, reversed)?;
        self.ctx
            .record(Decision::RemoveEdge(from.clone(), to.clone()));
        Ok(())
    }
}

// =============================================================================
// OPERATIONAL VIEW
// =============================================================================

/// Raw-view mutations plus knowledge-base side effects: property rules for
/// new resources, path selection for new logical edges, operational rules
/// for every realized edge.
pub struct OperationalView<'a> {
    ctx: &'a mut SolutionContext,
}

impl OperationalView<'_> {
    /// Add a resource and run its template's property rules, filling
    /// defaults recursively. Unknown types are fatal.
    pub fn add_resource(&mut self, resource: Resource) -> Result<(), OpsError> {
        let template = self.ctx.kb.resource_template(&resource.id.type_ref())?;
        let id = resource.id.clone();
        self.ctx.pair.add_resource(resource)?;
        self.ctx.record(Decision::AddResource(id.clone()));
        self.make_operational(&id, &template.properties)
    }

    /// Run declared property rules over an existing resource.
    fn make_operational(
        &mut self,
        id: &ResourceId,
        rules: &[crate::knowledge::PropertyRule],
    ) -> Result<(), OpsError> {
        for rule in rules {
            let path = PropertyPath::parse(&rule.path)?;
            let Some(resource) = self.ctx.pair.resource_mut(id) else {
                return Err(OpsError::VertexNotFound(id.clone()));
            };
            if path.get(&resource.properties).is_none() {
                if let Some(default) = &rule.default {
                    let coerced = crate::knowledge::coerce_value(default);
                    path.set(&mut resource.properties, coerced)?;
                } else if rule.required {
                    return Err(OpsError::ConstraintValidation(format!(
                        "required property {} missing on {id}",
                        rule.path
                    )));
                }
            }
        }
        self.ctx.pair.sync_resource(id);
        Ok(())
    }

    /// Add a logical edge, running path selection and expansion.
    ///
    /// Returns the realized dataflow path (two ids for a direct edge, more
    /// when intermediates were inserted).
    pub fn add_edge(
        &mut self,
        from: &ResourceId,
        to: &ResourceId,
    ) -> Result<Vec<ResourceId>, OpsError> {
        paths::expand_edge(self.ctx, from, to)
    }

    /// Remove a resource through the reconciler (explicit removal).
    pub fn remove_resource(
        &mut self,
        id: &ResourceId,
    ) -> Result<reconciler::RemovalOutcome, OpsError> {
        reconciler::remove_resource(self.ctx, id, true)
    }

    /// Run an edge template's operational rules for a realized edge.
    pub(crate) fn run_operational_rules(
        &mut self,
        from: &ResourceId,
        to: &ResourceId,
        rules: &[OperationalRule],
    ) -> Result<(), OpsError> {
        for rule in rules {
            let subject = match rule.subject {
                RuleSubject::Source => from.clone(),
                RuleSubject::Target => to.clone(),
            };
            let value = match &rule.value {
                RuleValue::Literal(v) => self.ctx.kb.coerce(v),
                RuleValue::IdOf(RuleSubject::Source) => Value::Ref(from.clone()),
                RuleValue::IdOf(RuleSubject::Target) => Value::Ref(to.clone()),
                RuleValue::PropertyOf { subject, path } => {
                    let of = match subject {
                        RuleSubject::Source => from.clone(),
                        RuleSubject::Target => to.clone(),
                    };
                    Value::PropRef(PropertyRef::new(of, path.clone()))
                }
            };
            let path = PropertyPath::parse(&rule.path)?;
            let resource = self
                .ctx
                .pair
                .resource_mut(&subject)
                .ok_or_else(|| OpsError::VertexNotFound(subject.clone()))?;
            match rule.action {
                RuleAction::Set => path.set(&mut resource.properties, value)?,
                RuleAction::Append => {
                    // Appending the same value twice is a no-op; keeps edge
                    // rule evaluation idempotent.
                    let already = path
                        .get(&resource.properties)
                        .and_then(Value::as_array)
                        .is_some_and(|items| items.contains(&value));
                    if !already {
                        path.append(&mut resource.properties, value)?;
                    }
                }
            }
            self.ctx.pair.sync_resource(&subject);
            self.ctx
                .record(Decision::SetProperty(subject, rule.path.clone()));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{
        CatalogKnowledgeBase, Classification, EdgeTemplate, Functionality, PropertyRule,
        ResourceTemplate,
    };
    use crate::types::TypeRef;

    fn id(s: &str) -> ResourceId {
        s.parse().expect("id")
    }

    fn t(s: &str) -> TypeRef {
        s.parse().expect("type")
    }

    fn basic_kb() -> Arc<CatalogKnowledgeBase> {
        Arc::new(
            CatalogKnowledgeBase::new()
                .with_resource(
                    t("p:t"),
                    ResourceTemplate {
                        classification: Classification::of(&["compute"]),
                        functionality: Functionality::Compute,
                        ..ResourceTemplate::default()
                    },
                )
                .with_edge(t("p:t"), t("p:t"), EdgeTemplate::default()),
        )
    }

    fn ctx(kb: Arc<CatalogKnowledgeBase>) -> SolutionContext {
        SolutionContext::new(kb, EngineConfig::default()).expect("context")
    }

    #[test]
    fn pair_mirrors_edges_into_deployment() {
        let mut pair = GraphPair::new();
        pair.add_resource(Resource::new(id("p:t:a"))).expect("add");
        pair.add_resource(Resource::new(id("p:t:b"))).expect("add");
        pair.add_edge(&id("p:t:a"), &id("p:t:b"), false, 1).expect("edge");

        assert!(pair.dataflow().contains_edge(&id("p:t:a"), &id("p:t:b")));
        assert!(pair.deployment().contains_edge(&id("p:t:a"), &id("p:t:b")));
    }

    #[test]
    fn pair_reverses_deployment_direction_when_flagged() {
        let mut pair = GraphPair::new();
        pair.add_resource(Resource::new(id("p:t:a"))).expect("add");
        pair.add_resource(Resource::new(id("p:t:b"))).expect("add");
        pair.add_edge(&id("p:t:a"), &id("p:t:b"), true, 1).expect("edge");

        assert!(pair.dataflow().contains_edge(&id("p:t:a"), &id("p:t:b")));
        assert!(pair.deployment().contains_edge(&id("p:t:b"), &id("p:t:a")));
        assert!(!pair.deployment().contains_edge(&id("p:t:a"), &id("p:t:b")));
    }

    #[test]
    fn pair_rejects_deployment_cycle_atomically() {
        let mut pair = GraphPair::new();
        for v in ["p:t:a", "p:t:b"] {
            pair.add_resource(Resource::new(id(v))).expect("add");
        }
        pair.add_edge(&id("p:t:a"), &id("p:t:b"), false, 1).expect("edge");
        let result = pair.add_edge(&id("p:t:b"), &id("p:t:a"), false, 1);
        assert!(matches!(result, Err(OpsError::DeploymentCycle(_, _))));
        // The dataflow write was rolled back.
        assert!(!pair.dataflow().contains_edge(&id("p:t:b"), &id("p:t:a")));
    }

    #[test]
    fn dataflow_cycle_allowed_when_deployment_reversed() {
        // a->b plain plus b->a reversed: deployment sees a->b twice-ish,
        // dataflow carries the cycle.
        let mut pair = GraphPair::new();
        for v in ["p:t:a", "p:t:b"] {
            pair.add_resource(Resource::new(id(v))).expect("add");
        }
        pair.add_edge(&id("p:t:a"), &id("p:t:b"), false, 1).expect("edge");
        pair.add_edge(&id("p:t:b"), &id("p:t:a"), true, 1).expect("edge");
        assert!(pair.dataflow().contains_edge(&id("p:t:b"), &id("p:t:a")));
    }

    #[test]
    fn raw_view_records_decisions() {
        let mut ctx = ctx(basic_kb());
        ctx.raw().add_resource(Resource::new(id("p:t:a"))).expect("add");
        ctx.raw().add_resource(Resource::new(id("p:t:b"))).expect("add");
        ctx.raw().add_edge(&id("p:t:a"), &id("p:t:b")).expect("edge");

        let decisions = ctx.decisions();
        assert_eq!(decisions.len(), 3);
        assert_eq!(
            decisions[2].decision,
            Decision::AddEdge(id("p:t:a"), id("p:t:b"))
        );
    }

    #[test]
    fn operational_add_fills_property_defaults() {
        let kb = Arc::new(
            CatalogKnowledgeBase::new().with_resource(
                t("p:t"),
                ResourceTemplate {
                    properties: vec![PropertyRule {
                        path: "MemorySize".to_string(),
                        default: Some(Value::Int(512)),
                        required: false,
                    }],
                    ..ResourceTemplate::default()
                },
            ),
        );
        let mut ctx = ctx(kb);
        ctx.operational()
            .add_resource(Resource::new(id("p:t:a")))
            .expect("add");

        let resource = ctx.dataflow().vertex(&id("p:t:a")).expect("vertex");
        assert_eq!(
            resource.properties.get("MemorySize"),
            Some(&Value::Int(512))
        );
    }

    #[test]
    fn operational_add_unknown_type_is_fatal() {
        let mut ctx = ctx(basic_kb());
        let result = ctx.operational().add_resource(Resource::new(id("p:unknown:a")));
        assert!(matches!(result, Err(OpsError::TemplateNotFound(_))));
    }

    #[test]
    fn rename_rewrites_edges_and_references() {
        let mut ctx = ctx(basic_kb());
        ctx.raw().add_resource(Resource::new(id("p:t:a"))).expect("add");
        ctx.raw().add_resource(Resource::new(id("p:t:b"))).expect("add");
        ctx.raw().add_edge(&id("p:t:a"), &id("p:t:b")).expect("edge");

        // b carries a typed reference to a.
        if let Some(b) = ctx.pair.resource_mut(&id("p:t:b")) {
            b.properties
                .insert("Target".to_string(), Value::Ref(id("p:t:a")));
        }

        ctx.rename_resource(&id("p:t:a"), &id("p:t:renamed")).expect("rename");

        assert!(!ctx.dataflow().contains_vertex(&id("p:t:a")));
        assert!(ctx.dataflow().contains_vertex(&id("p:t:renamed")));
        assert!(ctx
            .dataflow()
            .contains_edge(&id("p:t:renamed"), &id("p:t:b")));
        let b = ctx.dataflow().vertex(&id("p:t:b")).expect("vertex");
        assert_eq!(
            b.properties.get("Target"),
            Some(&Value::Ref(id("p:t:renamed")))
        );
    }

    #[test]
    fn failed_rename_rolls_the_graph_back() {
        // Triangle w:a -> y:m -> v:b -> w:a, acyclic in deployment because
        // the (w, y) template reverses deployment order. The replacement
        // type's templates do not reverse, so re-attaching would close a
        // deployment cycle partway through the rewire.
        let kb = Arc::new(
            CatalogKnowledgeBase::new()
                .with_resource(t("p:w"), ResourceTemplate::default())
                .with_resource(t("p:y"), ResourceTemplate::default())
                .with_resource(t("p:z"), ResourceTemplate::default())
                .with_resource(t("p:v"), ResourceTemplate::default())
                .with_edge(
                    t("p:w"),
                    t("p:y"),
                    EdgeTemplate {
                        deployment_order_reversed: true,
                        ..EdgeTemplate::default()
                    },
                )
                .with_edge(t("p:y"), t("p:v"), EdgeTemplate::default())
                .with_edge(t("p:v"), t("p:w"), EdgeTemplate::default())
                .with_edge(t("p:w"), t("p:z"), EdgeTemplate::default())
                .with_edge(t("p:z"), t("p:v"), EdgeTemplate::default()),
        );
        let mut ctx = ctx(kb);
        for v in ["p:w:a", "p:y:m", "p:v:b"] {
            ctx.raw().add_resource(Resource::new(id(v))).expect("add");
        }
        ctx.raw().add_edge(&id("p:w:a"), &id("p:y:m")).expect("edge");
        ctx.raw().add_edge(&id("p:y:m"), &id("p:v:b")).expect("edge");
        ctx.raw().add_edge(&id("p:v:b"), &id("p:w:a")).expect("edge");

        let result = ctx.rename_resource(&id("p:y:m"), &id("p:z:m"));
        assert!(matches!(result, Err(OpsError::DeploymentCycle(_, _))));

        // All-or-nothing: the old vertex and every edge survive unchanged.
        assert!(ctx.dataflow().contains_vertex(&id("p:y:m")));
        assert!(!ctx.dataflow().contains_vertex(&id("p:z:m")));
        assert!(ctx.dataflow().contains_edge(&id("p:w:a"), &id("p:y:m")));
        assert!(ctx.dataflow().contains_edge(&id("p:y:m"), &id("p:v:b")));
        assert!(ctx.deployment().contains_edge(&id("p:y:m"), &id("p:w:a")));
    }

    #[test]
    fn clone_shares_decision_log() {
        let mut ctx = ctx(basic_kb());
        let cloned = ctx.deep_clone();
        ctx.raw().add_resource(Resource::new(id("p:t:a"))).expect("add");
        // The clone observes the original's decisions (shared log).
        assert_eq!(cloned.decisions().len(), 1);
        // But not its graph (deep copy).
        assert!(!cloned.dataflow().contains_vertex(&id("p:t:a")));
    }

    #[test]
    fn apply_application_add_constraint() {
        let mut ctx = ctx(basic_kb());
        ctx.apply_constraints(vec![Constraint::Application {
            operator: ApplicationOperator::Add,
            node: id("p:t:a"),
            replacement_node: None,
        }])
        .expect("apply");

        assert!(ctx.dataflow().contains_vertex(&id("p:t:a")));
        assert!(ctx.unsatisfied_constraints().is_empty());
    }

    #[test]
    fn apply_aggregates_independent_failures() {
        let mut ctx = ctx(basic_kb());
        let result = ctx.apply_constraints(vec![
            Constraint::Application {
                operator: ApplicationOperator::Add,
                node: id("p:unknown:a"),
                replacement_node: None,
            },
            Constraint::Application {
                operator: ApplicationOperator::Add,
                node: id("p:unknown2:b"),
                replacement_node: None,
            },
        ]);
        assert!(matches!(result, Err(OpsError::Aggregate(errs)) if errs.len() == 2));
    }

    #[test]
    fn resolve_property_ref_reads_live_graph() {
        let mut ctx = ctx(basic_kb());
        let mut resource = Resource::new(id("p:t:a"));
        resource.properties.insert("Arn".to_string(), Value::from("arn123"));
        ctx.raw().add_resource(resource).expect("add");

        let value = ctx.resolve_property_ref(&PropertyRef::new(id("p:t:a"), "Arn"));
        assert_eq!(value, Some(Value::from("arn123")));
    }
}
