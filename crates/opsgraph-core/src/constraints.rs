//! # Constraint Model
//!
//! User-supplied constraints in four scopes — application, edge, resource
//! and construct — loaded from a tagged list where the `scope` discriminator
//! selects the variant at parse time.
//!
//! Every constraint exposes `validate()` (required-field checks per
//! operator) and `is_satisfied(...)` (a point-in-time re-check against
//! current graph state, used for verification, never for driving the
//! solve).

use crate::graph::Graph;
use crate::knowledge::KnowledgeBase;
use crate::properties::PropertyPath;
use crate::types::{OpsError, PropertyBag, ResourceId, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The abstract-to-concrete resource mapping table for constructs.
///
/// Keys are abstract (construct) ids; values are the concrete resources the
/// construct expanded into.
pub type ConstructMapping = BTreeMap<ResourceId, BTreeSet<ResourceId>>;

// =============================================================================
// OPERATORS
// =============================================================================

/// Application-scope operators: resource lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationOperator {
    /// The resource must exist; it is created when absent.
    Add,
    /// The resource must not exist; it is removed when present.
    Remove,
    /// The resource is replaced by another, references rewritten.
    Replace,
}

/// Edge-scope operators: connectivity requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOperator {
    /// A path between the endpoints must exist.
    MustExist,
    /// No path between the endpoints may exist.
    MustNotExist,
    /// Some path between the endpoints must contain the given node.
    MustContain,
    /// No path between the endpoints may contain the given node.
    MustNotContain,
}

/// Resource-scope operators: single-property edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceOperator {
    /// The property must equal the value.
    Equals,
    /// The value must be present in the (array) property.
    Add,
    /// The value must be absent from the property.
    Remove,
}

/// Construct-scope operators: expansion-time binding hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructOperator {
    /// The abstract construct maps to the given concrete resource.
    Equals,
}

// =============================================================================
// CONSTRAINT VARIANTS
// =============================================================================

/// The two endpoints an edge constraint talks about.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeTarget {
    /// Source endpoint; may be an abstract construct id.
    pub source: ResourceId,
    /// Target endpoint; may be an abstract construct id.
    pub target: ResourceId,
}

/// A user-supplied constraint, one of four scopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Constraint {
    /// Add, remove or replace a resource.
    Application {
        /// What to do with the node.
        operator: ApplicationOperator,
        /// The resource in question.
        node: ResourceId,
        /// Replacement resource; required by `replace`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replacement_node: Option<ResourceId>,
    },
    /// Require, forbid or shape connectivity between two endpoints.
    Edge {
        /// The connectivity requirement.
        operator: EdgeOperator,
        /// The endpoint pair.
        target: EdgeTarget,
        /// Intermediate node; required by the contain operators.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<ResourceId>,
        /// Attribute classifications every node on a satisfying path must
        /// carry.
        #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
        attributes: BTreeSet<String>,
    },
    /// Pin a property of one resource.
    Resource {
        /// The property requirement.
        operator: ResourceOperator,
        /// The resource whose property is pinned.
        target: ResourceId,
        /// Property path in the `a.b[2].c` mini-language.
        property: String,
        /// The pinned value; coerced before use.
        value: Value,
    },
    /// Bind an abstract construct to a concrete resource.
    Construct {
        /// The binding requirement.
        operator: ConstructOperator,
        /// The abstract construct id.
        target: ResourceId,
        /// The concrete resource it expands to.
        node: ResourceId,
    },
}

impl Constraint {
    /// The scope name used by the `scope` discriminator, for diagnostics.
    #[must_use]
    pub fn scope(&self) -> &'static str {
        match self {
            Self::Application { .. } => "application",
            Self::Edge { .. } => "edge",
            Self::Resource { .. } => "resource",
            Self::Construct { .. } => "construct",
        }
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Required-field checks per operator. Purely syntactic; graph state is
    /// not consulted.
    pub fn validate(&self) -> Result<(), OpsError> {
        let invalid = |msg: String| Err(OpsError::ConstraintValidation(msg));
        match self {
            Self::Application {
                operator,
                node,
                replacement_node,
            } => {
                node.validate()?;
                match operator {
                    ApplicationOperator::Replace => match replacement_node {
                        Some(replacement) => replacement.validate(),
                        None => invalid(format!(
                            "replace constraint on {node} needs a replacement_node"
                        )),
                    },
                    _ if replacement_node.is_some() => invalid(format!(
                        "constraint on {node}: replacement_node is only valid with replace"
                    )),
                    _ => Ok(()),
                }
            }
            Self::Edge {
                operator,
                target,
                node,
                ..
            } => {
                target.source.validate()?;
                target.target.validate()?;
                match operator {
                    EdgeOperator::MustContain | EdgeOperator::MustNotContain => match node {
                        Some(n) => n.validate(),
                        None => invalid(format!(
                            "{:?} constraint on {} -> {} needs a node",
                            operator, target.source, target.target
                        )),
                    },
                    _ => Ok(()),
                }
            }
            Self::Resource {
                target, property, ..
            } => {
                target.validate()?;
                PropertyPath::parse(property).map(|_| ())
            }
            Self::Construct { target, node, .. } => {
                target.validate()?;
                node.validate()
            }
        }
    }

    // =========================================================================
    // SATISFACTION
    // =========================================================================

    /// Point-in-time satisfaction check against the dataflow graph.
    ///
    /// Abstract endpoints are resolved to concrete resources through the
    /// construct mapping table first.
    #[must_use]
    pub fn is_satisfied(
        &self,
        graph: &Graph,
        kb: &dyn KnowledgeBase,
        mapping: &ConstructMapping,
    ) -> bool {
        match self {
            Self::Application {
                operator,
                node,
                replacement_node,
            } => {
                let present = |id: &ResourceId| {
                    resolve_endpoint(id, mapping)
                        .iter()
                        .any(|c| graph.contains_vertex(c))
                };
                match operator {
                    ApplicationOperator::Add => present(node),
                    ApplicationOperator::Remove => !present(node),
                    ApplicationOperator::Replace => {
                        !graph.contains_vertex(node)
                            && replacement_node.as_ref().is_some_and(present)
                    }
                }
            }
            Self::Edge {
                operator,
                target,
                node,
                attributes,
            } => edge_satisfied(graph, kb, mapping, *operator, target, node.as_ref(), attributes),
            Self::Resource {
                operator,
                target,
                property,
                value,
            } => {
                let Some(resource) = graph.vertex(target) else {
                    return false;
                };
                let Ok(path) = PropertyPath::parse(property) else {
                    return false;
                };
                property_satisfied(&resource.properties, &path, *operator, &kb.coerce(value))
            }
            Self::Construct { target, node, .. } => mapping
                .get(target)
                .is_some_and(|concrete| concrete.contains(node) && graph.contains_vertex(node)),
        }
    }
}

/// Resolve an endpoint through the mapping table: a construct id yields its
/// concrete expansion set, anything else yields itself.
#[must_use]
pub fn resolve_endpoint(id: &ResourceId, mapping: &ConstructMapping) -> BTreeSet<ResourceId> {
    match mapping.get(id) {
        Some(concrete) if !concrete.is_empty() => concrete.clone(),
        _ => [id.clone()].into_iter().collect(),
    }
}

fn property_satisfied(
    bag: &PropertyBag,
    path: &PropertyPath,
    operator: ResourceOperator,
    value: &Value,
) -> bool {
    let current = path.get(bag);
    match operator {
        ResourceOperator::Equals => current == Some(value),
        ResourceOperator::Add => match current {
            Some(Value::Array(items)) => items.contains(value),
            Some(v) => v == value,
            None => false,
        },
        ResourceOperator::Remove => match current {
            Some(Value::Array(items)) => !items.contains(value),
            Some(v) => v != value,
            None => true,
        },
    }
}

fn edge_satisfied(
    graph: &Graph,
    kb: &dyn KnowledgeBase,
    mapping: &ConstructMapping,
    operator: EdgeOperator,
    target: &EdgeTarget,
    node: Option<&ResourceId>,
    attributes: &BTreeSet<String>,
) -> bool {
    let sources = resolve_endpoint(&target.source, mapping);
    let targets = resolve_endpoint(&target.target, mapping);

    // Every path between every resolved endpoint pair, gated by required
    // attribute classifications.
    let mut all_paths = Vec::new();
    for source in &sources {
        for end in &targets {
            for path in graph.all_simple_paths(source, end) {
                if path_has_attributes(graph, kb, &path, attributes) {
                    all_paths.push(path);
                }
            }
        }
    }

    match operator {
        EdgeOperator::MustExist => !all_paths.is_empty(),
        EdgeOperator::MustNotExist => all_paths.is_empty(),
        EdgeOperator::MustContain => node.is_some_and(|n| {
            all_paths.iter().any(|path| path.contains(n))
        }),
        EdgeOperator::MustNotContain => node.is_none_or(|n| {
            all_paths.iter().all(|path| !path.contains(n))
        }),
    }
}

/// True when every node on the path carries every required classification.
fn path_has_attributes(
    graph: &Graph,
    kb: &dyn KnowledgeBase,
    path: &[ResourceId],
    attributes: &BTreeSet<String>,
) -> bool {
    if attributes.is_empty() {
        return true;
    }
    path.iter().all(|id| {
        graph.contains_vertex(id)
            && kb
                .resource_template(&id.type_ref())
                .map(|t| t.classification.has_all(attributes))
                .unwrap_or(false)
    })
}

// =============================================================================
// CONSTRAINT LIST PARSING
// =============================================================================

/// Parse and validate a `constraints` list from YAML.
///
/// Validation failures across independent constraints are aggregated so the
/// caller sees every problem at once.
pub fn parse_constraints(text: &str) -> Result<Vec<Constraint>, OpsError> {
    #[derive(Deserialize)]
    struct Doc {
        #[serde(default)]
        constraints: Vec<Constraint>,
    }
    let doc: Doc =
        serde_yaml::from_str(text).map_err(|e| OpsError::Serialization(e.to_string()))?;

    let errors: Vec<OpsError> = doc
        .constraints
        .iter()
        .filter_map(|c| c.validate().err())
        .collect();
    OpsError::aggregate(errors)?;
    Ok(doc.constraints)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::CatalogKnowledgeBase;
    use crate::types::Resource;

    fn id(s: &str) -> ResourceId {
        s.parse().expect("id")
    }

    fn chain(edges: &[(&str, &str)]) -> Graph {
        let mut g = Graph::new();
        for (from, to) in edges {
            for v in [from, to] {
                if !g.contains_vertex(&id(v)) {
                    g.add_vertex(Resource::new(id(v))).expect("vertex");
                }
            }
            g.add_edge(&id(from), &id(to)).expect("edge");
        }
        g
    }

    fn kb() -> CatalogKnowledgeBase {
        CatalogKnowledgeBase::new()
    }

    #[test]
    fn parse_tagged_list_selects_variants() {
        let yaml = r"
constraints:
  - scope: application
    operator: add
    node: p:t:a
  - scope: edge
    operator: must_exist
    target:
      source: p:t:a
      target: p:t:b
  - scope: resource
    operator: equals
    target: p:t:a
    property: Size
    value: 3
  - scope: construct
    operator: equals
    target: construct:service:api
    node: p:t:a
";
        let constraints = parse_constraints(yaml).expect("parse");
        assert_eq!(constraints.len(), 4);
        assert_eq!(constraints[0].scope(), "application");
        assert_eq!(constraints[1].scope(), "edge");
        assert_eq!(constraints[2].scope(), "resource");
        assert_eq!(constraints[3].scope(), "construct");
    }

    #[test]
    fn parse_aggregates_validation_errors() {
        let yaml = r"
constraints:
  - scope: application
    operator: replace
    node: p:t:a
  - scope: edge
    operator: must_contain
    target:
      source: p:t:a
      target: p:t:b
";
        let result = parse_constraints(yaml);
        assert!(matches!(result, Err(OpsError::Aggregate(errs)) if errs.len() == 2));
    }

    #[test]
    fn replace_requires_replacement_node() {
        let constraint = Constraint::Application {
            operator: ApplicationOperator::Replace,
            node: id("p:t:a"),
            replacement_node: None,
        };
        assert!(constraint.validate().is_err());

        let constraint = Constraint::Application {
            operator: ApplicationOperator::Replace,
            node: id("p:t:a"),
            replacement_node: Some(id("p:t:b")),
        };
        assert!(constraint.validate().is_ok());
    }

    #[test]
    fn application_satisfaction() {
        let graph = chain(&[("p:t:a", "p:t:b")]);
        let mapping = ConstructMapping::new();

        let add = Constraint::Application {
            operator: ApplicationOperator::Add,
            node: id("p:t:a"),
            replacement_node: None,
        };
        assert!(add.is_satisfied(&graph, &kb(), &mapping));

        let remove = Constraint::Application {
            operator: ApplicationOperator::Remove,
            node: id("p:t:a"),
            replacement_node: None,
        };
        assert!(!remove.is_satisfied(&graph, &kb(), &mapping));
    }

    #[test]
    fn edge_contains_on_three_node_path() {
        // Constrained node in the middle of the only path.
        let graph = chain(&[("p:t:a", "p:t:m"), ("p:t:m", "p:t:b")]);
        let mapping = ConstructMapping::new();
        let target = EdgeTarget {
            source: id("p:t:a"),
            target: id("p:t:b"),
        };

        let must_contain = Constraint::Edge {
            operator: EdgeOperator::MustContain,
            target: target.clone(),
            node: Some(id("p:t:m")),
            attributes: BTreeSet::new(),
        };
        assert!(must_contain.is_satisfied(&graph, &kb(), &mapping));

        let must_not_contain = Constraint::Edge {
            operator: EdgeOperator::MustNotContain,
            target,
            node: Some(id("p:t:m")),
            attributes: BTreeSet::new(),
        };
        assert!(!must_not_contain.is_satisfied(&graph, &kb(), &mapping));
    }

    #[test]
    fn edge_must_exist_and_must_not_exist() {
        let graph = chain(&[("p:t:a", "p:t:b")]);
        let mapping = ConstructMapping::new();

        let exists = Constraint::Edge {
            operator: EdgeOperator::MustExist,
            target: EdgeTarget {
                source: id("p:t:a"),
                target: id("p:t:b"),
            },
            node: None,
            attributes: BTreeSet::new(),
        };
        assert!(exists.is_satisfied(&graph, &kb(), &mapping));

        let absent = Constraint::Edge {
            operator: EdgeOperator::MustNotExist,
            target: EdgeTarget {
                source: id("p:t:b"),
                target: id("p:t:a"),
            },
            node: None,
            attributes: BTreeSet::new(),
        };
        assert!(absent.is_satisfied(&graph, &kb(), &mapping));
    }

    #[test]
    fn edge_endpoints_resolve_through_mapping() {
        let graph = chain(&[("p:t:concrete", "p:t:b")]);
        let mut mapping = ConstructMapping::new();
        mapping.insert(
            id("construct:service:api"),
            [id("p:t:concrete")].into_iter().collect(),
        );

        let exists = Constraint::Edge {
            operator: EdgeOperator::MustExist,
            target: EdgeTarget {
                source: id("construct:service:api"),
                target: id("p:t:b"),
            },
            node: None,
            attributes: BTreeSet::new(),
        };
        assert!(exists.is_satisfied(&graph, &kb(), &mapping));
    }

    #[test]
    fn resource_property_satisfaction() {
        let mut graph = Graph::new();
        let mut resource = Resource::new(id("p:t:a"));
        resource
            .properties
            .insert("Size".to_string(), Value::Int(3));
        graph.add_vertex(resource).expect("vertex");

        let equals = Constraint::Resource {
            operator: ResourceOperator::Equals,
            target: id("p:t:a"),
            property: "Size".to_string(),
            value: Value::Int(3),
        };
        assert!(equals.is_satisfied(&graph, &kb(), &ConstructMapping::new()));

        let not_equal = Constraint::Resource {
            operator: ResourceOperator::Equals,
            target: id("p:t:a"),
            property: "Size".to_string(),
            value: Value::Int(4),
        };
        assert!(!not_equal.is_satisfied(&graph, &kb(), &ConstructMapping::new()));
    }
}
