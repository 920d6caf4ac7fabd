//! # Knowledge Base Contract
//!
//! The engine consumes resource and edge templates from an external
//! knowledge base; it defines no rule content of its own. This module holds
//! the contract — the [`KnowledgeBase`] trait and the template types it
//! serves — plus [`CatalogKnowledgeBase`], a serde-loadable in-memory
//! implementation used by the CLI and the test suites.
//!
//! Templates are immutable after construction; a `SolutionContext` shares
//! its knowledge base by reference.

use crate::types::{OpsError, PropertyRef, ResourceId, TypeRef, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

// =============================================================================
// CLASSIFICATION & FUNCTIONALITY
// =============================================================================

/// Attribute classifications of a resource type (`api`, `compute`,
/// `storage`, `network`, ...). Referenced by edge constraints and path
/// satisfaction routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Classification(pub BTreeSet<String>);

impl Classification {
    /// Build a classification set from string labels.
    #[must_use]
    pub fn of(labels: &[&str]) -> Self {
        Self(labels.iter().map(|s| (*s).to_string()).collect())
    }

    /// True when the label is present.
    #[must_use]
    pub fn is(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    /// True when every requested label is present.
    #[must_use]
    pub fn has_all(&self, labels: &BTreeSet<String>) -> bool {
        labels.iter().all(|l| self.0.contains(l))
    }
}

/// The broad role a resource type plays.
///
/// `Unknown` marks pure glue — resources that only exist to connect other
/// resources and may be reclaimed by the reconciler once nothing needs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Functionality {
    /// Glue with no functionality of its own.
    #[default]
    Unknown,
    /// Executes workload code.
    Compute,
    /// Stores data.
    Storage,
    /// Fronts an API surface.
    Api,
    /// Queues or routes messages.
    Messaging,
    /// Provides networking fabric.
    Network,
}

impl Functionality {
    /// True for every variant except `Unknown`.
    #[must_use]
    pub fn is_functional(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

// =============================================================================
// DELETION CRITERIA
// =============================================================================

/// Conditions under which a resource may be removed from the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeletionCriteria {
    /// No structural requirement; removal is always allowed.
    #[default]
    None,
    /// Removable only once no upstream neighbor remains.
    RequiresNoUpstream,
    /// Removable only once no downstream neighbor remains.
    RequiresNoDownstream,
    /// Removable only once no neighbor remains at all.
    RequiresNoUpstreamOrDownstream,
}

// =============================================================================
// PROPERTY & OPERATIONAL RULES
// =============================================================================

/// A declared property of a resource type: where it lives and what default
/// it takes when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRule {
    /// Property path in the `a.b[2].c` mini-language.
    pub path: String,
    /// Default value filled in when the property is missing. Nested map
    /// defaults fill recursively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Whether the property must be present after rule evaluation.
    #[serde(default)]
    pub required: bool,
}

/// Which endpoint of an edge an operational rule writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSubject {
    /// The edge's source resource.
    Source,
    /// The edge's target resource.
    Target,
}

/// The value an operational rule writes.
///
/// Catalog form is a single-key map selecting the variant: `{id_of: target}`,
/// `{property_of: {subject: source, path: Arn}}`, `{literal: 42}`. Any other
/// shape is taken as a literal, so plain scalars work unadorned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValue {
    /// A literal value, run through value coercion first.
    Literal(Value),
    /// The id of the named endpoint, as a typed reference.
    IdOf(RuleSubject),
    /// A lazy property reference into the named endpoint.
    PropertyOf {
        /// Which endpoint the reference points at.
        subject: RuleSubject,
        /// The referenced property path.
        path: String,
    },
}

impl Serialize for RuleValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Literal(value) => map.serialize_entry("literal", value)?,
            Self::IdOf(subject) => map.serialize_entry("id_of", subject)?,
            Self::PropertyOf { subject, path } => {
                #[derive(Serialize)]
                struct Inner<'a> {
                    subject: &'a RuleSubject,
                    path: &'a str,
                }
                map.serialize_entry("property_of", &Inner { subject, path })?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        rule_value_from(raw).map_err(serde::de::Error::custom)
    }
}

fn rule_value_from(raw: Value) -> Result<RuleValue, String> {
    if let Value::Map(map) = &raw {
        if map.len() == 1 {
            if let Some((key, inner)) = map.iter().next() {
                match key.as_str() {
                    "literal" => return Ok(RuleValue::Literal(inner.clone())),
                    "id_of" => return Ok(RuleValue::IdOf(rule_subject_from(inner)?)),
                    "property_of" => return property_of_from(inner),
                    _ => {}
                }
            }
        }
    }
    Ok(RuleValue::Literal(raw))
}

fn rule_subject_from(value: &Value) -> Result<RuleSubject, String> {
    match value {
        Value::String(s) if s == "source" => Ok(RuleSubject::Source),
        Value::String(s) if s == "target" => Ok(RuleSubject::Target),
        other => Err(format!("rule subject must be source or target, got {other:?}")),
    }
}

fn property_of_from(inner: &Value) -> Result<RuleValue, String> {
    let Value::Map(fields) = inner else {
        return Err("property_of takes a map with subject and path".to_string());
    };
    let subject = fields
        .get("subject")
        .map(rule_subject_from)
        .transpose()?
        .ok_or_else(|| "property_of requires a subject".to_string())?;
    let path = match fields.get("path") {
        Some(Value::String(p)) => p.clone(),
        _ => return Err("property_of requires a string path".to_string()),
    };
    Ok(RuleValue::PropertyOf { subject, path })
}

/// How an operational rule writes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Overwrite the property.
    #[default]
    Set,
    /// Append to the (array) property.
    Append,
}

/// An operational rule attached to an edge template, evaluated for every
/// edge of that type actually realized in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationalRule {
    /// The endpoint whose properties are written.
    pub subject: RuleSubject,
    /// The destination property path on that endpoint.
    pub path: String,
    /// The value to write.
    pub value: RuleValue,
    /// Overwrite or append.
    #[serde(default)]
    pub action: RuleAction,
}

// =============================================================================
// TEMPLATES
// =============================================================================

/// Template describing one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResourceTemplate {
    /// Attribute classifications of the type.
    #[serde(default)]
    pub classification: Classification,
    /// The type's broad role; `unknown` marks glue.
    #[serde(default)]
    pub functionality: Functionality,
    /// Structural conditions gating removal.
    #[serde(default)]
    pub deletion_criteria: DeletionCriteria,
    /// Declared properties and their defaults.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyRule>,
}

/// A path-satisfaction route descriptor: classifications an expanded path
/// between two types must exhibit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PathSatisfaction {
    /// Classification required of the path's source endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_classification: Option<String>,
    /// Classification required of the path's target endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_classification: Option<String>,
    /// Connectivity classification every intermediate must carry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
}

/// Template describing one permissible edge between two resource types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTemplate {
    /// When true, the deployment-graph edge runs target -> source.
    #[serde(default)]
    pub deployment_order_reversed: bool,
    /// When true, the source endpoint's lifetime is tied to this edge and it
    /// may be auto-removed during cascading deletion.
    #[serde(default)]
    pub deletion_dependent: bool,
    /// Selection weight; lower is preferred by path selection.
    #[serde(default = "default_edge_weight")]
    pub weight: i64,
    /// Rules evaluated for every realized edge of this type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operational_rules: Vec<OperationalRule>,
    /// Route descriptors satisfied by paths expanded over this edge.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_satisfactions: Vec<PathSatisfaction>,
}

fn default_edge_weight() -> i64 {
    crate::graph::DEFAULT_EDGE_WEIGHT
}

impl Default for EdgeTemplate {
    fn default() -> Self {
        Self {
            deployment_order_reversed: false,
            deletion_dependent: false,
            weight: default_edge_weight(),
            operational_rules: Vec::new(),
            path_satisfactions: Vec::new(),
        }
    }
}

// =============================================================================
// VALUE COERCION
// =============================================================================

/// Convert raw constraint/template values into typed ones.
///
/// Strings of the form `provider:type[:namespace]:name` become resource
/// references; `id#path` strings become property references; everything
/// else (including arrays and maps, element-wise) passes through.
#[must_use]
pub fn coerce_value(raw: &Value) -> Value {
    match raw {
        Value::String(s) => {
            if s.contains('#') {
                if let Ok(r) = PropertyRef::from_str(s) {
                    return Value::PropRef(r);
                }
            }
            if s.matches(':').count() >= 2 {
                if let Ok(id) = ResourceId::from_str(s) {
                    return Value::Ref(id);
                }
            }
            raw.clone()
        }
        Value::Array(items) => Value::Array(items.iter().map(coerce_value).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), coerce_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

// =============================================================================
// KNOWLEDGE BASE TRAIT
// =============================================================================

/// The contract the engine consumes.
///
/// Implementations must be immutable after construction and `Send + Sync`;
/// a `SolutionContext` holds its knowledge base behind an `Arc` and the
/// parallel edge-target probe reads it concurrently.
pub trait KnowledgeBase: Send + Sync {
    /// The template for a resource type. Unknown types are fatal to the
    /// triggering operation: no template means no safe path forward.
    fn resource_template(&self, rtype: &TypeRef) -> Result<ResourceTemplate, OpsError>;

    /// The template for a directed type pair, if the knowledge base permits
    /// that edge at all.
    fn edge_template(&self, source: &TypeRef, target: &TypeRef) -> Option<EdgeTemplate>;

    /// All types an edge may lead to from `source`, in deterministic order.
    /// This is what the path-selection graph is built from.
    fn edge_targets(&self, source: &TypeRef) -> Vec<TypeRef>;

    /// Route descriptors for the given type pair.
    fn path_satisfactions(&self, source: &TypeRef, target: &TypeRef) -> Vec<PathSatisfaction> {
        self.edge_template(source, target)
            .map(|t| t.path_satisfactions)
            .unwrap_or_default()
    }

    /// Convert a raw value into a typed one. The default forwards to
    /// [`coerce_value`].
    fn coerce(&self, raw: &Value) -> Value {
        coerce_value(raw)
    }
}

// =============================================================================
// CATALOG KNOWLEDGE BASE
// =============================================================================

/// An in-memory, serde-loadable knowledge base.
///
/// Catalog documents are YAML with resource templates keyed by
/// `provider:type` and edge templates keyed by `provider:type -> provider:type`.
#[derive(Debug, Clone, Default)]
pub struct CatalogKnowledgeBase {
    resources: BTreeMap<TypeRef, ResourceTemplate>,
    edges: BTreeMap<(TypeRef, TypeRef), EdgeTemplate>,
}

/// Serialized form of a catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CatalogDoc {
    #[serde(default)]
    resources: BTreeMap<String, ResourceTemplate>,
    #[serde(default)]
    edges: BTreeMap<String, EdgeTemplate>,
}

impl CatalogKnowledgeBase {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, OpsError> {
        let doc: CatalogDoc =
            serde_yaml::from_str(text).map_err(|e| OpsError::Serialization(e.to_string()))?;
        let mut catalog = Self::new();
        for (key, template) in doc.resources {
            catalog.resources.insert(key.parse()?, template);
        }
        for (key, template) in doc.edges {
            catalog.edges.insert(parse_edge_key(&key)?, template);
        }
        Ok(catalog)
    }

    /// Register a resource template (builder style, used heavily in tests).
    #[must_use]
    pub fn with_resource(mut self, rtype: TypeRef, template: ResourceTemplate) -> Self {
        self.resources.insert(rtype, template);
        self
    }

    /// Register an edge template.
    #[must_use]
    pub fn with_edge(mut self, source: TypeRef, target: TypeRef, template: EdgeTemplate) -> Self {
        self.edges.insert((source, target), template);
        self
    }

    /// Number of resource templates.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Number of edge templates.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Parse an edge-catalog key of the form `provider:type -> provider:type`.
fn parse_edge_key(key: &str) -> Result<(TypeRef, TypeRef), OpsError> {
    let Some((source, target)) = key.split_once("->") else {
        return Err(OpsError::Serialization(format!(
            "edge key '{key}' is not of the form 'source -> target'"
        )));
    };
    Ok((source.trim().parse()?, target.trim().parse()?))
}

impl KnowledgeBase for CatalogKnowledgeBase {
    fn resource_template(&self, rtype: &TypeRef) -> Result<ResourceTemplate, OpsError> {
        self.resources
            .get(rtype)
            .cloned()
            .ok_or_else(|| OpsError::TemplateNotFound(rtype.to_string()))
    }

    fn edge_template(&self, source: &TypeRef, target: &TypeRef) -> Option<EdgeTemplate> {
        self.edges.get(&(source.clone(), target.clone())).cloned()
    }

    fn edge_targets(&self, source: &TypeRef) -> Vec<TypeRef> {
        self.edges
            .keys()
            .filter(|(s, _)| s == source)
            .map(|(_, t)| t.clone())
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TypeRef {
        s.parse().expect("type ref")
    }

    #[test]
    fn coerce_string_to_resource_ref() {
        let coerced = coerce_value(&Value::from("aws:bucket:files"));
        assert_eq!(
            coerced,
            Value::Ref("aws:bucket:files".parse().expect("id"))
        );
    }

    #[test]
    fn coerce_string_to_property_ref() {
        let coerced = coerce_value(&Value::from("aws:bucket:files#Arn"));
        assert!(matches!(coerced, Value::PropRef(_)));
    }

    #[test]
    fn coerce_leaves_plain_strings_alone() {
        assert_eq!(coerce_value(&Value::from("hello")), Value::from("hello"));
        assert_eq!(
            coerce_value(&Value::from("not:an id")),
            Value::from("not:an id")
        );
    }

    #[test]
    fn coerce_recurses_into_containers() {
        let raw = Value::Array(vec![Value::from("aws:bucket:files"), Value::Int(1)]);
        let coerced = coerce_value(&raw);
        let items = coerced.as_array().expect("array");
        assert!(matches!(items[0], Value::Ref(_)));
        assert_eq!(items[1], Value::Int(1));
    }

    #[test]
    fn catalog_lookup_and_missing_template() {
        let catalog = CatalogKnowledgeBase::new().with_resource(
            t("aws:lambda_function"),
            ResourceTemplate {
                classification: Classification::of(&["compute"]),
                functionality: Functionality::Compute,
                ..ResourceTemplate::default()
            },
        );

        let template = catalog
            .resource_template(&t("aws:lambda_function"))
            .expect("template");
        assert!(template.classification.is("compute"));

        assert!(matches!(
            catalog.resource_template(&t("aws:nonexistent")),
            Err(OpsError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn edge_targets_enumerates_in_order() {
        let catalog = CatalogKnowledgeBase::new()
            .with_edge(t("aws:a"), t("aws:c"), EdgeTemplate::default())
            .with_edge(t("aws:a"), t("aws:b"), EdgeTemplate::default())
            .with_edge(t("aws:x"), t("aws:y"), EdgeTemplate::default());
        assert_eq!(
            catalog.edge_targets(&t("aws:a")),
            vec![t("aws:b"), t("aws:c")]
        );
    }

    #[test]
    fn catalog_parses_from_yaml() {
        let yaml = r"
resources:
  aws:lambda_function:
    classification: [compute, serverless]
    functionality: compute
    deletion_criteria: requires_no_upstream
    properties:
      - path: MemorySize
        default: 512
  aws:iam_role:
    functionality: unknown
    deletion_criteria: requires_no_downstream
edges:
  aws:lambda_function -> aws:iam_role:
    deployment_order_reversed: true
    deletion_dependent: true
";
        let catalog = CatalogKnowledgeBase::from_yaml(yaml).expect("catalog");
        assert_eq!(catalog.resource_count(), 2);
        assert_eq!(catalog.edge_count(), 1);

        let lambda = catalog
            .resource_template(&t("aws:lambda_function"))
            .expect("template");
        assert_eq!(lambda.deletion_criteria, DeletionCriteria::RequiresNoUpstream);
        assert_eq!(lambda.properties[0].default, Some(Value::Int(512)));

        let edge = catalog
            .edge_template(&t("aws:lambda_function"), &t("aws:iam_role"))
            .expect("edge");
        assert!(edge.deployment_order_reversed);
        assert!(edge.deletion_dependent);
    }

    #[test]
    fn rule_values_parse_from_yaml_maps() {
        let yaml = r"
edges:
  aws:lambda_function -> aws:sqs_queue:
    operational_rules:
      - subject: source
        path: Subscriptions
        action: append
        value:
          id_of: target
      - subject: target
        path: SourceArn
        value:
          property_of:
            subject: source
            path: Arn
      - subject: source
        path: BatchSize
        value: 10
";
        let catalog = CatalogKnowledgeBase::from_yaml(yaml).expect("catalog");
        let edge = catalog
            .edge_template(&t("aws:lambda_function"), &t("aws:sqs_queue"))
            .expect("edge");
        assert_eq!(
            edge.operational_rules[0].value,
            RuleValue::IdOf(RuleSubject::Target)
        );
        assert_eq!(
            edge.operational_rules[1].value,
            RuleValue::PropertyOf {
                subject: RuleSubject::Source,
                path: "Arn".to_string(),
            }
        );
        assert_eq!(
            edge.operational_rules[2].value,
            RuleValue::Literal(Value::Int(10))
        );
    }

    #[test]
    fn rule_value_subject_must_name_an_endpoint() {
        let yaml = r"
edges:
  aws:a -> aws:b:
    operational_rules:
      - subject: source
        path: P
        value:
          id_of: neither
";
        assert!(CatalogKnowledgeBase::from_yaml(yaml).is_err());
    }

    #[test]
    fn malformed_edge_key_is_rejected() {
        let yaml = "edges:\n  not-an-edge-key: {}\n";
        assert!(CatalogKnowledgeBase::from_yaml(yaml).is_err());
    }
}
