//! # Core Type Definitions
//!
//! This module contains the data model shared by every engine component:
//! - Resource identity (`ResourceId`, `TypeRef`)
//! - The dynamic property value union (`Value`, `PropertyRef`)
//! - The resource vertex type (`Resource`)
//! - Decision audit records (`Decision`, `DecisionRecord`)
//! - Error types (`OpsError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point; floats are rejected at
//!   the deserialization boundary)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//!   and for tie-breaking in the graph algorithms

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// RESOURCE IDENTITY
// =============================================================================

/// Unique identifier for a resource: `(provider, rtype, namespace, name)`.
///
/// This is the graph's sole vertex key. The derived `Ord` (field order:
/// provider, rtype, namespace, name) is the tie-break ordering used by every
/// deterministic algorithm in the engine.
///
/// Text form: `provider:type[:namespace]:name`. The namespace segment is
/// emitted only when it is non-empty, or when the name itself contains a
/// colon (so the text form stays unambiguous).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    /// Provider segment, e.g. `aws`.
    pub provider: String,
    /// Resource type segment, e.g. `lambda_function`.
    pub rtype: String,
    /// Optional namespace segment; empty when the resource is top-level.
    pub namespace: String,
    /// Resource name; the only segment allowed to contain colons.
    pub name: String,
}

impl ResourceId {
    /// Create a resource id without a namespace.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        rtype: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            rtype: rtype.into(),
            namespace: String::new(),
            name: name.into(),
        }
    }

    /// Create a resource id with a namespace.
    #[must_use]
    pub fn namespaced(
        provider: impl Into<String>,
        rtype: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            rtype: rtype.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// The `(provider, rtype)` pair identifying this resource's type.
    #[must_use]
    pub fn type_ref(&self) -> TypeRef {
        TypeRef {
            provider: self.provider.clone(),
            rtype: self.rtype.clone(),
        }
    }

    /// True when this id has no provider/type information (zero value).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.provider.is_empty() && self.rtype.is_empty() && self.name.is_empty()
    }

    /// Validate every segment against its character class.
    ///
    /// Provider, type and namespace admit `[A-Za-z0-9_-]`; the name
    /// additionally admits `. / :` so generated names can embed paths and
    /// qualified identifiers.
    pub fn validate(&self) -> Result<(), OpsError> {
        let ident_ok = |s: &str| s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        let name_ok = |s: &str| {
            s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':'))
        };

        if self.provider.is_empty() || !ident_ok(&self.provider) {
            return Err(OpsError::InvalidResourceId(format!(
                "invalid provider '{}' in '{self}'",
                self.provider
            )));
        }
        if self.rtype.is_empty() || !ident_ok(&self.rtype) {
            return Err(OpsError::InvalidResourceId(format!(
                "invalid type '{}' in '{self}'",
                self.rtype
            )));
        }
        if !ident_ok(&self.namespace) {
            return Err(OpsError::InvalidResourceId(format!(
                "invalid namespace '{}' in '{self}'",
                self.namespace
            )));
        }
        if self.name.is_empty() || !name_ok(&self.name) {
            return Err(OpsError::InvalidResourceId(format!(
                "invalid name '{}' in '{self}'",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The namespace segment must appear whenever the name contains a
        // colon, otherwise parsing would split the name incorrectly.
        if self.namespace.is_empty() && !self.name.contains(':') {
            write!(f, "{}:{}:{}", self.provider, self.rtype, self.name)
        } else {
            write!(
                f,
                "{}:{}:{}:{}",
                self.provider, self.rtype, self.namespace, self.name
            )
        }
    }
}

impl FromStr for ResourceId {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(4, ':').collect();
        let id = match parts.as_slice() {
            [provider, rtype, name] => Self::new(*provider, *rtype, *name),
            [provider, rtype, namespace, name] => {
                Self::namespaced(*provider, *rtype, *namespace, *name)
            }
            _ => {
                return Err(OpsError::InvalidResourceId(format!(
                    "expected provider:type[:namespace]:name, got '{s}'"
                )));
            }
        };
        id.validate()?;
        Ok(id)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = OpsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.to_string()
    }
}

/// A `(provider, rtype)` pair identifying a resource type in the knowledge
/// base, independent of any concrete instance.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(try_from = "String", into = "String")]
pub struct TypeRef {
    /// Provider segment, e.g. `aws`.
    pub provider: String,
    /// Resource type segment, e.g. `lambda_function`.
    pub rtype: String,
}

impl TypeRef {
    /// Create a new type reference.
    #[must_use]
    pub fn new(provider: impl Into<String>, rtype: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            rtype: rtype.into(),
        }
    }

    /// Instantiate a concrete id of this type with the given name.
    #[must_use]
    pub fn instance(&self, name: impl Into<String>) -> ResourceId {
        ResourceId::new(self.provider.clone(), self.rtype.clone(), name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.rtype)
    }
}

impl FromStr for TypeRef {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split(':').collect::<Vec<_>>().as_slice() {
            [provider, rtype] if !provider.is_empty() && !rtype.is_empty() => {
                Ok(Self::new(*provider, *rtype))
            }
            _ => Err(OpsError::InvalidResourceId(format!(
                "expected provider:type, got '{s}'"
            ))),
        }
    }
}

impl TryFrom<String> for TypeRef {
    type Error = OpsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TypeRef> for String {
    fn from(t: TypeRef) -> Self {
        t.to_string()
    }
}

// =============================================================================
// PROPERTY REFERENCE
// =============================================================================

/// A lazy `(resource id, property path)` reference.
///
/// Property refs wire values that are not concretely known at the time a
/// resource is created; they are resolved late, against the final graph.
///
/// Text form: `provider:type[:namespace]:name#path`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyRef {
    /// The resource whose property is referenced.
    pub resource: ResourceId,
    /// A property path in the `a.b[2].c` mini-language.
    pub path: String,
}

impl PropertyRef {
    /// Create a new property reference.
    #[must_use]
    pub fn new(resource: ResourceId, path: impl Into<String>) -> Self {
        Self {
            resource,
            path: path.into(),
        }
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.resource, self.path)
    }
}

impl FromStr for PropertyRef {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((id, path)) = s.split_once('#') else {
            return Err(OpsError::InvalidResourceId(format!(
                "expected id#path, got '{s}'"
            )));
        };
        if path.is_empty() {
            return Err(OpsError::InvalidResourceId(format!(
                "empty property path in '{s}'"
            )));
        }
        Ok(Self::new(id.parse()?, path))
    }
}

// =============================================================================
// DYNAMIC VALUE UNION
// =============================================================================

/// The dynamic property bag type.
pub type PropertyBag = BTreeMap<String, Value>;

/// A tagged dynamic value: the JSON-like union property bags are made of.
///
/// There is no per-resource-type static schema; shapes are defined externally
/// by knowledge-base templates, and all generic manipulation (property paths,
/// walking, id rewriting) operates purely over this union.
///
/// `Ref` and `PropRef` serialize as their text forms. Deserialization only
/// ever produces the plain variants; the knowledge base's value coercion is
/// what turns strings into typed references (see `knowledge::coerce_value`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar. Floats are rejected at the boundary.
    Int(i64),
    /// String scalar.
    String(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// String-keyed mapping, alphabetically ordered.
    Map(PropertyBag),
    /// A typed reference to another resource.
    Ref(ResourceId),
    /// A lazy reference to another resource's property.
    PropRef(PropertyRef),
}

impl Value {
    /// True for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow as a string slice, if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extract an integer, if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract a boolean, if this is a `Bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as an array, if this is an `Array`.
    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Borrow as a map, if this is a `Map`.
    #[must_use]
    pub fn as_map(&self) -> Option<&PropertyBag> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow as a resource reference, if this is a `Ref`.
    #[must_use]
    pub fn as_resource_ref(&self) -> Option<&ResourceId> {
        match self {
            Self::Ref(id) => Some(id),
            _ => None,
        }
    }

    /// A short name for this variant, used in type-mismatch errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Ref(_) => "ref",
            Self::PropRef(_) => "propref",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<ResourceId> for Value {
    fn from(id: ResourceId) -> Self {
        Self::Ref(id)
    }
}

impl From<PropertyRef> for Value {
    fn from(r: PropertyRef) -> Self {
        Self::PropRef(r)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            // References serialize as their text forms; round-tripping them
            // back to typed values is the knowledge base's coercion job.
            Self::Ref(id) => serializer.serialize_str(&id.to_string()),
            Self::PropRef(r) => serializer.serialize_str(&r.to_string()),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a null, bool, integer, string, sequence or mapping")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> Result<Value, E> {
        Ok(Value::Int(i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> Result<Value, E> {
        i64::try_from(u)
            .map(Value::Int)
            .map_err(|_| E::custom(format!("integer {u} out of range")))
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> Result<Value, E> {
        // Floats break canonical round-trips and are banned workspace-wide.
        Err(E::custom(format!(
            "floating-point values are not supported in property bags (got {f})"
        )))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
        Ok(Value::String(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut entries = PropertyBag::new();
        while let Some((k, v)) = map.next_entry::<String, Value>()? {
            entries.insert(k, v);
        }
        Ok(Value::Map(entries))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

// =============================================================================
// RESOURCE
// =============================================================================

/// A graph vertex: a resource identity plus its dynamic property bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Resource {
    /// The vertex key.
    pub id: ResourceId,
    /// Dynamic properties; shape is defined by knowledge-base templates.
    #[serde(default)]
    pub properties: PropertyBag,
}

impl Resource {
    /// Create a resource with an empty property bag.
    #[must_use]
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            properties: PropertyBag::new(),
        }
    }

    /// Create a resource with the given property bag.
    #[must_use]
    pub fn with_properties(id: ResourceId, properties: PropertyBag) -> Self {
        Self { id, properties }
    }
}

// =============================================================================
// DECISION RECORDS
// =============================================================================

/// A single engine decision, recorded for audit only — never replayed and
/// never consulted for control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// A resource was added to both graphs.
    AddResource(ResourceId),
    /// A dataflow edge (and its deployment counterpart) was added.
    AddEdge(ResourceId, ResourceId),
    /// A resource was removed from both graphs.
    RemoveResource(ResourceId),
    /// A dataflow edge (and its deployment counterpart) was removed.
    RemoveEdge(ResourceId, ResourceId),
    /// A property was written by rule evaluation or a resource constraint.
    SetProperty(ResourceId, String),
    /// A resource id was renamed, rewriting all references.
    RenameResource(ResourceId, ResourceId),
    /// A logical edge was expanded into a multi-hop path.
    ExpandEdge(ResourceId, ResourceId, Vec<ResourceId>),
}

/// An append-only `(context stack, decision)` pair.
///
/// Records are immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// The operation stack active when the decision was made, outermost
    /// first (e.g. `["apply_constraints", "expand_edge"]`).
    pub context: Vec<String>,
    /// The decision itself.
    pub decision: Decision,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors produced by the engine.
///
/// Taxonomy:
/// - structural graph errors (`VertexNotFound`, `VertexExists`, ...) are
///   tolerated as no-ops during idempotent re-application and surfaced
///   otherwise;
/// - constraint validation problems aggregate into `Aggregate` so callers
///   see every problem at once;
/// - unknown knowledge-base types are fatal to the triggering operation;
/// - `NoSatisfyingPath` is fatal to that edge addition only.
///
/// Deletion being blocked is deliberately NOT an error; see
/// `reconciler::RemovalOutcome`.
#[derive(Debug, Error)]
pub enum OpsError {
    /// The requested vertex was not found in the graph.
    #[error("resource not found: {0}")]
    VertexNotFound(ResourceId),

    /// The vertex already exists in the graph.
    #[error("resource already exists: {0}")]
    VertexExists(ResourceId),

    /// The requested edge was not found in the graph.
    #[error("edge not found: {0} -> {1}")]
    EdgeNotFound(ResourceId, ResourceId),

    /// The edge already exists in the graph.
    #[error("edge already exists: {0} -> {1}")]
    EdgeExists(ResourceId, ResourceId),

    /// Adding the edge would create a cycle in the deployment graph.
    #[error("edge {0} -> {1} would create a deployment cycle")]
    DeploymentCycle(ResourceId, ResourceId),

    /// The graph contains a negative-weight cycle.
    #[error("negative-weight cycle detected involving {0}")]
    NegativeCycle(ResourceId),

    /// Path reconstruction found a cycle in the predecessor chain.
    #[error("cycle in shortest-path predecessor chain at {0}")]
    PredecessorCycle(ResourceId),

    /// A resource id failed to parse or validate.
    #[error("invalid resource id: {0}")]
    InvalidResourceId(String),

    /// A property path failed to parse.
    #[error("invalid property path '{0}': {1}")]
    InvalidPropertyPath(String, String),

    /// A property-path operation hit a value of the wrong shape.
    #[error("type error at '{path}': expected {expected}, found {found}")]
    PropertyType {
        /// The offending path.
        path: String,
        /// The shape the operation needed.
        expected: &'static str,
        /// The shape actually present.
        found: &'static str,
    },

    /// An array index was out of bounds.
    #[error("index {index} out of bounds at '{path}' (len {len})")]
    IndexOutOfBounds {
        /// The offending path.
        path: String,
        /// The requested index.
        index: usize,
        /// The array length.
        len: usize,
    },

    /// The knowledge base has no template for the given type.
    #[error("no template in knowledge base for {0}")]
    TemplateNotFound(String),

    /// No path satisfying classification and constraint filters exists.
    #[error("no satisfying path from {from} to {to}")]
    NoSatisfyingPath {
        /// Requested source resource.
        from: ResourceId,
        /// Requested target resource.
        to: ResourceId,
    },

    /// A constraint failed its required-field validation.
    #[error("invalid constraint: {0}")]
    ConstraintValidation(String),

    /// Several independent failures, reported together.
    #[error("{} error(s): {}", .0.len(), format_aggregate(.0))]
    Aggregate(Vec<OpsError>),

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred at a load/output boundary.
    #[error("I/O error: {0}")]
    Io(String),

    /// The engine configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

fn format_aggregate(errors: &[OpsError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl OpsError {
    /// Collapse a list of independent failures into a single error.
    ///
    /// Returns `Ok(())` for an empty list, the sole error for a singleton,
    /// and `Aggregate` otherwise.
    pub fn aggregate(mut errors: Vec<OpsError>) -> Result<(), OpsError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(OpsError::Aggregate(errors)),
        }
    }

    /// True for the structural "already there / already gone" errors that
    /// idempotent re-application treats as no-ops.
    #[must_use]
    pub fn is_idempotent_noop(&self) -> bool {
        matches!(
            self,
            Self::VertexExists(_) | Self::EdgeExists(_, _)
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_display_without_namespace() {
        let id = ResourceId::new("aws", "lambda_function", "api");
        assert_eq!(id.to_string(), "aws:lambda_function:api");
    }

    #[test]
    fn resource_id_display_with_namespace() {
        let id = ResourceId::namespaced("aws", "route", "gateway1", "r1");
        assert_eq!(id.to_string(), "aws:route:gateway1:r1");
    }

    #[test]
    fn resource_id_colon_in_name_forces_namespace_segment() {
        let id = ResourceId::new("aws", "policy", "arn/thing:stmt");
        // Empty namespace is still emitted so the name parses back intact.
        assert_eq!(id.to_string(), "aws:policy::arn/thing:stmt");
        let parsed: ResourceId = id.to_string().parse().expect("parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn resource_id_parse_roundtrip() {
        for text in [
            "aws:lambda_function:api",
            "aws:route:gw:r1",
            "kubernetes:pod:default:web",
        ] {
            let id: ResourceId = text.parse().expect("parse");
            assert_eq!(id.to_string(), text);
        }
    }

    #[test]
    fn resource_id_rejects_bad_segments() {
        assert!("aws:lambda".parse::<ResourceId>().is_err());
        assert!(":lambda:x".parse::<ResourceId>().is_err());
        assert!("aws:lam bda:x".parse::<ResourceId>().is_err());
        assert!("aws:lambda:".parse::<ResourceId>().is_err());
    }

    #[test]
    fn resource_id_ordering_is_lexicographic() {
        let a: ResourceId = "aws:a:x".parse().expect("parse");
        let b: ResourceId = "aws:b:a".parse().expect("parse");
        let c: ResourceId = "gcp:a:a".parse().expect("parse");
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn property_ref_roundtrip() {
        let r = PropertyRef::new(
            "aws:lambda_function:api".parse().expect("parse"),
            "Environment.TABLE_NAME",
        );
        assert_eq!(r.to_string(), "aws:lambda_function:api#Environment.TABLE_NAME");
        let parsed: PropertyRef = r.to_string().parse().expect("parse");
        assert_eq!(parsed, r);
    }

    #[test]
    fn value_conversions() {
        assert_eq!(Value::from(3i64).as_int(), Some(3));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert!(Value::Null.is_null());
    }

    #[test]
    fn value_yaml_rejects_floats() {
        let result: Result<Value, _> = serde_yaml::from_str("1.5");
        assert!(result.is_err());
    }

    #[test]
    fn value_yaml_roundtrip() {
        let yaml = "A:\n- 1\n- 2\nB: text\n";
        let value: Value = serde_yaml::from_str(yaml).expect("parse");
        let back = serde_yaml::to_string(&value).expect("emit");
        let reparsed: Value = serde_yaml::from_str(&back).expect("reparse");
        assert_eq!(value, reparsed);
    }

    #[test]
    fn ref_serializes_as_text_form() {
        let v = Value::Ref("aws:bucket:files".parse().expect("parse"));
        let yaml = serde_yaml::to_string(&v).expect("emit");
        assert_eq!(yaml.trim(), "aws:bucket:files");
    }

    #[test]
    fn aggregate_collapses() {
        assert!(OpsError::aggregate(Vec::new()).is_ok());

        let single = OpsError::aggregate(vec![OpsError::InvalidResourceId("x".into())]);
        assert!(matches!(single, Err(OpsError::InvalidResourceId(_))));

        let multi = OpsError::aggregate(vec![
            OpsError::InvalidResourceId("x".into()),
            OpsError::TemplateNotFound("y".into()),
        ]);
        assert!(matches!(multi, Err(OpsError::Aggregate(v)) if v.len() == 2));
    }

    #[test]
    fn idempotent_noop_classification() {
        let exists = OpsError::VertexExists("p:t:a".parse().expect("parse"));
        assert!(exists.is_idempotent_noop());
        let missing = OpsError::VertexNotFound("p:t:a".parse().expect("parse"));
        assert!(!missing.is_idempotent_noop());
    }
}
