//! # Boundary Serialization
//!
//! The YAML document exchanged at the engine boundary: a `resources`
//! mapping (resource id to property bag, bag keys alphabetic) and an
//! `edges` mapping (`"src -> dst"` to null), both emitted in the stable
//! topological order of the graph. Constraint files carry the same layout
//! prefixed by a `constraints` list.
//!
//! Emission is deterministic: serializing, loading and serializing again
//! yields byte-identical text, cyclic graphs included.

use crate::constraints::{parse_constraints, Constraint};
use crate::graph::Graph;
use crate::types::{OpsError, PropertyBag, Resource, ResourceId};
use serde_yaml::{Mapping, Value as Yaml};
use std::collections::BTreeMap;

const RESOURCES_KEY: &str = "resources";
const EDGES_KEY: &str = "edges";
const EDGE_SEPARATOR: &str = " -> ";

// =============================================================================
// EMISSION
// =============================================================================

/// Serialize a graph to the boundary YAML document.
pub fn to_yaml(graph: &Graph) -> Result<String, OpsError> {
    let order = graph.stable_order();
    let rank: BTreeMap<&ResourceId, usize> =
        order.iter().enumerate().map(|(i, id)| (id, i)).collect();

    let mut resources = Mapping::new();
    for id in &order {
        let bag = graph
            .vertex(id)
            .map(|r| r.properties.clone())
            .unwrap_or_default();
        let value =
            serde_yaml::to_value(&bag).map_err(|e| OpsError::Serialization(e.to_string()))?;
        resources.insert(Yaml::String(id.to_string()), value);
    }

    let mut pairs: Vec<(&ResourceId, &ResourceId)> = graph.edges().collect();
    pairs.sort_by_key(|(from, to)| (rank.get(from).copied(), rank.get(to).copied()));
    let mut edges = Mapping::new();
    for (from, to) in pairs {
        edges.insert(
            Yaml::String(format!("{from}{EDGE_SEPARATOR}{to}")),
            Yaml::Null,
        );
    }

    let mut doc = Mapping::new();
    doc.insert(Yaml::String(RESOURCES_KEY.into()), Yaml::Mapping(resources));
    doc.insert(Yaml::String(EDGES_KEY.into()), Yaml::Mapping(edges));
    serde_yaml::to_string(&doc).map_err(|e| OpsError::Serialization(e.to_string()))
}

// =============================================================================
// LOADING
// =============================================================================

/// Load a graph from the boundary YAML document. Missing `resources` or
/// `edges` sections read as empty; edge endpoints must name declared
/// resources.
pub fn from_yaml(text: &str) -> Result<Graph, OpsError> {
    let doc: Yaml =
        serde_yaml::from_str(text).map_err(|e| OpsError::Serialization(e.to_string()))?;
    let Yaml::Mapping(doc) = doc else {
        return Err(OpsError::Serialization(
            "expected a mapping at the document root".to_string(),
        ));
    };

    let mut graph = Graph::new();
    if let Some(Yaml::Mapping(resources)) = doc.get(RESOURCES_KEY) {
        for (key, value) in resources {
            let id: ResourceId = yaml_str(key, "resource id")?.parse()?;
            let properties: PropertyBag = match value {
                Yaml::Null => PropertyBag::new(),
                other => serde_yaml::from_value(other.clone())
                    .map_err(|e| OpsError::Serialization(e.to_string()))?,
            };
            graph.add_vertex(Resource { id, properties })?;
        }
    }
    if let Some(Yaml::Mapping(edges)) = doc.get(EDGES_KEY) {
        for key in edges.keys() {
            let raw = yaml_str(key, "edge")?;
            let (from, to) = raw.split_once(EDGE_SEPARATOR).ok_or_else(|| {
                OpsError::Serialization(format!("expected 'src{EDGE_SEPARATOR}dst', got '{raw}'"))
            })?;
            graph.add_edge(&from.parse()?, &to.parse()?)?;
        }
    }
    Ok(graph)
}

/// A constraint file: a `constraints` list over an optional initial graph.
#[derive(Debug, Clone, Default)]
pub struct InputDocument {
    /// Constraints to apply, in file order.
    pub constraints: Vec<Constraint>,
    /// Initial resources and edges, possibly empty.
    pub graph: Graph,
}

/// Parse a full input file: constraints plus the optional initial graph
/// sharing the document.
pub fn parse_input(text: &str) -> Result<InputDocument, OpsError> {
    Ok(InputDocument {
        constraints: parse_constraints(text)?,
        graph: from_yaml(text)?,
    })
}

fn yaml_str<'a>(value: &'a Yaml, what: &str) -> Result<&'a str, OpsError> {
    value
        .as_str()
        .ok_or_else(|| OpsError::Serialization(format!("expected a string {what} key")))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn id(s: &str) -> ResourceId {
        s.parse().expect("id")
    }

    fn sample_graph() -> Graph {
        let mut graph = Graph::new();
        let mut a = Resource::new(id("aws:lambda:fn"));
        a.properties
            .insert("MemorySize".to_string(), Value::Int(512));
        a.properties
            .insert("Handler".to_string(), Value::from("index.run"));
        graph.add_vertex(a).expect("vertex");
        graph
            .add_vertex(Resource::new(id("aws:queue:q")))
            .expect("vertex");
        graph
            .add_edge(&id("aws:lambda:fn"), &id("aws:queue:q"))
            .expect("edge");
        graph
    }

    #[test]
    fn emits_resources_then_edges_in_stable_order() {
        let text = to_yaml(&sample_graph()).expect("serialize");
        let resources_at = text.find("resources:").expect("resources section");
        let edges_at = text.find("edges:").expect("edges section");
        assert!(resources_at < edges_at);
        // Bag keys come out alphabetically.
        let handler_at = text.find("Handler:").expect("key");
        let memory_at = text.find("MemorySize:").expect("key");
        assert!(handler_at < memory_at);
        assert!(text.contains("aws:lambda:fn -> aws:queue:q"));
    }

    #[test]
    fn round_trip_is_byte_identical() {
        let first = to_yaml(&sample_graph()).expect("serialize");
        let reloaded = from_yaml(&first).expect("load");
        let second = to_yaml(&reloaded).expect("serialize");
        assert_eq!(first, second);
    }

    #[test]
    fn cyclic_graph_round_trips() {
        let mut graph = Graph::new();
        for v in ["p:t:a", "p:t:b", "p:t:c"] {
            graph.add_vertex(Resource::new(id(v))).expect("vertex");
        }
        graph.add_edge(&id("p:t:a"), &id("p:t:b")).expect("edge");
        graph.add_edge(&id("p:t:b"), &id("p:t:c")).expect("edge");
        graph.add_edge(&id("p:t:c"), &id("p:t:a")).expect("edge");

        let first = to_yaml(&graph).expect("serialize");
        let reloaded = from_yaml(&first).expect("load");
        assert_eq!(reloaded, graph);
        let second = to_yaml(&reloaded).expect("serialize");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_sections_read_as_empty_graph() {
        let graph = from_yaml("resources:\nedges:\n").expect("load");
        assert_eq!(graph.vertex_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn edge_with_undeclared_endpoint_fails() {
        let text = "resources:\n  p:t:a: {}\nedges:\n  p:t:a -> p:t:missing:\n";
        let result = from_yaml(text);
        assert!(matches!(result, Err(OpsError::VertexNotFound(_))));
    }

    #[test]
    fn malformed_edge_key_fails() {
        let text = "resources:\n  p:t:a: {}\nedges:\n  not-an-edge:\n";
        assert!(matches!(
            from_yaml(text),
            Err(OpsError::Serialization(_))
        ));
    }

    #[test]
    fn typed_values_survive_reload_as_text() {
        let mut graph = Graph::new();
        let mut a = Resource::new(id("p:t:a"));
        a.properties
            .insert("Target".to_string(), Value::Ref(id("p:t:b")));
        graph.add_vertex(a).expect("vertex");
        graph.add_vertex(Resource::new(id("p:t:b"))).expect("vertex");

        let text = to_yaml(&graph).expect("serialize");
        let reloaded = from_yaml(&text).expect("load");
        // References emit as their text form and reload as plain strings;
        // re-typing is the knowledge base's coercion step.
        let a = reloaded.vertex(&id("p:t:a")).expect("vertex");
        assert_eq!(a.properties.get("Target"), Some(&Value::from("p:t:b")));
    }

    #[test]
    fn input_document_carries_constraints_and_graph() {
        let text = r"
constraints:
  - scope: application
    operator: add
    node: aws:lambda:fn
resources:
  aws:queue:q: {}
edges: {}
";
        let doc = parse_input(text).expect("parse");
        assert_eq!(doc.constraints.len(), 1);
        assert!(doc.graph.contains_vertex(&id("aws:queue:q")));
    }
}
