//! # opsgraph-core
//!
//! The deterministic resource-graph engine for OpsGraph - THE LOGIC.
//!
//! This crate turns an abstract infrastructure topology plus a set of
//! intent constraints into a concrete, operational resource graph. It owns
//! the graph algorithms, the constraint model, path selection and edge
//! expansion, and the reconciler that keeps removal cascades consistent.
//!
//! ## Architectural Constraints
//!
//! The core:
//! - Is deterministic: `BTreeMap`/`BTreeSet` everywhere, ties broken by
//!   resource id, identical inputs produce identical outputs
//! - Is closed over its knowledge base: all provider semantics enter
//!   through the [`KnowledgeBase`] trait, never hardcoded
//! - Does no I/O: files and stdio live in the app layer; the boundary here
//!   is YAML text in, YAML text out
//! - Has NO async; the only parallelism is the read-only edge-target probe

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod constraints;
pub mod graph;
pub mod knowledge;
pub mod paths;
pub mod properties;
pub mod reconciler;
pub mod serial;
pub mod solution;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Decision, DecisionRecord, OpsError, PropertyBag, PropertyRef, Resource, ResourceId, TypeRef,
    Value,
};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use config::EngineConfig;
pub use constraints::{
    ApplicationOperator, Constraint, ConstructMapping, ConstructOperator, EdgeOperator,
    EdgeTarget, ResourceOperator, parse_constraints,
};
pub use graph::Graph;
pub use knowledge::{
    CatalogKnowledgeBase, Classification, DeletionCriteria, EdgeTemplate, Functionality,
    KnowledgeBase, OperationalRule, PathSatisfaction, PropertyRule, ResourceTemplate,
    coerce_value,
};
pub use paths::{ProbeResult, can_connect, expand_edge, valid_edge_targets};
pub use properties::{PropertyPath, Walk, walk_properties};
pub use reconciler::{RemovalOutcome, remove_path, remove_resource};
pub use serial::{InputDocument, from_yaml, parse_input, to_yaml};
pub use solution::{GraphPair, OperationalView, RawView, SolutionContext};
