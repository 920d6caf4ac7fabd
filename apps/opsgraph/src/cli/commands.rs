//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use opsgraph_core::{
    parse_input, to_yaml, valid_edge_targets, CatalogKnowledgeBase, EngineConfig, OpsError,
    ResourceId, SolutionContext,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for catalogs and input documents (50 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_INPUT_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), OpsError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| OpsError::Io(format!("Cannot read file metadata: {e}")))?;

    if metadata.len() > max_size {
        return Err(OpsError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input file path.
///
/// Canonicalizes the path to resolve symlinks and "..", ensures it exists
/// and is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, OpsError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| OpsError::Io(format!("Invalid file path '{}': {e}", path.display())))?;

    if !canonical.is_file() {
        return Err(OpsError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, OpsError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        OpsError::Io(format!(
            "Invalid output directory '{}': {e}",
            parent.display()
        ))
    })?;

    let filename = path
        .file_name()
        .ok_or_else(|| OpsError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn read_to_string(path: &Path, what: &str) -> Result<String, OpsError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, MAX_INPUT_FILE_SIZE)?;
    std::fs::read_to_string(&path)
        .map_err(|e| OpsError::Io(format!("Cannot read {what} '{}': {e}", path.display())))
}

// =============================================================================
// LOADING
// =============================================================================

fn load_catalog(path: &Path) -> Result<Arc<CatalogKnowledgeBase>, OpsError> {
    let text = read_to_string(path, "catalog")?;
    let catalog = CatalogKnowledgeBase::from_yaml(&text)?;
    tracing::info!(
        resources = catalog.resource_count(),
        edges = catalog.edge_count(),
        "catalog loaded"
    );
    Ok(Arc::new(catalog))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, OpsError> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = read_to_string(path, "engine configuration")?;
    let config: EngineConfig =
        toml::from_str(&text).map_err(|e| OpsError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

fn build_context(
    catalog: &Path,
    config: Option<&Path>,
) -> Result<SolutionContext, OpsError> {
    SolutionContext::new(load_catalog(catalog)?, load_config(config)?)
}

// =============================================================================
// SOLVE COMMAND
// =============================================================================

/// Apply an input document's constraints to its initial graph and emit the
/// resulting operational graph.
pub fn cmd_solve(
    catalog: &Path,
    config: Option<&Path>,
    file: &Path,
    output: Option<&Path>,
) -> Result<(), OpsError> {
    let mut ctx = build_context(catalog, config)?;
    let doc = parse_input(&read_to_string(file, "input document")?)?;

    tracing::info!(
        resources = doc.graph.vertex_count(),
        constraints = doc.constraints.len(),
        "solving"
    );
    ctx.load_graph(&doc.graph)?;
    ctx.apply_constraints(doc.constraints)?;

    let errors: Vec<OpsError> = ctx
        .unsatisfied_constraints()
        .iter()
        .map(|c| OpsError::ConstraintValidation(format!("unsatisfied after solve: {c:?}")))
        .collect();
    OpsError::aggregate(errors)?;

    let text = to_yaml(ctx.dataflow())?;
    match output {
        Some(path) => {
            let path = validate_output_path(path)?;
            std::fs::write(&path, &text)
                .map_err(|e| OpsError::Io(format!("Cannot write '{}': {e}", path.display())))?;
            println!("Wrote {} resources to {}", ctx.dataflow().vertex_count(), path.display());
        }
        None => print!("{text}"),
    }
    tracing::info!(decisions = ctx.decisions().len(), "solve complete");
    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Verify an input document's constraints against its graph as-is.
pub fn cmd_check(catalog: &Path, config: Option<&Path>, file: &Path) -> Result<(), OpsError> {
    let mut ctx = build_context(catalog, config)?;
    let doc = parse_input(&read_to_string(file, "input document")?)?;
    ctx.load_graph(&doc.graph)?;
    ctx.load_constraints(doc.constraints);

    let unsatisfied = ctx.unsatisfied_constraints();
    if unsatisfied.is_empty() {
        println!(
            "OK: {} constraints hold over {} resources",
            ctx.constraints().len(),
            ctx.dataflow().vertex_count()
        );
        Ok(())
    } else {
        for constraint in &unsatisfied {
            println!("UNSATISFIED: {constraint:?}");
        }
        Err(OpsError::ConstraintValidation(format!(
            "{} of {} constraints unsatisfied",
            unsatisfied.len(),
            ctx.constraints().len()
        )))
    }
}

// =============================================================================
// TARGETS COMMAND
// =============================================================================

/// Probe every resource in the graph as a connection target for `source`.
pub fn cmd_targets(
    catalog: &Path,
    config: Option<&Path>,
    file: &Path,
    source: &str,
    json_mode: bool,
) -> Result<(), OpsError> {
    let mut ctx = build_context(catalog, config)?;
    let doc = parse_input(&read_to_string(file, "graph document")?)?;
    ctx.load_graph(&doc.graph)?;

    let source: ResourceId = source.parse()?;
    if !ctx.dataflow().contains_vertex(&source) {
        return Err(OpsError::VertexNotFound(source));
    }
    let candidates: Vec<(ResourceId, ResourceId)> = ctx
        .dataflow()
        .vertex_ids()
        .filter(|id| **id != source)
        .map(|id| (source.clone(), id.clone()))
        .collect();
    let connectable = valid_edge_targets(&ctx, &candidates)?;

    if json_mode {
        let targets: Vec<String> = connectable.iter().map(|(_, to)| to.to_string()).collect();
        let body = serde_json::to_string_pretty(&targets)
            .map_err(|e| OpsError::Serialization(e.to_string()))?;
        println!("{body}");
    } else {
        println!("{} can connect to:", source);
        for (_, to) in &connectable {
            println!("  {to}");
        }
        if connectable.is_empty() {
            println!("  (nothing)");
        }
    }
    Ok(())
}

// =============================================================================
// ORDER COMMAND
// =============================================================================

/// Print the deployment (or teardown) order of a graph document.
pub fn cmd_order(file: &Path, reverse: bool, json_mode: bool) -> Result<(), OpsError> {
    let doc = parse_input(&read_to_string(file, "graph document")?)?;
    let order = if reverse {
        doc.graph.reverse_topological_sort()
    } else {
        doc.graph.topological_sort()
    };

    if json_mode {
        let ids: Vec<String> = order.iter().map(ToString::to_string).collect();
        let body = serde_json::to_string_pretty(&ids)
            .map_err(|e| OpsError::Serialization(e.to_string()))?;
        println!("{body}");
    } else {
        for (i, id) in order.iter().enumerate() {
            println!("{:>4}. {id}", i.saturating_add(1));
        }
    }
    Ok(())
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Print a graph document back out in canonical form with its stats.
pub fn cmd_show(file: &Path, json_mode: bool) -> Result<(), OpsError> {
    let doc = parse_input(&read_to_string(file, "graph document")?)?;

    if json_mode {
        let stats = serde_json::json!({
            "resources": doc.graph.vertex_count(),
            "edges": doc.graph.edge_count(),
            "constraints": doc.constraints.len(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&stats)
                .map_err(|e| OpsError::Serialization(e.to_string()))?
        );
    } else {
        println!(
            "Resources: {}  Edges: {}  Constraints: {}",
            doc.graph.vertex_count(),
            doc.graph.edge_count(),
            doc.constraints.len()
        );
        println!();
        print!("{}", to_yaml(&doc.graph)?);
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
