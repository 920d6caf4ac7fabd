//! # OpsGraph - Resource Graph Solver
//!
//! The main binary for the OpsGraph deterministic resource-graph engine.
//!
//! This application provides:
//! - CLI interface for solving, checking and inspecting resource graphs
//! - File I/O for catalogs, graphs and constraint documents
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------+
//! |                apps/opsgraph (THE BINARY)               |
//! |                                                         |
//! |   +-------------+              +------------------+     |
//! |   |    CLI      |              |     File I/O     |     |
//! |   |   (clap)    |              | (yaml/toml load) |     |
//! |   +------+------+              +---------+--------+     |
//! |          |                               |              |
//! |          +---------------+---------------+              |
//! |                          v                              |
//! |                 +-----------------+                     |
//! |                 |  opsgraph-core  |                     |
//! |                 |   (THE LOGIC)   |                     |
//! |                 +-----------------+                     |
//! +---------------------------------------------------------+
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Solve a topology against a catalog
//! opsgraph solve -k catalog.yaml -f input.yaml -o out.yaml
//!
//! # Verify constraints against an existing graph
//! opsgraph check -k catalog.yaml -f input.yaml
//!
//! # Probe which targets a resource can connect to
//! opsgraph targets -k catalog.yaml -f graph.yaml -s aws:lambda:fn
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Initialize tracing — OPSGRAPH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("OPSGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "opsgraph=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
