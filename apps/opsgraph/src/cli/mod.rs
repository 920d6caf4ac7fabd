//! # OpsGraph CLI Module
//!
//! This module implements the CLI interface for OpsGraph.
//!
//! ## Available Commands
//!
//! - `solve` - Apply constraints to a topology and emit the operational graph
//! - `check` - Verify constraints against an existing graph
//! - `targets` - Probe which resources a source can connect to
//! - `order` - Print the deployment order of a graph
//! - `show` - Pretty-print a graph document with its decision-relevant stats

mod commands;

use clap::{Parser, Subcommand};
use opsgraph_core::OpsError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// OpsGraph - Resource Graph Solver
///
/// Turns an abstract infrastructure topology plus intent constraints into a
/// concrete, deterministic, operational resource graph.
#[derive(Parser, Debug)]
#[command(name = "opsgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the provider catalog (knowledge base) YAML
    #[arg(short = 'k', long, global = true, default_value = "catalog.yaml")]
    pub catalog: PathBuf,

    /// Path to an engine configuration TOML (optional)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply constraints to a topology and emit the operational graph
    Solve {
        /// Path to the input document (initial graph + constraints)
        #[arg(short, long)]
        file: PathBuf,

        /// Path for the output graph document (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify constraints against an existing graph without solving
    Check {
        /// Path to the input document (graph + constraints)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Probe which resources a source can connect to
    Targets {
        /// Path to the graph document
        #[arg(short, long)]
        file: PathBuf,

        /// Source resource id
        #[arg(short, long)]
        source: String,
    },

    /// Print the deployment order of a graph
    Order {
        /// Path to the graph document
        #[arg(short, long)]
        file: PathBuf,

        /// Print the reverse (teardown) order instead
        #[arg(short, long)]
        reverse: bool,
    },

    /// Show a graph document with its stats
    Show {
        /// Path to the graph document
        #[arg(short, long)]
        file: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Dispatch the parsed CLI to its command implementation.
pub fn execute(cli: Cli) -> Result<(), OpsError> {
    let Some(command) = cli.command else {
        println!("No command specified. Use --help for usage information.");
        return Ok(());
    };

    if cli.verbose {
        tracing::info!(catalog = %cli.catalog.display(), "starting");
    }

    match command {
        Commands::Solve { file, output } => {
            cmd_solve(&cli.catalog, cli.config.as_deref(), &file, output.as_deref())
        }
        Commands::Check { file } => cmd_check(&cli.catalog, cli.config.as_deref(), &file),
        Commands::Targets { file, source } => {
            cmd_targets(&cli.catalog, cli.config.as_deref(), &file, &source, cli.json_mode)
        }
        Commands::Order { file, reverse } => cmd_order(&file, reverse, cli.json_mode),
        Commands::Show { file } => cmd_show(&file, cli.json_mode),
    }
}
