//! # Engine Configuration
//!
//! Explicit configuration passed into the `SolutionContext` constructor.
//! There is no ambient global state: callers own the config object, the CLI
//! loads it from a TOML file, and defaults are compiled in.

use serde::{Deserialize, Serialize};

use crate::types::OpsError;

/// Default worker count for the parallel edge-target probe.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 4;

/// Default best-effort overall deadline for one probe run, in milliseconds.
pub const DEFAULT_PROBE_DEADLINE_MS: u64 = 5_000;

/// Default bound on intermediate hops inserted by edge expansion.
pub const DEFAULT_MAX_EXPANSION_HOPS: usize = 8;

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed worker count for the edge-target probe pool.
    pub probe_concurrency: usize,
    /// Best-effort overall deadline for one probe run; partial results are
    /// returned once it passes.
    pub probe_deadline_ms: u64,
    /// Maximum intermediate hops a single edge expansion may insert.
    pub max_expansion_hops: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            probe_deadline_ms: DEFAULT_PROBE_DEADLINE_MS,
            max_expansion_hops: DEFAULT_MAX_EXPANSION_HOPS,
        }
    }
}

impl EngineConfig {
    /// Check the knobs for nonsensical values.
    pub fn validate(&self) -> Result<(), OpsError> {
        if self.probe_concurrency == 0 {
            return Err(OpsError::Config(
                "probe_concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_expansion_hops == 0 {
            return Err(OpsError::Config(
                "max_expansion_hops must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
