//! Engine configuration discovery and parsing.
//!
//! Reads an optional `warehouse-anomaly.toml` (or `.warehouse-anomaly.toml`)
//! file and produces an [`EngineConfig`] that overrides the orchestrator's
//! defaults (spec.md §6, "Configuration").
//!
//! # File format
//!
//! ```toml
//! per_rule_timeout_ms = 30000
//! canonical_cache_size = 10000
//! parallel_evaluators = 8
//! obvious_violation_multiplier = 2.0
//!
//! [warehouse_confidence_thresholds]
//! very_high_coverage = 0.80
//! very_high_min_valid = 5
//! high_coverage = 0.60
//! high_min_valid = 3
//! medium_coverage = 0.30
//! medium_min_valid = 2
//! low_coverage = 0.15
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::warehouse::ConfidenceThresholds;

const CONFIG_FILE_NAMES: [&str; 2] = ["warehouse-anomaly.toml", ".warehouse-anomaly.toml"];

/// Tunables recognized by the orchestrator (spec.md §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    #[serde(default = "default_timeout_ms")]
    pub per_rule_timeout_ms: u64,
    #[serde(default = "default_cache_size")]
    pub canonical_cache_size: usize,
    #[serde(default = "default_parallel_evaluators")]
    pub parallel_evaluators: usize,
    #[serde(default = "default_obvious_violation_multiplier")]
    pub obvious_violation_multiplier: f64,
    #[serde(default)]
    pub warehouse_confidence_thresholds: ConfidenceThresholds,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_cache_size() -> usize {
    10_000
}

fn default_parallel_evaluators() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

fn default_obvious_violation_multiplier() -> f64 {
    2.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            per_rule_timeout_ms: default_timeout_ms(),
            canonical_cache_size: default_cache_size(),
            parallel_evaluators: default_parallel_evaluators(),
            obvious_violation_multiplier: default_obvious_violation_multiplier(),
            warehouse_confidence_thresholds: ConfidenceThresholds::default(),
        }
    }
}

/// Load an [`EngineConfig`] from a specific TOML file.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Walk up from `start_dir` looking for the nearest recognized config file
/// name; fall back to [`EngineConfig::default`] if none is found.
pub fn discover_config(start_dir: &Path) -> Result<EngineConfig> {
    match find_config_file(start_dir) {
        Some(path) => load_config(&path),
        None => Ok(EngineConfig::default()),
    }
}

fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = if start_dir.is_file() { start_dir.parent()?.to_path_buf() } else { start_dir.to_path_buf() };

    loop {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if !dir.pop() {
            return None;
        }
    }
}
