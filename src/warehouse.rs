//! Warehouse Context Resolver (C3).
//!
//! Given an inventory snapshot and a list of candidate warehouses, picks
//! the warehouse whose virtual universe best *covers* the observed
//! locations — not the warehouse with the most total slots, but the one
//! where this inventory actually lives.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::location::to_canonical;
use crate::snapshot::InventorySnapshot;
use crate::virtual_engine::{ValidationResult, WarehouseTemplate};

/// How confident the resolver is in its chosen warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    None,
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

/// The thresholds from spec.md §4.3, overridable via [`crate::config::EngineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    pub very_high_coverage: f64,
    pub very_high_min_valid: u32,
    pub high_coverage: f64,
    pub high_min_valid: u32,
    pub medium_coverage: f64,
    pub medium_min_valid: u32,
    pub low_coverage: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            very_high_coverage: 0.80,
            very_high_min_valid: 5,
            high_coverage: 0.60,
            high_min_valid: 3,
            medium_coverage: 0.30,
            medium_min_valid: 2,
            low_coverage: 0.15,
        }
    }
}

impl ConfidenceThresholds {
    fn classify(&self, coverage: f64, valid: u32) -> Confidence {
        if coverage >= self.very_high_coverage && valid >= self.very_high_min_valid {
            Confidence::VeryHigh
        } else if coverage >= self.high_coverage && valid >= self.high_min_valid {
            Confidence::High
        } else if coverage >= self.medium_coverage && valid >= self.medium_min_valid {
            Confidence::Medium
        } else if coverage >= self.low_coverage {
            Confidence::Low
        } else {
            Confidence::VeryLow
        }
    }
}

/// The resolved outcome of a single `resolve` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseContext {
    pub warehouse_id: Option<String>,
    pub confidence: Confidence,
    pub coverage: f64,
    pub detection_method: &'static str,
}

/// One warehouse the resolver may choose among, paired with its template.
pub struct CandidateWarehouse {
    pub template: WarehouseTemplate,
}

/// Resolve which warehouse an inventory snapshot belongs to.
///
/// `preferred_warehouse_id` is a caller-supplied hint used only to break
/// ties among candidates at `coverage == 1.0`; it must never manufacture a
/// match when no candidate actually covers any location (spec.md §9,
/// "Warehouse inference caveat").
pub fn resolve(
    snapshot: &InventorySnapshot,
    candidates: &[CandidateWarehouse],
    thresholds: &ConfidenceThresholds,
    preferred_warehouse_id: Option<&str>,
) -> WarehouseContext {
    let locations: HashSet<&str> = snapshot
        .pallets
        .iter()
        .map(|p| p.location.as_str())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if locations.is_empty() || candidates.is_empty() {
        return WarehouseContext {
            warehouse_id: None,
            confidence: Confidence::None,
            coverage: 0.0,
            detection_method: "no_candidates_or_locations",
        };
    }

    let canonicals: Vec<_> = locations.iter().map(|l| to_canonical(l)).collect();

    let mut best: Option<(String, u32, f64)> = None;
    for candidate in candidates {
        let Ok(engine) = crate::virtual_engine::cached_engine(&candidate.template) else {
            continue;
        };
        let valid = canonicals
            .iter()
            .filter(|c| matches!(engine.validate(c), ValidationResult::Valid { .. }))
            .count() as u32;
        let coverage = f64::from(valid) / locations.len() as f64;

        let better = match &best {
            None => true,
            Some((best_id, best_valid, best_coverage)) => {
                coverage > *best_coverage
                    || (coverage == *best_coverage && valid > *best_valid)
                    || (coverage == *best_coverage
                        && valid == *best_valid
                        && candidate.template.warehouse_id < *best_id)
            }
        };
        if better {
            best = Some((candidate.template.warehouse_id.clone(), valid, coverage));
        }
    }

    let Some((mut warehouse_id, valid, coverage)) = best else {
        return WarehouseContext {
            warehouse_id: None,
            confidence: Confidence::None,
            coverage: 0.0,
            detection_method: "no_valid_template",
        };
    };

    if coverage == 0.0 {
        return WarehouseContext {
            warehouse_id: None,
            confidence: Confidence::None,
            coverage: 0.0,
            detection_method: "zero_coverage",
        };
    }

    // A preferred hint only breaks a tie at perfect coverage; it never
    // invents a match that coverage didn't already establish.
    if coverage == 1.0 {
        if let Some(preferred) = preferred_warehouse_id {
            if candidates.iter().any(|c| c.template.warehouse_id == preferred) {
                warehouse_id = preferred.to_string();
            }
        }
    }

    WarehouseContext {
        warehouse_id: Some(warehouse_id),
        confidence: thresholds.classify(coverage, valid),
        coverage,
        detection_method: "coverage_argmax",
    }
}
