//! DATA_INTEGRITY: duplicate scans and malformed location strings. Runs
//! regardless of warehouse resolution — it checks the rows themselves, not
//! their location validity against a template.

use std::collections::HashMap;

use serde::Deserialize;

use crate::anomaly::AnomalyDraft;
use crate::error::EvaluatorError;
use crate::rules::{Rule, RuleType};
use crate::snapshot::InventorySnapshot;

use super::{EvalContext, Evaluator};

const IMPOSSIBLE_CHARS: [char; 4] = ['@', '#', '!', '?'];
const MAX_LOCATION_LEN: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Conditions {
    #[serde(default = "default_true")]
    check_duplicate_scans: bool,
    #[serde(default = "default_true")]
    check_impossible_locations: bool,
}

fn default_true() -> bool {
    true
}

pub struct DataIntegrityEvaluator;

impl Evaluator for DataIntegrityEvaluator {
    fn evaluate(
        &self,
        rule: &Rule,
        snapshot: &InventorySnapshot,
        _ctx: &EvalContext,
    ) -> Result<Vec<AnomalyDraft>, EvaluatorError> {
        let conditions: Conditions = serde_json::from_value(rule.conditions.clone())
            .map_err(|e| EvaluatorError::MalformedConditions(e.to_string()))?;

        let mut anomalies = Vec::new();

        if conditions.check_duplicate_scans {
            let mut counts: HashMap<&str, u32> = HashMap::new();
            for pallet in &snapshot.pallets {
                *counts.entry(pallet.pallet_id.as_str()).or_default() += 1;
            }
            for pallet in &snapshot.pallets {
                if counts.get(pallet.pallet_id.as_str()).copied().unwrap_or(0) >= 2 {
                    anomalies.push(AnomalyDraft::new(
                        &pallet.pallet_id,
                        &pallet.location,
                        "duplicate_scan",
                        format!("pallet id {} appears more than once in the snapshot", pallet.pallet_id),
                    ));
                }
            }
        }

        if conditions.check_impossible_locations {
            for pallet in &snapshot.pallets {
                let impossible = pallet.location.chars().count() > MAX_LOCATION_LEN
                    || pallet.location.chars().any(|c| IMPOSSIBLE_CHARS.contains(&c));
                if impossible {
                    anomalies.push(AnomalyDraft::new(
                        &pallet.pallet_id,
                        &pallet.location,
                        "impossible_location",
                        format!("location string {:?} is malformed", pallet.location),
                    ));
                }
            }
        }

        Ok(anomalies)
    }

    fn rule_type(&self) -> RuleType {
        RuleType::DataIntegrity
    }
}
