//! INVALID_LOCATION: locations that don't exist in the resolved warehouse's
//! virtual universe, or that couldn't be parsed at all.

use std::collections::HashMap;

use crate::anomaly::AnomalyDraft;
use crate::error::EvaluatorError;
use crate::rules::{Rule, RuleType};
use crate::snapshot::{InventorySnapshot, Pallet};
use crate::virtual_engine::ValidationResult;

use super::{EvalContext, Evaluator};

pub struct InvalidLocationEvaluator;

impl Evaluator for InvalidLocationEvaluator {
    fn evaluate(
        &self,
        _rule: &Rule,
        snapshot: &InventorySnapshot,
        ctx: &EvalContext,
    ) -> Result<Vec<AnomalyDraft>, EvaluatorError> {
        let Some(engine) = ctx.engine else {
            return Ok(Vec::new());
        };

        let mut by_location: HashMap<&str, Vec<&Pallet>> = HashMap::new();
        for pallet in &snapshot.pallets {
            if pallet.location.trim().is_empty() {
                continue;
            }
            by_location.entry(pallet.location.as_str()).or_default().push(pallet);
        }

        let mut anomalies = Vec::new();
        for (location, pallets) in by_location {
            let parsed = crate::location::to_canonical(location);
            let reason = match engine.validate(&parsed) {
                ValidationResult::Valid { .. } => continue,
                ValidationResult::NotInUniverse => "not in the warehouse's virtual universe",
                ValidationResult::Unparseable(_) => "could not be parsed as a location code",
            };
            for pallet in pallets {
                anomalies.push(AnomalyDraft::new(
                    &pallet.pallet_id,
                    location,
                    "invalid_location",
                    format!("location {location} is invalid: {reason}"),
                ));
            }
        }
        Ok(anomalies)
    }

    fn rule_type(&self) -> RuleType {
        RuleType::InvalidLocation
    }
}
