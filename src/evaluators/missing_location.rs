//! MISSING_LOCATION: rows whose location is null, empty, or the literal
//! string `"NAN"` (a common spreadsheet-export artifact).

use crate::anomaly::AnomalyDraft;
use crate::error::EvaluatorError;
use crate::rules::{Rule, RuleType};
use crate::snapshot::InventorySnapshot;

use super::{EvalContext, Evaluator};

pub struct MissingLocationEvaluator;

impl Evaluator for MissingLocationEvaluator {
    fn evaluate(
        &self,
        _rule: &Rule,
        snapshot: &InventorySnapshot,
        _ctx: &EvalContext,
    ) -> Result<Vec<AnomalyDraft>, EvaluatorError> {
        let anomalies = snapshot
            .pallets
            .iter()
            .filter(|p| is_missing(&p.location))
            .map(|p| {
                AnomalyDraft::new(
                    &p.pallet_id,
                    &p.location,
                    "missing_location",
                    format!("pallet {} has no recorded location", p.pallet_id),
                )
            })
            .collect();
        Ok(anomalies)
    }

    fn rule_type(&self) -> RuleType {
        RuleType::MissingLocation
    }
}

fn is_missing(location: &str) -> bool {
    let trimmed = location.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleCategory, RuleSeverity, RuleType};
    use crate::snapshot::Pallet;
    use crate::warehouse::{Confidence, WarehouseContext};

    fn rule() -> Rule {
        Rule {
            id: "r1".to_string(),
            name: "Missing location".to_string(),
            rule_type: RuleType::MissingLocation,
            category_priority: RuleCategory::Space,
            severity: RuleSeverity::High,
            is_active: true,
            conditions: serde_json::json!({}),
            parameters: serde_json::json!({}),
        }
    }

    #[test]
    fn empty_and_nan_locations_are_flagged() {
        let warehouse = WarehouseContext {
            warehouse_id: None,
            confidence: Confidence::None,
            coverage: 0.0,
            detection_method: "test",
        };
        let eval_ctx = EvalContext { engine: None, warehouse: &warehouse, now: 0, obvious_violation_multiplier: 2.0, cancellation: tokio_util::sync::CancellationToken::new() };
        let snapshot = InventorySnapshot {
            pallets: vec![
                Pallet { pallet_id: "P1".to_string(), location: "".to_string(), creation_date: 0, receipt_number: "R1".to_string(), description: "x".to_string() },
                Pallet { pallet_id: "P2".to_string(), location: "NAN".to_string(), creation_date: 0, receipt_number: "R1".to_string(), description: "x".to_string() },
                Pallet { pallet_id: "P3".to_string(), location: "01-01-001A".to_string(), creation_date: 0, receipt_number: "R1".to_string(), description: "x".to_string() },
            ],
        };
        let anomalies = MissingLocationEvaluator.evaluate(&rule(), &snapshot, &eval_ctx).unwrap();
        assert_eq!(anomalies.len(), 2);
    }
}
