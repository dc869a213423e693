//! LOCATION_SPECIFIC_STAGNANT: pallets aged past a threshold at any
//! location matching a glob, independent of the resolved warehouse.

use serde::Deserialize;

use crate::anomaly::AnomalyDraft;
use crate::error::EvaluatorError;
use crate::rules::{Rule, RuleType};
use crate::snapshot::InventorySnapshot;

use super::{glob_match, EvalContext, Evaluator};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Conditions {
    location_pattern: String,
    time_threshold_hours: f64,
}

pub struct LocationSpecificStagnantEvaluator;

impl Evaluator for LocationSpecificStagnantEvaluator {
    fn evaluate(
        &self,
        rule: &Rule,
        snapshot: &InventorySnapshot,
        ctx: &EvalContext,
    ) -> Result<Vec<AnomalyDraft>, EvaluatorError> {
        let conditions: Conditions = serde_json::from_value(rule.conditions.clone())
            .map_err(|e| EvaluatorError::MalformedConditions(e.to_string()))?;
        let threshold_secs = (conditions.time_threshold_hours * 3600.0) as i64;

        let mut anomalies = Vec::new();
        for pallet in &snapshot.pallets {
            if !glob_match(&conditions.location_pattern, &pallet.location) {
                continue;
            }
            let age = ctx.now - pallet.creation_date;
            if age > threshold_secs {
                anomalies.push(
                    AnomalyDraft::new(
                        &pallet.pallet_id,
                        &pallet.location,
                        "location_specific_stagnant",
                        format!(
                            "pallet {} matches pattern {} and has aged {:.1}h past the {:.1}h threshold",
                            pallet.pallet_id,
                            conditions.location_pattern,
                            age as f64 / 3600.0,
                            conditions.time_threshold_hours
                        ),
                    )
                    .with_detail("ageHours", age as f64 / 3600.0),
                );
            }
        }
        Ok(anomalies)
    }

    fn rule_type(&self) -> RuleType {
        RuleType::LocationSpecificStagnant
    }
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
            name: "Frozen dock stagnant".to_string(),
            rule_type: RuleType::LocationSpecificStagnant,
            category_priority: RuleCategory::FlowTime,
            severity: RuleSeverity::Medium,
            is_active: true,
            conditions: serde_json::json!({"locationPattern": "DOCK-*", "timeThresholdHours": 4.0}),
            parameters: serde_json::json!({}),
        }
    }

    #[test]
    fn matches_glob_and_age_without_needing_an_engine() {
        let now = 10 * 3600;
        let snapshot = InventorySnapshot {
            pallets: vec![
                Pallet {
                    pallet_id: "P1".to_string(),
                    location: "DOCK-03".to_string(),
                    creation_date: now - 6 * 3600,
                    receipt_number: "R1".to_string(),
                    description: "x".to_string(),
                },
                Pallet {
                    pallet_id: "P2".to_string(),
                    location: "RECV-01".to_string(),
                    creation_date: now - 6 * 3600,
                    receipt_number: "R1".to_string(),
                    description: "x".to_string(),
                },
            ],
        };
        let warehouse = WarehouseContext {
            warehouse_id: None,
            confidence: Confidence::None,
            coverage: 0.0,
            detection_method: "test",
        };
        let ctx = EvalContext { engine: None, warehouse: &warehouse, now, obvious_violation_multiplier: 2.0, cancellation: tokio_util::sync::CancellationToken::new() };
        let anomalies = LocationSpecificStagnantEvaluator.evaluate(&rule(), &snapshot, &ctx).unwrap();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].pallet_id, "P1");
    }
}
