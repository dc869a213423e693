//! UNCOORDINATED_LOTS: a receipt lot mostly put away, with stragglers left
//! in a transient location type.

use std::collections::HashMap;

use serde::Deserialize;

use crate::anomaly::AnomalyDraft;
use crate::error::EvaluatorError;
use crate::rules::{Rule, RuleType};
use crate::snapshot::InventorySnapshot;
use crate::virtual_engine::{LocationType, ValidationResult};

use super::{parse_location_type, EvalContext, Evaluator, CANCELLATION_CHECK_INTERVAL};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Conditions {
    completion_threshold: f64,
    location_types: Vec<String>,
    #[serde(default = "default_final_location_types")]
    final_location_types: Vec<String>,
}

fn default_final_location_types() -> Vec<String> {
    vec!["STORAGE".to_string(), "FINAL".to_string()]
}

pub struct UncoordinatedLotsEvaluator;

impl Evaluator for UncoordinatedLotsEvaluator {
    fn evaluate(
        &self,
        rule: &Rule,
        snapshot: &InventorySnapshot,
        ctx: &EvalContext,
    ) -> Result<Vec<AnomalyDraft>, EvaluatorError> {
        let Some(engine) = ctx.engine else {
            return Ok(Vec::new());
        };
        let conditions: Conditions = serde_json::from_value(rule.conditions.clone())
            .map_err(|e| EvaluatorError::MalformedConditions(e.to_string()))?;

        let straggler_types: Vec<LocationType> =
            conditions.location_types.iter().filter_map(|s| parse_location_type(s)).collect();
        // Unrecognized tokens like a bare "FINAL" synonym fold out silently;
        // only types the engine actually knows about count toward completion.
        let final_types: Vec<LocationType> =
            conditions.final_location_types.iter().filter_map(|s| parse_location_type(s)).collect();

        let mut by_lot: HashMap<&str, Vec<&crate::snapshot::Pallet>> = HashMap::new();
        for pallet in &snapshot.pallets {
            by_lot.entry(pallet.receipt_number.as_str()).or_default().push(pallet);
        }

        let mut anomalies = Vec::new();
        let mut rows_since_check = 0usize;
        for (lot, pallets) in by_lot {
            rows_since_check += pallets.len();
            if rows_since_check >= CANCELLATION_CHECK_INTERVAL {
                if ctx.is_cancelled() {
                    return Err(EvaluatorError::Cancelled);
                }
                rows_since_check = 0;
            }
            if pallets.len() < 2 {
                continue;
            }
            let classify = |p: &crate::snapshot::Pallet| -> Option<LocationType> {
                match engine.validate(&crate::location::to_canonical(&p.location)) {
                    ValidationResult::Valid { location_type, .. } => Some(location_type),
                    _ => None,
                }
            };

            let final_count =
                pallets.iter().filter(|p| classify(p).is_some_and(|t| final_types.contains(&t))).count();
            let fraction = final_count as f64 / pallets.len() as f64;
            if fraction < conditions.completion_threshold {
                continue;
            }

            for pallet in &pallets {
                if classify(pallet).is_some_and(|t| straggler_types.contains(&t)) {
                    anomalies.push(AnomalyDraft::new(
                        &pallet.pallet_id,
                        &pallet.location,
                        "uncoordinated_lot",
                        format!(
                            "lot {lot} is {:.0}% complete but pallet {} is still at {}",
                            fraction * 100.0,
                            pallet.pallet_id,
                            pallet.location
                        ),
                    ).with_detail("lot", lot).with_detail("completionFraction", fraction));
                }
            }
        }
        Ok(anomalies)
    }

    fn rule_type(&self) -> RuleType {
        RuleType::UncoordinatedLots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleCategory, RuleSeverity, RuleType};
    use crate::snapshot::Pallet;
    use crate::virtual_engine::{SpecialArea, SpecialAreaType, VirtualEngine, WarehouseTemplate};
    use crate::warehouse::{Confidence, WarehouseContext};

    fn rule(threshold: f64) -> Rule {
        Rule {
            id: "r1".to_string(),
            name: "Uncoordinated lot".to_string(),
            rule_type: RuleType::UncoordinatedLots,
            category_priority: RuleCategory::FlowTime,
            severity: RuleSeverity::Medium,
            is_active: true,
            conditions: serde_json::json!({
                "completionThreshold": threshold,
                "locationTypes": ["RECEIVING"],
                "finalLocationTypes": ["STORAGE"],
            }),
            parameters: serde_json::json!({}),
        }
    }

    fn template() -> WarehouseTemplate {
        WarehouseTemplate {
            warehouse_id: "W".to_string(),
            num_aisles: 5,
            racks_per_aisle: 5,
            positions_per_rack: 50,
            levels_per_position: 4,
            level_names: "ABCD".to_string(),
            default_pallet_capacity: 1,
            special_areas: vec![SpecialArea {
                code: "RECV-01".to_string(),
                area_type: SpecialAreaType::Receiving,
                capacity: 10,
                zone: "dock".to_string(),
            }],
        }
    }

    fn lot_snapshot() -> InventorySnapshot {
        let mut pallets: Vec<Pallet> = (1..=8)
            .map(|i| Pallet {
                pallet_id: format!("S{i}"),
                location: format!("01-01-{i:03}A"),
                creation_date: 0,
                receipt_number: "R7".to_string(),
                description: "widgets".to_string(),
            })
            .collect();
        pallets.push(Pallet {
            pallet_id: "R1".to_string(),
            location: "RECV-01".to_string(),
            creation_date: 0,
            receipt_number: "R7".to_string(),
            description: "widgets".to_string(),
        });
        pallets.push(Pallet {
            pallet_id: "R2".to_string(),
            location: "RECV-01".to_string(),
            creation_date: 0,
            receipt_number: "R7".to_string(),
            description: "widgets".to_string(),
        });
        InventorySnapshot { pallets }
    }

    #[test]
    fn s6_eighty_percent_threshold_flags_both_stragglers() {
        let engine = VirtualEngine::build(template()).unwrap();
        let warehouse = WarehouseContext {
            warehouse_id: Some("W".to_string()),
            confidence: Confidence::VeryHigh,
            coverage: 1.0,
            detection_method: "test",
        };
        let ctx = EvalContext { engine: Some(&engine), warehouse: &warehouse, now: 0, obvious_violation_multiplier: 2.0, cancellation: tokio_util::sync::CancellationToken::new() };
        let anomalies = UncoordinatedLotsEvaluator.evaluate(&rule(0.8), &lot_snapshot(), &ctx).unwrap();
        assert_eq!(anomalies.len(), 2);
    }

    #[test]
    fn s6_ninety_percent_threshold_flags_none() {
        let engine = VirtualEngine::build(template()).unwrap();
        let warehouse = WarehouseContext {
            warehouse_id: Some("W".to_string()),
            confidence: Confidence::VeryHigh,
            coverage: 1.0,
            detection_method: "test",
        };
        let ctx = EvalContext { engine: Some(&engine), warehouse: &warehouse, now: 0, obvious_violation_multiplier: 2.0, cancellation: tokio_util::sync::CancellationToken::new() };
        let anomalies = UncoordinatedLotsEvaluator.evaluate(&rule(0.9), &lot_snapshot(), &ctx).unwrap();
        assert!(anomalies.is_empty());
    }

    #[test]
    fn cancellation_is_observed_mid_grouping() {
        let engine = VirtualEngine::build(template()).unwrap();
        let warehouse = WarehouseContext {
            warehouse_id: Some("W".to_string()),
            confidence: Confidence::VeryHigh,
            coverage: 1.0,
            detection_method: "test",
        };
        let token = tokio_util::sync::CancellationToken::new();
        token.cancel();
        let ctx =
            EvalContext { engine: Some(&engine), warehouse: &warehouse, now: 0, obvious_violation_multiplier: 2.0, cancellation: token };
        let huge_lot: Vec<Pallet> = (0..CANCELLATION_CHECK_INTERVAL)
            .map(|i| Pallet {
                pallet_id: format!("P{i}"),
                location: "RECV-01".to_string(),
                creation_date: 0,
                receipt_number: "R-HUGE".to_string(),
                description: "widgets".to_string(),
            })
            .collect();
        let snapshot = InventorySnapshot { pallets: huge_lot };
        let result = UncoordinatedLotsEvaluator.evaluate(&rule(0.8), &snapshot, &ctx);
        assert_eq!(result, Err(EvaluatorError::Cancelled));
    }
}
