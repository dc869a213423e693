//! STAGNANT_PALLETS: pallets parked too long in transient location types.

use serde::Deserialize;

use crate::anomaly::AnomalyDraft;
use crate::error::EvaluatorError;
use crate::rules::{Rule, RuleType};
use crate::snapshot::InventorySnapshot;
use crate::virtual_engine::{LocationType, ValidationResult};

use super::{parse_location_type, EvalContext, Evaluator};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Conditions {
    location_types: Vec<String>,
    time_threshold_hours: f64,
    #[serde(default)]
    excluded_locations: Vec<String>,
}

pub struct StagnantPalletsEvaluator;

impl Evaluator for StagnantPalletsEvaluator {
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

        let included: Vec<LocationType> =
            conditions.location_types.iter().filter_map(|s| parse_location_type(s)).collect();
        let excluded: Vec<LocationType> =
            conditions.excluded_locations.iter().filter_map(|s| parse_location_type(s)).collect();
        let threshold_secs = (conditions.time_threshold_hours * 3600.0) as i64;

        let mut anomalies = Vec::new();
        for pallet in &snapshot.pallets {
            let parsed = crate::location::to_canonical(&pallet.location);
            let location_type = match engine.validate(&parsed) {
                ValidationResult::Valid { location_type, .. } => location_type,
                _ => continue,
            };

            let matches = if excluded.is_empty() {
                included.contains(&location_type)
            } else {
                !excluded.contains(&location_type)
            };
            if !matches {
                continue;
            }

            let age = ctx.now - pallet.creation_date;
            if age > threshold_secs {
                anomalies.push(
                    AnomalyDraft::new(
                        &pallet.pallet_id,
                        &pallet.location,
                        "stagnant_pallet",
                        format!(
                            "pallet {} has been at {} for {:.1}h, exceeding the {:.1}h threshold",
                            pallet.pallet_id,
                            pallet.location,
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
        RuleType::StagnantPallets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleCategory, RuleSeverity, RuleType};
    use crate::snapshot::Pallet;
    use crate::virtual_engine::{SpecialArea, SpecialAreaType, VirtualEngine, WarehouseTemplate};
    use crate::warehouse::{Confidence, WarehouseContext};

    fn rule() -> Rule {
        Rule {
            id: "r1".to_string(),
            name: "Stagnant receiving pallets".to_string(),
            rule_type: RuleType::StagnantPallets,
            category_priority: RuleCategory::FlowTime,
            severity: RuleSeverity::High,
            is_active: true,
            conditions: serde_json::json!({"locationTypes": ["RECEIVING"], "timeThresholdHours": 6.0}),
            parameters: serde_json::json!({}),
        }
    }

    fn pallet(id: &str, loc: &str, creation_date: i64) -> Pallet {
        Pallet {
            pallet_id: id.to_string(),
            location: loc.to_string(),
            creation_date,
            receipt_number: "R1".to_string(),
            description: "widgets".to_string(),
        }
    }

    fn template() -> WarehouseTemplate {
        WarehouseTemplate {
            warehouse_id: "W".to_string(),
            num_aisles: 2,
            racks_per_aisle: 1,
            positions_per_rack: 22,
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

    #[test]
    fn s3_only_the_aged_receiving_pallet_is_flagged() {
        let now = 100 * 3600;
        let snapshot = InventorySnapshot {
            pallets: vec![
                pallet("P1", "RECV-01", now - 8 * 3600),
                pallet("P2", "RECV-01", now - 2 * 3600),
                pallet("P3", "01-01-001A", now - 10 * 3600),
            ],
        };
        let engine = VirtualEngine::build(template()).unwrap();
        let warehouse = WarehouseContext {
            warehouse_id: Some("W".to_string()),
            confidence: Confidence::VeryHigh,
            coverage: 1.0,
            detection_method: "test",
        };
        let ctx = EvalContext { engine: Some(&engine), warehouse: &warehouse, now, obvious_violation_multiplier: 2.0, cancellation: tokio_util::sync::CancellationToken::new() };

        let anomalies = StagnantPalletsEvaluator.evaluate(&rule(), &snapshot, &ctx).unwrap();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].pallet_id, "P1");
    }

    #[test]
    fn no_engine_yields_zero_anomalies() {
        let now = 100 * 3600;
        let snapshot = InventorySnapshot { pallets: vec![pallet("P1", "RECV-01", now - 8 * 3600)] };
        let warehouse = WarehouseContext {
            warehouse_id: None,
            confidence: Confidence::None,
            coverage: 0.0,
            detection_method: "test",
        };
        let ctx = EvalContext { engine: None, warehouse: &warehouse, now, obvious_violation_multiplier: 2.0, cancellation: tokio_util::sync::CancellationToken::new() };
        let anomalies = StagnantPalletsEvaluator.evaluate(&rule(), &snapshot, &ctx).unwrap();
        assert!(anomalies.is_empty());
    }
}
