//! TEMPERATURE_ZONE_MISMATCH: a temperature-sensitive product sitting in a
//! zone it must not enter.

use serde::Deserialize;

use crate::anomaly::AnomalyDraft;
use crate::error::EvaluatorError;
use crate::rules::{Rule, RuleType};
use crate::snapshot::InventorySnapshot;
use crate::virtual_engine::ValidationResult;

use super::{glob_match, EvalContext, Evaluator};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Conditions {
    product_patterns: Vec<String>,
    prohibited_zones: Vec<String>,
}

pub struct TemperatureZoneMismatchEvaluator;

impl Evaluator for TemperatureZoneMismatchEvaluator {
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

        let mut anomalies = Vec::new();
        for pallet in &snapshot.pallets {
            let matches_product =
                conditions.product_patterns.iter().any(|p| glob_match(p, &pallet.description));
            if !matches_product {
                continue;
            }
            let ValidationResult::Valid { zone: Some(zone), .. } =
                engine.validate(&crate::location::to_canonical(&pallet.location))
            else {
                continue;
            };
            if conditions.prohibited_zones.iter().any(|z| z.eq_ignore_ascii_case(&zone)) {
                anomalies.push(AnomalyDraft::new(
                    &pallet.pallet_id,
                    &pallet.location,
                    "temperature_zone_mismatch",
                    format!(
                        "pallet {} ({}) sits in prohibited zone {zone}",
                        pallet.pallet_id, pallet.description
                    ),
                ).with_detail("zone", zone));
            }
        }
        Ok(anomalies)
    }

    fn rule_type(&self) -> RuleType {
        RuleType::TemperatureZoneMismatch
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
            name: "Frozen goods out of cold zone".to_string(),
            rule_type: RuleType::TemperatureZoneMismatch,
            category_priority: RuleCategory::Product,
            severity: RuleSeverity::VeryHigh,
            is_active: true,
            conditions: serde_json::json!({
                "productPatterns": ["FROZEN-*"],
                "prohibitedZones": ["dock"],
            }),
            parameters: serde_json::json!({}),
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
                code: "DOCK-01".to_string(),
                area_type: SpecialAreaType::Dock,
                capacity: 5,
                zone: "dock".to_string(),
            }],
        }
    }

    #[test]
    fn frozen_product_on_dock_is_flagged() {
        let engine = VirtualEngine::build(template()).unwrap();
        let warehouse = WarehouseContext {
            warehouse_id: Some("W".to_string()),
            confidence: Confidence::High,
            coverage: 1.0,
            detection_method: "test",
        };
        let ctx = EvalContext { engine: Some(&engine), warehouse: &warehouse, now: 0, obvious_violation_multiplier: 2.0, cancellation: tokio_util::sync::CancellationToken::new() };
        let snapshot = InventorySnapshot {
            pallets: vec![Pallet {
                pallet_id: "P1".to_string(),
                location: "DOCK-01".to_string(),
                creation_date: 0,
                receipt_number: "R1".to_string(),
                description: "FROZEN-CHICKEN".to_string(),
            }],
        };
        let anomalies = TemperatureZoneMismatchEvaluator.evaluate(&rule(), &snapshot, &ctx).unwrap();
        assert_eq!(anomalies.len(), 1);
    }
}
