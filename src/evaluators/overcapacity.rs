//! OVERCAPACITY: more pallets at a location than its declared capacity.

use std::collections::HashMap;

use serde::Deserialize;

use crate::anomaly::AnomalyDraft;
use crate::error::EvaluatorError;
use crate::rules::{Rule, RuleSeverity, RuleType};
use crate::snapshot::{InventorySnapshot, Pallet};
use crate::virtual_engine::{LocationType, ValidationResult};

use super::{EvalContext, Evaluator, CANCELLATION_CHECK_INTERVAL};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Conditions {
    #[serde(default)]
    use_location_differentiation: bool,
}

pub struct OvercapacityEvaluator;

impl Evaluator for OvercapacityEvaluator {
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

        let mut by_location: HashMap<&str, Vec<&Pallet>> = HashMap::new();
        for pallet in &snapshot.pallets {
            if pallet.location.trim().is_empty() {
                continue;
            }
            by_location.entry(pallet.location.as_str()).or_default().push(pallet);
        }

        let mut anomalies = Vec::new();
        let mut rows_since_check = 0usize;
        for (location, pallets) in by_location {
            rows_since_check += pallets.len();
            if rows_since_check >= CANCELLATION_CHECK_INTERVAL {
                if ctx.is_cancelled() {
                    return Err(EvaluatorError::Cancelled);
                }
                rows_since_check = 0;
            }
            let ValidationResult::Valid { location_type, capacity, .. } =
                engine.validate(&crate::location::to_canonical(location))
            else {
                continue;
            };
            let count = pallets.len() as u32;
            if count <= capacity {
                continue;
            }

            let obvious = f64::from(count) >= f64::from(capacity) * ctx.obvious_violation_multiplier;
            let severity = obvious.then_some(RuleSeverity::VeryHigh);

            let per_pallet = location_type == LocationType::Storage || !conditions.use_location_differentiation;

            if per_pallet {
                for pallet in &pallets {
                    anomalies.push(overcapacity_draft(pallet, location, count, capacity, severity));
                }
            } else {
                let representative = pallets[0];
                anomalies.push(overcapacity_draft(representative, location, count, capacity, severity));
            }
        }
        Ok(anomalies)
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Overcapacity
    }
}

fn overcapacity_draft(
    pallet: &Pallet,
    location: &str,
    count: u32,
    capacity: u32,
    severity: Option<RuleSeverity>,
) -> AnomalyDraft {
    let mut draft = AnomalyDraft::new(
        &pallet.pallet_id,
        location,
        "overcapacity",
        format!("location {location} holds {count} pallets against a capacity of {capacity}"),
    )
    .with_detail("count", count)
    .with_detail("capacity", capacity);
    if let Some(sev) = severity {
        draft = draft.with_severity(sev);
    }
    draft
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleCategory, RuleType};
    use crate::virtual_engine::{SpecialArea, SpecialAreaType, VirtualEngine, WarehouseTemplate};
    use crate::warehouse::{Confidence, WarehouseContext};

    fn rule(differentiation: bool) -> Rule {
        Rule {
            id: "r1".to_string(),
            name: "Overcapacity".to_string(),
            rule_type: RuleType::Overcapacity,
            category_priority: RuleCategory::Space,
            severity: RuleSeverity::High,
            is_active: true,
            conditions: serde_json::json!({"useLocationDifferentiation": differentiation}),
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
                code: "RECV-01".to_string(),
                area_type: SpecialAreaType::Receiving,
                capacity: 10,
                zone: "dock".to_string(),
            }],
        }
    }

    fn pallet(id: &str, loc: &str) -> Pallet {
        Pallet {
            pallet_id: id.to_string(),
            location: loc.to_string(),
            creation_date: 0,
            receipt_number: "R1".to_string(),
            description: "widgets".to_string(),
        }
    }

    fn s4_snapshot() -> InventorySnapshot {
        let mut pallets = vec![pallet("P1", "01-01-001A"), pallet("P2", "01-01-001A")];
        pallets.extend((1..=12).map(|i| pallet(&format!("R{i}"), "RECV-01")));
        InventorySnapshot { pallets }
    }

    #[test]
    fn s4_with_differentiation_groups_special_area_into_one() {
        let engine = VirtualEngine::build(template()).unwrap();
        let warehouse = WarehouseContext {
            warehouse_id: Some("W".to_string()),
            confidence: Confidence::VeryHigh,
            coverage: 1.0,
            detection_method: "test",
        };
        let ctx = EvalContext { engine: Some(&engine), warehouse: &warehouse, now: 0, obvious_violation_multiplier: 2.0, cancellation: tokio_util::sync::CancellationToken::new() };
        let anomalies = OvercapacityEvaluator.evaluate(&rule(true), &s4_snapshot(), &ctx).unwrap();
        assert_eq!(anomalies.len(), 3);
    }

    #[test]
    fn s4_without_differentiation_is_per_pallet_everywhere() {
        let engine = VirtualEngine::build(template()).unwrap();
        let warehouse = WarehouseContext {
            warehouse_id: Some("W".to_string()),
            confidence: Confidence::VeryHigh,
            coverage: 1.0,
            detection_method: "test",
        };
        let ctx = EvalContext { engine: Some(&engine), warehouse: &warehouse, now: 0, obvious_violation_multiplier: 2.0, cancellation: tokio_util::sync::CancellationToken::new() };
        let anomalies = OvercapacityEvaluator.evaluate(&rule(false), &s4_snapshot(), &ctx).unwrap();
        assert_eq!(anomalies.len(), 14);
    }

    #[test]
    fn obvious_violation_bypass_elevates_severity() {
        let engine = VirtualEngine::build(template()).unwrap();
        let warehouse = WarehouseContext {
            warehouse_id: Some("W".to_string()),
            confidence: Confidence::VeryHigh,
            coverage: 1.0,
            detection_method: "test",
        };
        let ctx = EvalContext { engine: Some(&engine), warehouse: &warehouse, now: 0, obvious_violation_multiplier: 2.0, cancellation: tokio_util::sync::CancellationToken::new() };
        let anomalies = OvercapacityEvaluator.evaluate(&rule(true), &s4_snapshot(), &ctx).unwrap();
        let storage_anomaly = anomalies.iter().find(|a| a.location_code == "01-01-001A").unwrap();
        assert_eq!(storage_anomaly.severity_override, Some(RuleSeverity::VeryHigh));
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
        let huge: InventorySnapshot = InventorySnapshot {
            pallets: (0..CANCELLATION_CHECK_INTERVAL).map(|i| pallet(&format!("P{i}"), "RECV-01")).collect(),
        };
        let result = OvercapacityEvaluator.evaluate(&rule(true), &huge, &ctx);
        assert_eq!(result, Err(EvaluatorError::Cancelled));
    }
}
