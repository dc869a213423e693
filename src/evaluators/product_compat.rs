//! PRODUCT_INCOMPATIBILITY: a pallet sitting at a location that restricts
//! which products it may hold.
//!
//! spec.md describes this as a condition "on location": `allowedProducts`
//! applies to whichever locations the rule's `locationPattern` selects, the
//! same shape [`crate::evaluators::location_pattern`] uses for its glob.

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
    allowed_products: Vec<String>,
}

pub struct ProductIncompatibilityEvaluator;

impl Evaluator for ProductIncompatibilityEvaluator {
    fn evaluate(
        &self,
        rule: &Rule,
        snapshot: &InventorySnapshot,
        _ctx: &EvalContext,
    ) -> Result<Vec<AnomalyDraft>, EvaluatorError> {
        let conditions: Conditions = serde_json::from_value(rule.conditions.clone())
            .map_err(|e| EvaluatorError::MalformedConditions(e.to_string()))?;
        if conditions.allowed_products.is_empty() {
            return Ok(Vec::new());
        }

        let mut anomalies = Vec::new();
        for pallet in &snapshot.pallets {
            if !glob_match(&conditions.location_pattern, &pallet.location) {
                continue;
            }
            let allowed =
                conditions.allowed_products.iter().any(|p| glob_match(p, &pallet.description));
            if !allowed {
                anomalies.push(AnomalyDraft::new(
                    &pallet.pallet_id,
                    &pallet.location,
                    "product_incompatibility",
                    format!(
                        "pallet {} ({}) is not an allowed product at {}",
                        pallet.pallet_id, pallet.description, pallet.location
                    ),
                ));
            }
        }
        Ok(anomalies)
    }

    fn rule_type(&self) -> RuleType {
        RuleType::ProductIncompatibility
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
            name: "Cold storage product compatibility".to_string(),
            rule_type: RuleType::ProductIncompatibility,
            category_priority: RuleCategory::Product,
            severity: RuleSeverity::Medium,
            is_active: true,
            conditions: serde_json::json!({
                "locationPattern": "02-*",
                "allowedProducts": ["FROZEN-*", "CHILLED-*"],
            }),
            parameters: serde_json::json!({}),
        }
    }

    #[test]
    fn non_matching_product_at_restricted_location_is_flagged() {
        let warehouse = WarehouseContext {
            warehouse_id: None,
            confidence: Confidence::None,
            coverage: 0.0,
            detection_method: "test",
        };
        let eval_ctx = EvalContext { engine: None, warehouse: &warehouse, now: 0, obvious_violation_multiplier: 2.0, cancellation: tokio_util::sync::CancellationToken::new() };
        let snapshot = InventorySnapshot {
            pallets: vec![
                Pallet { pallet_id: "P1".to_string(), location: "02-01-001A".to_string(), creation_date: 0, receipt_number: "R1".to_string(), description: "DRY-PASTA".to_string() },
                Pallet { pallet_id: "P2".to_string(), location: "02-01-002A".to_string(), creation_date: 0, receipt_number: "R1".to_string(), description: "FROZEN-PEAS".to_string() },
                Pallet { pallet_id: "P3".to_string(), location: "01-01-001A".to_string(), creation_date: 0, receipt_number: "R1".to_string(), description: "DRY-PASTA".to_string() },
            ],
        };
        let anomalies = ProductIncompatibilityEvaluator.evaluate(&rule(), &snapshot, &eval_ctx).unwrap();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].pallet_id, "P1");
    }
}
