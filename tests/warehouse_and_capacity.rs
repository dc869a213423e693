//! Cross-component tests combining the warehouse resolver, the virtual
//! location engine, and the OVERCAPACITY evaluator against one snapshot.

use tokio_util::sync::CancellationToken;

use warehouse_anomaly_core::virtual_engine::SpecialAreaType;
use warehouse_anomaly_core::{
    CandidateWarehouse, EngineConfig, InventorySnapshot, Pallet, Rule, RuleCategory, RuleSeverity,
    RuleType, WarehouseTemplate,
};
use warehouse_anomaly_core::virtual_engine::SpecialArea;

fn template_with_dock() -> WarehouseTemplate {
    WarehouseTemplate {
        warehouse_id: "DOCK-WH".to_string(),
        num_aisles: 3,
        racks_per_aisle: 2,
        positions_per_rack: 10,
        levels_per_position: 4,
        level_names: "ABCD".to_string(),
        default_pallet_capacity: 1,
        special_areas: vec![SpecialArea {
            code: "DOCK-1".to_string(),
            area_type: SpecialAreaType::Dock,
            capacity: 2,
            zone: "ambient".to_string(),
        }],
    }
}

fn pallet(id: &str, location: &str) -> Pallet {
    Pallet {
        pallet_id: id.to_string(),
        location: location.to_string(),
        creation_date: 0,
        receipt_number: "R1".to_string(),
        description: "widgets".to_string(),
    }
}

#[tokio::test]
async fn dock_overcapacity_is_flagged_once_per_pallet_when_differentiation_is_on() {
    // Template's DOCK1 special area has capacity 2; three pallets sit on it.
    let snapshot = InventorySnapshot {
        pallets: vec![pallet("P1", "DOCK-1"), pallet("P2", "DOCK-1"), pallet("P3", "DOCK-1")],
    };

    let rule = Rule {
        id: "overcap".to_string(),
        name: "Overcapacity".to_string(),
        rule_type: RuleType::Overcapacity,
        category_priority: RuleCategory::Space,
        severity: RuleSeverity::High,
        is_active: true,
        conditions: serde_json::json!({"useLocationDifferentiation": true}),
        parameters: serde_json::json!({}),
    };

    let candidates = vec![CandidateWarehouse { template: template_with_dock() }];
    let config = EngineConfig::default();

    let result = warehouse_anomaly_core::orchestrator::evaluate(
        &snapshot,
        &[rule],
        &candidates,
        &config,
        None,
        0,
        CancellationToken::new(),
    )
    .await;

    assert_eq!(result.warehouse.warehouse_id.as_deref(), Some("DOCK-WH"));
    // Differentiated special areas collapse to a single overcapacity anomaly
    // for the whole group, not one per pallet.
    assert_eq!(result.anomalies.len(), 1);
    assert_eq!(result.anomalies[0].rule_id, "overcap");
}

#[tokio::test]
async fn storage_overcapacity_is_always_flagged_per_pallet() {
    let snapshot = InventorySnapshot {
        pallets: vec![pallet("P1", "01-01-001A"), pallet("P2", "01-01-001A")],
    };

    let rule = Rule {
        id: "overcap".to_string(),
        name: "Overcapacity".to_string(),
        rule_type: RuleType::Overcapacity,
        category_priority: RuleCategory::Space,
        severity: RuleSeverity::High,
        is_active: true,
        conditions: serde_json::json!({"useLocationDifferentiation": true}),
        parameters: serde_json::json!({}),
    };

    let candidates = vec![CandidateWarehouse { template: template_with_dock() }];
    let config = EngineConfig::default();

    let result = warehouse_anomaly_core::orchestrator::evaluate(
        &snapshot,
        &[rule],
        &candidates,
        &config,
        None,
        0,
        CancellationToken::new(),
    )
    .await;

    // default_pallet_capacity is 1; a standard storage location with two
    // pallets flags both, regardless of differentiation.
    assert_eq!(result.anomalies.len(), 2);
}
