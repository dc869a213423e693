//! Rule records and the per-type category/severity vocabulary (C4 input).
//!
//! A `Rule` carries its `conditions`/`parameters` as raw JSON; each
//! evaluator in [`crate::evaluators`] deserializes the subset its
//! `RuleType` defines. The rule set itself is snapshotted at the start of
//! an evaluation and never re-read mid-run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One evaluator family. Adding a type is a registry insert in
/// [`crate::evaluators::registry`], not a new class hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    StagnantPallets,
    UncoordinatedLots,
    Overcapacity,
    InvalidLocation,
    LocationSpecificStagnant,
    TemperatureZoneMismatch,
    DataIntegrity,
    MissingLocation,
    ProductIncompatibility,
}

impl RuleType {
    pub const ALL: &'static [RuleType] = &[
        RuleType::StagnantPallets,
        RuleType::UncoordinatedLots,
        RuleType::Overcapacity,
        RuleType::InvalidLocation,
        RuleType::LocationSpecificStagnant,
        RuleType::TemperatureZoneMismatch,
        RuleType::DataIntegrity,
        RuleType::MissingLocation,
        RuleType::ProductIncompatibility,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleType::StagnantPallets => "STAGNANT_PALLETS",
            RuleType::UncoordinatedLots => "UNCOORDINATED_LOTS",
            RuleType::Overcapacity => "OVERCAPACITY",
            RuleType::InvalidLocation => "INVALID_LOCATION",
            RuleType::LocationSpecificStagnant => "LOCATION_SPECIFIC_STAGNANT",
            RuleType::TemperatureZoneMismatch => "TEMPERATURE_ZONE_MISMATCH",
            RuleType::DataIntegrity => "DATA_INTEGRITY",
            RuleType::MissingLocation => "MISSING_LOCATION",
            RuleType::ProductIncompatibility => "PRODUCT_INCOMPATIBILITY",
        }
    }
}

/// `categoryPriority` in spec.md §3.1 — the dispatch-order grouping, not to
/// be confused with a lint category. Ordered `FlowTime < Space < Product`
/// so the orchestrator's `(categoryPriority, severity desc, ruleId asc)`
/// sort runs flow/time rules first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCategory {
    FlowTime,
    Space,
    Product,
}

/// Operator-facing urgency. Ordered so `severity desc` in the orchestrator's
/// sort is a plain descending comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleSeverity {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// A single configured rule. `conditions` and `parameters` are validated
/// lazily, per type, by the evaluator that consumes them — the orchestrator
/// never schema-checks them up front beyond confirming they deserialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub category_priority: RuleCategory,
    pub severity: RuleSeverity,
    pub is_active: bool,
    #[serde(default = "default_conditions")]
    pub conditions: Value,
    #[serde(default = "default_conditions")]
    pub parameters: Value,
}

fn default_conditions() -> Value {
    Value::Object(serde_json::Map::new())
}
