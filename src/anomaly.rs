//! Anomaly output records and per-rule execution bookkeeping (C4/C5 output).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rules::{RuleSeverity, RuleType};

/// One finding, scoped to a pallet or (for area-level overcapacity) a
/// location. Created by an evaluator; never mutated after creation inside
/// the core — the orchestrator only annotates rule provenance
/// (`ruleId`/`ruleName`/`ruleType`) and fills in a default severity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub pallet_id: String,
    pub location_code: String,
    pub rule_id: String,
    pub rule_name: String,
    pub rule_type: RuleType,
    pub anomaly_type: String,
    pub severity: RuleSeverity,
    pub description: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

/// Builder used by evaluators: fields an evaluator doesn't know yet
/// (`ruleId`, `ruleName`, `ruleType`, and `severity` unless overridden) are
/// filled in by the orchestrator's annotation pass.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDraft {
    pub pallet_id: String,
    pub location_code: String,
    pub anomaly_type: String,
    pub description: String,
    pub severity_override: Option<RuleSeverity>,
    pub details: Map<String, Value>,
}

impl AnomalyDraft {
    pub fn new(pallet_id: impl Into<String>, location_code: impl Into<String>, anomaly_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            pallet_id: pallet_id.into(),
            location_code: location_code.into(),
            anomaly_type: anomaly_type.into(),
            description: description.into(),
            severity_override: None,
            details: Map::new(),
        }
    }

    pub fn with_severity(mut self, severity: RuleSeverity) -> Self {
        self.severity_override = Some(severity);
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn into_anomaly(self, rule_id: &str, rule_name: &str, rule_type: RuleType, default_severity: RuleSeverity) -> Anomaly {
        Anomaly {
            pallet_id: self.pallet_id,
            location_code: self.location_code,
            rule_id: rule_id.to_string(),
            rule_name: rule_name.to_string(),
            rule_type,
            anomaly_type: self.anomaly_type,
            severity: self.severity_override.unwrap_or(default_severity),
            description: self.description,
            details: self.details,
        }
    }
}

/// Execution record for a single rule (spec.md §4.5/§6): whether it
/// succeeded, how many anomalies it produced, how long it took, and its
/// error if any. Always present for every filtered-in rule, success or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleExecution {
    pub rule_id: String,
    pub ok: bool,
    pub count: usize,
    pub duration_ms: u64,
    pub err: Option<String>,
}
