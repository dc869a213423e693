//! Rule Evaluator Library (C4): one evaluator per [`RuleType`], run through
//! a `{ruleType → evaluator}` registry (spec.md §9, "polymorphism over
//! evaluator family"). Adding a rule type is a registry insert, not a new
//! class hierarchy — the same shape `formualizer-eval` uses for its
//! builtin-function table.
//!
//! Every evaluator is a pure function of `(rule, snapshot, ctx)`: no
//! hidden state, so the orchestrator is free to run them concurrently.

mod data_integrity;
mod invalid_location;
mod location_pattern;
mod missing_location;
mod overcapacity;
mod product_compat;
mod stagnant;
mod temperature;
mod uncoordinated_lots;

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::anomaly::AnomalyDraft;
use crate::error::EvaluatorError;
use crate::rules::{Rule, RuleType};
use crate::snapshot::InventorySnapshot;
use crate::virtual_engine::{LocationType, VirtualEngine};
use crate::warehouse::WarehouseContext;

/// How often a grouping evaluator re-checks [`EvalContext::is_cancelled`]
/// while walking a large group (spec.md §5, "at least once per 10k rows").
pub const CANCELLATION_CHECK_INTERVAL: usize = 10_000;

/// Everything an evaluator may consult besides the rule and the snapshot.
/// `engine` is `None` exactly when [`WarehouseContext::warehouse_id`] is
/// `None` — evaluators that need location validity must treat that as
/// "zero anomalies", not an error (spec.md §4.4, "Evaluator failure model").
pub struct EvalContext<'a> {
    pub engine: Option<&'a VirtualEngine>,
    pub warehouse: &'a WarehouseContext,
    pub now: i64,
    pub obvious_violation_multiplier: f64,
    pub cancellation: CancellationToken,
}

impl EvalContext<'_> {
    /// Cheap, lock-free cancellation check. Grouping evaluators call this
    /// every [`CANCELLATION_CHECK_INTERVAL`] rows so a cancelled evaluation
    /// doesn't keep grinding through a large snapshot after the caller has
    /// already given up (spec.md §5).
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// Capability set implemented by every rule type. Implementors MUST be
/// pure: no interior mutability visible across calls, no I/O.
pub trait Evaluator: Send + Sync {
    fn evaluate(
        &self,
        rule: &Rule,
        snapshot: &InventorySnapshot,
        ctx: &EvalContext,
    ) -> Result<Vec<AnomalyDraft>, EvaluatorError>;

    /// The rule type this evaluator handles, for registry self-description.
    fn rule_type(&self) -> RuleType;
}

/// Build the `{ruleType → evaluator}` registry. A fresh map per call is
/// cheap (nine boxed zero-sized structs) and keeps evaluators stateless.
pub fn registry() -> HashMap<RuleType, Box<dyn Evaluator>> {
    let mut map: HashMap<RuleType, Box<dyn Evaluator>> = HashMap::new();
    map.insert(RuleType::StagnantPallets, Box::new(stagnant::StagnantPalletsEvaluator));
    map.insert(RuleType::UncoordinatedLots, Box::new(uncoordinated_lots::UncoordinatedLotsEvaluator));
    map.insert(RuleType::Overcapacity, Box::new(overcapacity::OvercapacityEvaluator));
    map.insert(RuleType::InvalidLocation, Box::new(invalid_location::InvalidLocationEvaluator));
    map.insert(RuleType::LocationSpecificStagnant, Box::new(location_pattern::LocationSpecificStagnantEvaluator));
    map.insert(RuleType::TemperatureZoneMismatch, Box::new(temperature::TemperatureZoneMismatchEvaluator));
    map.insert(RuleType::DataIntegrity, Box::new(data_integrity::DataIntegrityEvaluator));
    map.insert(RuleType::MissingLocation, Box::new(missing_location::MissingLocationEvaluator));
    map.insert(RuleType::ProductIncompatibility, Box::new(product_compat::ProductIncompatibilityEvaluator));
    map
}

/// Parse a `locationTypes`-style string into the engine's [`LocationType`].
/// Unrecognized tokens (e.g. a stray `"FINAL"` some tenants configure as a
/// synonym for a terminal resting place) deliberately return `None` rather
/// than guessing — callers fold them out of the matched set.
pub(crate) fn parse_location_type(s: &str) -> Option<LocationType> {
    match s.to_uppercase().as_str() {
        "STORAGE" => Some(LocationType::Storage),
        "RECEIVING" => Some(LocationType::Receiving),
        "STAGING" => Some(LocationType::Staging),
        "DOCK" => Some(LocationType::Dock),
        "TRANSITIONAL" => Some(LocationType::Transitional),
        _ => None,
    }
}

/// Translate a glob pattern (`*` any run, `?` one char) into an anchored,
/// case-insensitive regex and test `candidate` against it. Invalid patterns
/// (regex metacharacters the glob syntax doesn't define) match nothing
/// rather than panicking — a malformed rule condition must not abort
/// evaluation.
pub(crate) fn glob_match(pattern: &str, candidate: &str) -> bool {
    compiled_glob(pattern).is_match(candidate)
}

fn compiled_glob(pattern: &str) -> Regex {
    static CACHE: LazyLock<dashmap::DashMap<String, Regex>> = LazyLock::new(dashmap::DashMap::new);
    if let Some(re) = CACHE.get(pattern) {
        return re.clone();
    }
    let mut regex_src = String::from("(?i)^");
    for ch in pattern.chars() {
        match ch {
            '*' => regex_src.push_str(".*"),
            '?' => regex_src.push('.'),
            c if regex::escape(&c.to_string()) != c.to_string() => {
                regex_src.push_str(&regex::escape(&c.to_string()))
            }
            c => regex_src.push(c),
        }
    }
    regex_src.push('$');
    let re = Regex::new(&regex_src).unwrap_or_else(|_| Regex::new("$^").expect("never matches"));
    CACHE.insert(pattern.to_string(), re.clone());
    re
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_star_matches_any_run() {
        assert!(glob_match("FROZEN-*", "FROZEN-CHICKEN"));
        assert!(!glob_match("FROZEN-*", "CHILLED-CHICKEN"));
    }

    #[test]
    fn glob_question_mark_matches_one_char() {
        assert!(glob_match("RECV-0?", "RECV-01"));
        assert!(!glob_match("RECV-0?", "RECV-010"));
    }

    #[test]
    fn registry_has_all_nine_rule_types() {
        let reg = registry();
        for ty in RuleType::ALL {
            assert!(reg.contains_key(ty), "missing evaluator for {ty:?}");
        }
    }

    #[test]
    fn every_evaluator_self_reports_its_registry_key() {
        let reg = registry();
        for (key, evaluator) in &reg {
            assert_eq!(evaluator.rule_type(), *key, "evaluator misreports its own rule type");
        }
    }

    #[test]
    fn location_type_aliases_unknown_token_to_none() {
        assert_eq!(parse_location_type("STORAGE"), Some(LocationType::Storage));
        assert_eq!(parse_location_type("FINAL"), None);
    }
}
