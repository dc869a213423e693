//! Structured, tagged errors for the evaluation pipeline.
//!
//! None of these abort a whole `evaluate` call: an [`UnparseableRule`]
//! is rejected before evaluation starts (the rule never runs), while
//! [`EvaluatorFailure`], [`EvaluatorTimeout`], and [`NoWarehouseMatched`]
//! are recorded per-rule and do not affect the other rules in the batch.
//!
//! [`UnparseableRule`]: EngineError::UnparseableRule
//! [`EvaluatorFailure`]: EngineError::EvaluatorFailure
//! [`EvaluatorTimeout`]: EngineError::EvaluatorTimeout
//! [`NoWarehouseMatched`]: EngineError::NoWarehouseMatched

use thiserror::Error;

/// Top-level, caller-facing error taxonomy (spec.md §6, §7).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A rule's `conditions`/`parameters` JSON did not match its type's schema.
    /// The rule is rejected before the batch runs; other rules are unaffected.
    #[error("rule {rule_id} is unparseable: {reason}")]
    UnparseableRule { rule_id: String, reason: String },

    /// An evaluator raised an error while processing a rule.
    #[error("evaluator for rule {rule_id} failed: {reason}")]
    EvaluatorFailure { rule_id: String, reason: String },

    /// A rule's soft timeout elapsed; its future was abandoned.
    #[error("evaluator for rule {rule_id} timed out")]
    EvaluatorTimeout { rule_id: String },

    /// No candidate warehouse matched the inventory snapshot at all.
    /// Evaluation continues; location-dependent rules return zero anomalies.
    #[error("no warehouse matched (best coverage {coverage:.2})")]
    NoWarehouseMatched { coverage: f64 },
}

/// Error returned from inside a single [`crate::evaluators::Evaluator::evaluate`] call.
///
/// This is intentionally a narrower type than [`EngineError`]: evaluators
/// cannot themselves decide a rule is "unparseable" after the orchestrator
/// already accepted it, and they never observe `NoWarehouseMatched` as a
/// failure (a `None` [`crate::warehouse::WarehouseContext`] is a valid
/// input they must handle, not an error).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluatorError {
    #[error("malformed rule conditions: {0}")]
    MalformedConditions(String),

    #[error("evaluator failed: {0}")]
    Failed(String),

    /// Raised by a grouping evaluator that noticed the caller's
    /// [`tokio_util::sync::CancellationToken`] fire partway through a large
    /// group (spec.md §5). Treated the same as [`Self::Failed`] by callers:
    /// the rule is marked not-ok and contributes no anomalies.
    #[error("evaluation cancelled")]
    Cancelled,
}

impl EvaluatorError {
    pub fn into_engine_error(self, rule_id: &str) -> EngineError {
        match self {
            EvaluatorError::MalformedConditions(reason) => {
                EngineError::UnparseableRule { rule_id: rule_id.to_string(), reason }
            }
            EvaluatorError::Failed(reason) => {
                EngineError::EvaluatorFailure { rule_id: rule_id.to_string(), reason }
            }
            EvaluatorError::Cancelled => {
                EngineError::EvaluatorFailure { rule_id: rule_id.to_string(), reason: "cancelled".to_string() }
            }
        }
    }
}
