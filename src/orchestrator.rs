//! Rule Engine Orchestrator (C5): the only component that sees the whole
//! pipeline. Normalizes columns, resolves the warehouse, builds the virtual
//! engine, then fans rules out to evaluators in priority order.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::anomaly::{Anomaly, RuleExecution};
use crate::config::EngineConfig;
use crate::evaluators::{self, EvalContext};
use crate::rules::Rule;
use crate::snapshot::{normalize_rows, InventorySnapshot, NormalizationReport, RawRow};
use crate::virtual_engine;
use crate::warehouse::{self, CandidateWarehouse, WarehouseContext};

/// Everything a caller gets back from one evaluation (spec.md §6, Outputs).
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub anomalies: Vec<Anomaly>,
    pub per_rule: Vec<RuleExecution>,
    pub warehouse: WarehouseContext,
    pub normalization: NormalizationReport,
}

/// Normalize raw tabular rows and evaluate them in one call (spec.md §4.5
/// step 1 through step 7).
pub async fn evaluate_rows(
    rows: &[RawRow],
    rules: &[Rule],
    candidates: &[CandidateWarehouse],
    config: &EngineConfig,
    preferred_warehouse_id: Option<&str>,
    now: i64,
    cancellation: CancellationToken,
) -> EvaluationResult {
    let (snapshot, normalization) = normalize_rows(rows);
    let mut result = evaluate(&snapshot, rules, candidates, config, preferred_warehouse_id, now, cancellation).await;
    result.normalization = normalization;
    result
}

/// Evaluate an already-normalized snapshot (spec.md §4.5 steps 2-7).
#[instrument(skip(snapshot, rules, candidates, config, cancellation))]
pub async fn evaluate(
    snapshot: &InventorySnapshot,
    rules: &[Rule],
    candidates: &[CandidateWarehouse],
    config: &EngineConfig,
    preferred_warehouse_id: Option<&str>,
    now: i64,
    cancellation: CancellationToken,
) -> EvaluationResult {
    let warehouse_context =
        warehouse::resolve(snapshot, candidates, &config.warehouse_confidence_thresholds, preferred_warehouse_id);
    debug!(?warehouse_context, "warehouse resolved");

    let engine = match &warehouse_context.warehouse_id {
        Some(id) => candidates
            .iter()
            .find(|c| &c.template.warehouse_id == id)
            .and_then(|c| virtual_engine::cached_engine(&c.template).ok()),
        None => None,
    };

    let mut ordered: Vec<&Rule> = rules.iter().filter(|r| r.is_active).collect();
    ordered.sort_by(|a, b| {
        a.category_priority
            .cmp(&b.category_priority)
            .then_with(|| Reverse(a.severity).cmp(&Reverse(b.severity)))
            .then_with(|| a.id.cmp(&b.id))
    });

    let registry = Arc::new(evaluators::registry());
    let snapshot = Arc::new(snapshot.clone());
    let warehouse_context_arc = Arc::new(warehouse_context.clone());
    let semaphore = Arc::new(Semaphore::new(config.parallel_evaluators.max(1)));
    let timeout = Duration::from_millis(config.per_rule_timeout_ms);
    let obvious_violation_multiplier = config.obvious_violation_multiplier;

    let mut join_set: JoinSet<(usize, RuleExecution, Vec<Anomaly>)> = JoinSet::new();

    for (index, rule) in ordered.iter().enumerate() {
        let rule = (*rule).clone();
        let registry = Arc::clone(&registry);
        let engine = engine.clone();
        let snapshot = Arc::clone(&snapshot);
        let warehouse_context = Arc::clone(&warehouse_context_arc);
        let semaphore = Arc::clone(&semaphore);
        let cancellation = cancellation.clone();

        join_set.spawn(async move {
            if cancellation.is_cancelled() {
                let execution = RuleExecution {
                    rule_id: rule.id.clone(),
                    ok: false,
                    count: 0,
                    duration_ms: 0,
                    err: Some("cancelled".to_string()),
                };
                return (index, execution, Vec::new());
            }

            let _permit = semaphore.acquire_owned().await.ok();
            let started = tokio::time::Instant::now();

            let run = async {
                let ctx = EvalContext {
                    engine: engine.as_deref(),
                    warehouse: warehouse_context.as_ref(),
                    now,
                    obvious_violation_multiplier,
                    cancellation: cancellation.clone(),
                };
                let Some(evaluator) = registry.get(&rule.rule_type) else {
                    return Err(format!("no evaluator registered for {:?}", rule.rule_type));
                };
                evaluator.evaluate(&rule, &snapshot, &ctx).map_err(|e| e.to_string())
            };

            enum Outcome {
                Success(Vec<crate::anomaly::AnomalyDraft>),
                Failed(String),
                TimedOut,
                Cancelled,
            }

            let outcome = tokio::select! {
                res = tokio::time::timeout(timeout, run) => match res {
                    Ok(Ok(drafts)) => Outcome::Success(drafts),
                    Ok(Err(reason)) => Outcome::Failed(reason),
                    Err(_elapsed) => Outcome::TimedOut,
                },
                _ = cancellation.cancelled() => Outcome::Cancelled,
            };

            let duration_ms = started.elapsed().as_millis() as u64;
            match outcome {
                Outcome::Success(drafts) => {
                    let anomalies: Vec<Anomaly> = drafts
                        .into_iter()
                        .map(|d| d.into_anomaly(&rule.id, &rule.name, rule.rule_type, rule.severity))
                        .collect();
                    let execution = RuleExecution {
                        rule_id: rule.id.clone(),
                        ok: true,
                        count: anomalies.len(),
                        duration_ms,
                        err: None,
                    };
                    (index, execution, anomalies)
                }
                Outcome::Failed(reason) => {
                    let execution = RuleExecution {
                        rule_id: rule.id.clone(),
                        ok: false,
                        count: 0,
                        duration_ms,
                        err: Some(reason),
                    };
                    (index, execution, Vec::new())
                }
                Outcome::TimedOut => {
                    let execution = RuleExecution {
                        rule_id: rule.id.clone(),
                        ok: false,
                        count: 0,
                        duration_ms,
                        err: Some("timed out".to_string()),
                    };
                    (index, execution, Vec::new())
                }
                Outcome::Cancelled => {
                    let execution = RuleExecution {
                        rule_id: rule.id.clone(),
                        ok: false,
                        count: 0,
                        duration_ms,
                        err: Some("cancelled".to_string()),
                    };
                    (index, execution, Vec::new())
                }
            }
        });
    }

    let mut slots: Vec<Option<(RuleExecution, Vec<Anomaly>)>> = (0..ordered.len()).map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, execution, anomalies)) => slots[index] = Some((execution, anomalies)),
            Err(join_error) => warn!(%join_error, "evaluator task panicked"),
        }
    }

    let mut per_rule = Vec::with_capacity(slots.len());
    let mut anomalies = Vec::new();
    for slot in slots.into_iter().flatten() {
        let (execution, mut rule_anomalies) = slot;
        per_rule.push(execution);
        anomalies.append(&mut rule_anomalies);
    }

    EvaluationResult {
        anomalies,
        per_rule,
        warehouse: warehouse_context,
        normalization: NormalizationReport::default(),
    }
}
