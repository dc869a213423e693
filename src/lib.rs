//! warehouse-anomaly-core: a warehouse inventory anomaly-detection engine.
//!
//! Given a tabular inventory snapshot and a user-configurable rule set,
//! produces a ranked list of anomalies scoped to whichever warehouse the
//! snapshot's locations best match. See [`orchestrator::evaluate`] for the
//! single entry point most callers want.
//!
//! # Usage
//!
//! ```rust,no_run
//! use warehouse_anomaly_core::{EngineConfig, CandidateWarehouse, WarehouseTemplate};
//! use warehouse_anomaly_core::{InventorySnapshot, Rule};
//!
//! # async fn run(snapshot: InventorySnapshot, rules: Vec<Rule>, template: WarehouseTemplate) {
//! let candidates = vec![CandidateWarehouse { template }];
//! let config = EngineConfig::default();
//! let result = warehouse_anomaly_core::orchestrator::evaluate(
//!     &snapshot,
//!     &rules,
//!     &candidates,
//!     &config,
//!     None,
//!     0,
//!     tokio_util::sync::CancellationToken::new(),
//! )
//! .await;
//! println!("{} anomalies", result.anomalies.len());
//! # }
//! ```

pub mod anomaly;
pub mod config;
pub mod error;
pub mod evaluators;
pub mod location;
pub mod orchestrator;
pub mod output;
pub mod rules;
pub mod snapshot;
pub mod virtual_engine;
pub mod warehouse;

pub use anomaly::{Anomaly, AnomalyDraft, RuleExecution};
pub use config::EngineConfig;
pub use error::{EngineError, EvaluatorError};
pub use location::{CanonicalLocation, LocationClass, ParsedLocation, SpecialLocation};
pub use orchestrator::EvaluationResult;
pub use rules::{Rule, RuleCategory, RuleSeverity, RuleType};
pub use snapshot::{InventorySnapshot, Pallet};
pub use virtual_engine::{
    cached_engine, invalidate_cached_engine, LocationType, UniverseSummary, ValidationResult,
    VirtualEngine, VirtualEngineCache, WarehouseTemplate,
};
pub use warehouse::{CandidateWarehouse, Confidence, ConfidenceThresholds, WarehouseContext};
