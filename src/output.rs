//! Output formatters for anomaly reports.
//!
//! This is demo-binary-facing only: the core never formats output itself
//! (spec.md §7, "the core never logs to stdout in place of returning
//! structured diagnostics"). These formatters just render an already
//! complete [`EvaluationResult`].

use colored::Colorize;

use crate::anomaly::Anomaly;
use crate::orchestrator::EvaluationResult;
use crate::rules::RuleSeverity;

/// Output format for an anomaly report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable colored output.
    Pretty,
    /// JSON output for tooling integration.
    Json,
    /// Compact one-line-per-anomaly.
    Compact,
    /// GitHub Actions annotation format.
    Github,
}

/// Format an evaluation result according to the specified output format.
pub fn format_result(result: &EvaluationResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Pretty => format_pretty(result),
        OutputFormat::Json => format_json(result),
        OutputFormat::Compact => format_compact(&result.anomalies),
        OutputFormat::Github => format_github(&result.anomalies),
    }
}

fn format_pretty(result: &EvaluationResult) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n{} {}\n",
        "warehouse:".bold(),
        result.warehouse.warehouse_id.as_deref().unwrap_or("none").cyan()
    ));
    output.push_str(&format!(
        "{} {:?}  {} {:.2}\n",
        "confidence:".bold(),
        result.warehouse.confidence,
        "coverage:".bold(),
        result.warehouse.coverage
    ));

    if result.anomalies.is_empty() {
        output.push_str(&format!("\n{}\n", "no anomalies found".green().bold()));
        return output;
    }

    for anomaly in &result.anomalies {
        let severity_str = match anomaly.severity {
            RuleSeverity::VeryHigh => "very_high".red().bold(),
            RuleSeverity::High => "high".red(),
            RuleSeverity::Medium => "medium".yellow(),
            RuleSeverity::Low => "low".dimmed(),
        };
        let marker = match anomaly.severity {
            RuleSeverity::VeryHigh | RuleSeverity::High => "✖".red(),
            RuleSeverity::Medium => "⚠".yellow(),
            RuleSeverity::Low => "·".dimmed(),
        };

        output.push_str(&format!(
            "\n  {} {} [{}] {}\n",
            marker,
            severity_str,
            anomaly.rule_id.cyan(),
            anomaly.rule_name.bold()
        ));
        output.push_str(&format!(
            "    {} pallet={} location={}\n",
            "→".dimmed(),
            anomaly.pallet_id,
            anomaly.location_code
        ));
        output.push_str(&format!("    {}\n", anomaly.description));
    }

    output.push('\n');
    output
}

fn format_json(result: &EvaluationResult) -> String {
    serde_json::to_string_pretty(result_to_json(result).as_ref()).unwrap_or_default()
}

fn result_to_json(result: &EvaluationResult) -> Box<serde_json::Value> {
    Box::new(serde_json::json!({
        "warehouse": {
            "warehouseId": result.warehouse.warehouse_id,
            "confidence": format!("{:?}", result.warehouse.confidence),
            "coverage": result.warehouse.coverage,
            "detectionMethod": result.warehouse.detection_method,
        },
        "anomalies": result.anomalies,
        "perRule": result.per_rule,
        "skippedRows": result.normalization.skipped_rows,
    }))
}

fn format_compact(anomalies: &[Anomaly]) -> String {
    let mut output = String::new();
    for anomaly in anomalies {
        let severity = match anomaly.severity {
            RuleSeverity::VeryHigh => "VH",
            RuleSeverity::High => "H",
            RuleSeverity::Medium => "M",
            RuleSeverity::Low => "L",
        };
        output.push_str(&format!(
            "{}:{}: {} [{}] {}\n",
            anomaly.pallet_id, anomaly.location_code, severity, anomaly.rule_id, anomaly.anomaly_type
        ));
    }
    output
}

fn format_github(anomalies: &[Anomaly]) -> String {
    let mut output = String::new();
    for anomaly in anomalies {
        let level = match anomaly.severity {
            RuleSeverity::VeryHigh | RuleSeverity::High => "error",
            RuleSeverity::Medium => "warning",
            RuleSeverity::Low => "notice",
        };
        output.push_str(&format!(
            "::{} title={}::{} (pallet={}, location={})\n",
            level, anomaly.rule_id, anomaly.description, anomaly.pallet_id, anomaly.location_code
        ));
    }
    output
}

/// Summary statistics for an anomaly report.
#[derive(Debug, Default)]
pub struct AnomalySummary {
    pub total: usize,
    pub very_high: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl AnomalySummary {
    pub fn from_anomalies(anomalies: &[Anomaly]) -> Self {
        let mut summary = Self::default();
        summary.total = anomalies.len();
        for anomaly in anomalies {
            match anomaly.severity {
                RuleSeverity::VeryHigh => summary.very_high += 1,
                RuleSeverity::High => summary.high += 1,
                RuleSeverity::Medium => summary.medium += 1,
                RuleSeverity::Low => summary.low += 1,
            }
        }
        summary
    }

    pub fn format_pretty(&self) -> String {
        format!(
            "{} ({} very high, {} high, {} medium, {} low)",
            format!("{} anomalies", self.total).bold(),
            self.very_high.to_string().red().bold(),
            self.high.to_string().red(),
            self.medium.to_string().yellow(),
            self.low
        )
    }
}
