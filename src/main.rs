//! warehouse-anomaly CLI - run the engine against a JSON snapshot bundle.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use warehouse_anomaly_core::config;
use warehouse_anomaly_core::output::{format_result, AnomalySummary, OutputFormat};
use warehouse_anomaly_core::orchestrator;
use warehouse_anomaly_core::{CandidateWarehouse, InventorySnapshot, Rule, RuleSeverity, WarehouseTemplate};

/// warehouse-anomaly - detect inventory placement anomalies from a snapshot bundle
#[derive(Parser, Debug)]
#[command(name = "warehouse-anomaly")]
#[command(version = "0.1.0")]
#[command(about = "Evaluate a warehouse inventory snapshot against a rule set", long_about = None)]
struct Args {
    /// JSON bundle file: `{ "pallets": [...], "rules": [...], "templates": [...] }`
    bundle: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    format: OutputFormatArg,

    /// Minimum severity to display
    #[arg(short, long, value_enum, default_value = "low")]
    severity: SeverityArg,

    /// Preferred warehouse id, used only to break a coverage=1.0 tie
    #[arg(long)]
    preferred_warehouse: Option<String>,

    /// Exit with a nonzero code if any VERY_HIGH or HIGH severity anomaly is found
    #[arg(long)]
    error_on_high_severity: bool,

    /// Show a per-severity summary
    #[arg(long)]
    stats: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    Pretty,
    Json,
    Compact,
    Github,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, PartialOrd)]
enum SeverityArg {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Pretty => OutputFormat::Pretty,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Compact => OutputFormat::Compact,
            OutputFormatArg::Github => OutputFormat::Github,
        }
    }
}

impl From<SeverityArg> for RuleSeverity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Low => RuleSeverity::Low,
            SeverityArg::Medium => RuleSeverity::Medium,
            SeverityArg::High => RuleSeverity::High,
            SeverityArg::VeryHigh => RuleSeverity::VeryHigh,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Bundle {
    pallets: Vec<warehouse_anomaly_core::Pallet>,
    rules: Vec<Rule>,
    templates: Vec<WarehouseTemplate>,
    #[serde(default)]
    preferred_warehouse_id: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let content = match std::fs::read_to_string(&args.bundle) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("{} reading {}: {e}", "error:".red().bold(), args.bundle.display());
            return ExitCode::FAILURE;
        }
    };
    let bundle: Bundle = match serde_json::from_str(&content) {
        Ok(bundle) => bundle,
        Err(e) => {
            eprintln!("{} parsing {}: {e}", "error:".red().bold(), args.bundle.display());
            return ExitCode::FAILURE;
        }
    };

    let engine_config = match config::discover_config(
        args.bundle.parent().unwrap_or_else(|| std::path::Path::new(".")),
    ) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{} loading engine config: {e}", "warning:".yellow().bold());
            config::EngineConfig::default()
        }
    };

    let snapshot = InventorySnapshot { pallets: bundle.pallets };
    let candidates: Vec<CandidateWarehouse> =
        bundle.templates.into_iter().map(|template| CandidateWarehouse { template }).collect();
    let preferred = args.preferred_warehouse.as_deref().or(bundle.preferred_warehouse_id.as_deref());
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let result = orchestrator::evaluate(
        &snapshot,
        &bundle.rules,
        &candidates,
        &engine_config,
        preferred,
        now,
        CancellationToken::new(),
    )
    .await;

    let min_severity: RuleSeverity = args.severity.into();
    let filtered_count = result.anomalies.iter().filter(|a| a.severity >= min_severity).count();

    let output_format: OutputFormat = args.format.into();
    print!("{}", format_result(&result, output_format));

    let summary = AnomalySummary::from_anomalies(&result.anomalies);
    if args.stats {
        println!();
        println!("{}", summary.format_pretty());
        println!("{filtered_count} anomalies at or above the requested severity");
    }

    let failed_rules = result.per_rule.iter().filter(|r| !r.ok).count();
    if failed_rules > 0 {
        eprintln!("{} {failed_rules} rule(s) failed to evaluate", "warning:".yellow().bold());
    }

    if args.error_on_high_severity && (summary.very_high > 0 || summary.high > 0) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
