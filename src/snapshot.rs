//! Inventory snapshot types and column normalization (spec.md §4.5 step 1).
//!
//! The snapshot is shared read-only across every evaluator; nothing in
//! this crate mutates a `Pallet` after ingestion.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One inventory row. Read-only to the rule engine core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pallet {
    pub pallet_id: String,
    pub location: String,
    /// Unix seconds. Rows whose original timestamp failed to parse are
    /// kept (flagged for DATA_INTEGRITY only) with `creation_date = 0`.
    pub creation_date: i64,
    pub receipt_number: String,
    pub description: String,
}

/// A tabular inventory snapshot: read-only, shared across every evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub pallets: Vec<Pallet>,
}

/// Raw column names accepted as aliases for each canonical field (spec.md
/// §4.5 step 1). Matching is case-insensitive and ignores spaces/underscores.
fn alias_table() -> HashMap<&'static str, &'static str> {
    [
        ("palletid", "pallet_id"),
        ("pallet_id", "pallet_id"),
        ("palletnumber", "pallet_id"),
        ("location", "location"),
        ("locationcode", "location"),
        ("loc", "location"),
        ("creationdate", "creation_date"),
        ("createddate", "creation_date"),
        ("receiptdate", "creation_date"),
        ("receiptnumber", "receipt_number"),
        ("receipt_number", "receipt_number"),
        ("lotnumber", "receipt_number"),
        ("lot", "receipt_number"),
        ("description", "description"),
        ("productdescription", "description"),
    ]
    .into_iter()
    .collect()
}

fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .collect::<String>()
        .to_lowercase()
}

/// Map a raw column header to its canonical field name, if recognized.
pub fn canonical_column(raw: &str) -> Option<&'static str> {
    alias_table().get(normalize_key(raw).as_str()).copied()
}

/// A raw, untyped inventory row as read from an external source (e.g. a
/// JSON/CSV ingestion layer — out of scope for this crate per spec.md §1).
/// `normalize_row` coerces it into a [`Pallet`], skipping the row (and
/// counting it in [`NormalizationReport::skipped_rows`]) only when a
/// *critical* field (`pallet_id`, `location`) is entirely absent.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    pub fields: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizationReport {
    pub skipped_rows: usize,
    pub unparseable_timestamps: usize,
}

/// Normalize a batch of raw rows into an [`InventorySnapshot`], applying
/// the column alias table and coercing `creation_date` to a Unix
/// timestamp. Malformed rows are kept (not dropped) so DATA_INTEGRITY and
/// MISSING_LOCATION can still flag them; only rows missing `pallet_id`
/// entirely are skipped.
pub fn normalize_rows(rows: &[RawRow]) -> (InventorySnapshot, NormalizationReport) {
    let mut pallets = Vec::with_capacity(rows.len());
    let mut report = NormalizationReport::default();

    for row in rows {
        let mut canonical: HashMap<&'static str, String> = HashMap::new();
        for (key, value) in &row.fields {
            if let Some(field) = canonical_column(key) {
                canonical.insert(field, value.clone());
            }
        }

        let Some(pallet_id) = canonical.get("pallet_id").filter(|s| !s.trim().is_empty()) else {
            report.skipped_rows += 1;
            continue;
        };

        let location = canonical.get("location").cloned().unwrap_or_default();
        let creation_date = canonical
            .get("creation_date")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or_else(|| {
                report.unparseable_timestamps += 1;
                0
            });

        pallets.push(Pallet {
            pallet_id: pallet_id.clone(),
            location,
            creation_date,
            receipt_number: canonical.get("receipt_number").cloned().unwrap_or_default(),
            description: canonical.get("description").cloned().unwrap_or_default(),
        });
    }

    (InventorySnapshot { pallets }, report)
}
