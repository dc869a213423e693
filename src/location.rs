//! Canonical Location Service (C1).
//!
//! Normalizes the many location-code spellings a warehouse export can use
//! down to one canonical form, `AA-RR-PPPL` for storage slots or a small
//! fixed vocabulary of special-area codes. Everything downstream — the
//! virtual location engine, the warehouse resolver, every rule evaluator —
//! compares canonical forms only, never raw strings.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A location exactly as it appeared in an inventory export. Opaque until
/// run through [`to_canonical`].
pub type LocationCode = str;

/// The normalized form of a location code.
///
/// Storage and special forms are disjoint: a code is either a
/// `(aisle, rack, position, level)` slot or a name drawn from a fixed,
/// small vocabulary of receiving/staging/dock/transitional areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalLocation {
    Storage { aisle: u8, rack: u8, position: u16, level: char },
    Special(SpecialLocation),
}

/// A non-storage area. `Named` covers the four bare-name forms; `Numbered`
/// covers `RECV-NN` / `STAGE-NN` / `DOCK-NN` / `AISLE-NN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialLocation {
    Named(SpecialName),
    Numbered { prefix: SpecialPrefix, number: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialName {
    Receiving,
    Staging,
    Shipping,
    Dock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialPrefix {
    Recv,
    Stage,
    Dock,
    Aisle,
}

impl SpecialPrefix {
    fn as_str(self) -> &'static str {
        match self {
            SpecialPrefix::Recv => "RECV",
            SpecialPrefix::Stage => "STAGE",
            SpecialPrefix::Dock => "DOCK",
            SpecialPrefix::Aisle => "AISLE",
        }
    }

    fn from_str(s: &str) -> Option<SpecialPrefix> {
        match s {
            "RECV" => Some(SpecialPrefix::Recv),
            "STAGE" => Some(SpecialPrefix::Stage),
            "DOCK" => Some(SpecialPrefix::Dock),
            "AISLE" => Some(SpecialPrefix::Aisle),
            _ => None,
        }
    }
}

impl SpecialName {
    fn as_str(self) -> &'static str {
        match self {
            SpecialName::Receiving => "RECEIVING",
            SpecialName::Staging => "STAGING",
            SpecialName::Shipping => "SHIPPING",
            SpecialName::Dock => "DOCK",
        }
    }

    fn from_str(s: &str) -> Option<SpecialName> {
        match s {
            "RECEIVING" => Some(SpecialName::Receiving),
            "STAGING" => Some(SpecialName::Staging),
            "SHIPPING" => Some(SpecialName::Shipping),
            "DOCK" => Some(SpecialName::Dock),
            _ => None,
        }
    }
}

/// Result of normalizing a raw location string: either a canonical form,
/// or `Unparseable` carrying the original (cleaned) string for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLocation {
    Canonical(CanonicalLocation),
    Unparseable(String),
}

/// What kind of location a canonical form represents, independent of any
/// warehouse template. See [`crate::virtual_engine::VirtualEngine::classify`]
/// for the template-aware classification into `LocationType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationClass {
    Storage,
    Special(SpecialLocation),
}

pub fn classify(c: CanonicalLocation) -> LocationClass {
    match c {
        CanonicalLocation::Storage { .. } => LocationClass::Storage,
        CanonicalLocation::Special(s) => LocationClass::Special(s),
    }
}

// ---------------------------------------------------------------------
// Regex stages — compiled once, matching spec.md §4.1 exactly.
// ---------------------------------------------------------------------

static PREFIX_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"^USER_[A-Z0-9]+_", r"^WH\d+_", r"^DEFAULT_", r"^WAREHOUSE_"]
        .iter()
        .map(|p| Regex::new(p).expect("valid prefix regex"))
        .collect()
});

static SPECIAL_NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(RECV|STAGE|DOCK|AISLE)-(\d{1,3})$").expect("valid regex"));

static STANDARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{1,3})([A-Z])$").expect("valid regex"));

static COMPACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})([A-Z])(\d{1,2})([A-Z])$").expect("valid regex"));

// User-common fallbacks, most specific first (spec.md §4.1.1).
static FALLBACK_POS_LEVEL_RACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})([A-Z])(\d{1,2})$").expect("valid regex"));
static FALLBACK_LEVEL_RACK_POS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z])(\d{1,2})-(\d{1,3})$").expect("valid regex"));
// Bare position + level, no rack at all (e.g. "010A"); aisle and rack both
// default to 1. Least specific of the fallbacks, tried last.
static FALLBACK_POS_LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})([A-Z])$").expect("valid regex"));

fn strip_prefixes(s: &str) -> String {
    let mut cleaned = s.to_string();
    for pattern in PREFIX_PATTERNS.iter() {
        cleaned = pattern.replace(&cleaned, "").into_owned();
    }
    cleaned
}

fn storage(aisle: u32, rack: u32, position: u32, level: char) -> Option<CanonicalLocation> {
    Some(CanonicalLocation::Storage {
        aisle: u8::try_from(aisle).ok()?,
        rack: u8::try_from(rack).ok()?,
        position: u16::try_from(position).ok()?,
        level,
    })
}

/// Normalize a raw location string to its canonical form.
///
/// Never panics and never fails: an input that matches no known shape
/// comes back as `Unparseable`, carrying the cleaned (trimmed, uppercased,
/// prefix-stripped) string so callers can still display or log it.
pub fn to_canonical(raw: &str) -> ParsedLocation {
    let trimmed = raw.trim().to_uppercase();
    let cleaned = strip_prefixes(&trimmed);

    // Special exact.
    if let Some(name) = SpecialName::from_str(&cleaned) {
        return ParsedLocation::Canonical(CanonicalLocation::Special(SpecialLocation::Named(name)));
    }

    // Special numbered.
    if let Some(caps) = SPECIAL_NUMBERED.captures(&cleaned) {
        let prefix = SpecialPrefix::from_str(&caps[1]).expect("regex group matches known prefix");
        let number: u32 = caps[2].parse().unwrap_or(0);
        if let Ok(number) = u8::try_from(number) {
            return ParsedLocation::Canonical(CanonicalLocation::Special(SpecialLocation::Numbered {
                prefix,
                number,
            }));
        }
    }

    // Standard.
    if let Some(caps) = STANDARD.captures(&cleaned) {
        let aisle: u32 = caps[1].parse().unwrap_or(0);
        let rack: u32 = caps[2].parse().unwrap_or(0);
        let position: u32 = caps[3].parse().unwrap_or(0);
        let level = caps[4].chars().next().expect("regex group is one char");
        if let Some(loc) = storage(aisle, rack, position, level) {
            return ParsedLocation::Canonical(loc);
        }
    }

    // Compact: aisle + levelIgnored + position + level; rack defaults to 1.
    if let Some(caps) = COMPACT.captures(&cleaned) {
        let aisle: u32 = caps[1].parse().unwrap_or(0);
        let position: u32 = caps[3].parse().unwrap_or(0);
        let level = caps[4].chars().next().expect("regex group is one char");
        if let Some(loc) = storage(aisle, 1, position, level) {
            return ParsedLocation::Canonical(loc);
        }
    }

    // User-common fallbacks, most specific to least.
    if let Some(caps) = FALLBACK_POS_LEVEL_RACK.captures(&cleaned) {
        let position: u32 = caps[1].parse().unwrap_or(0);
        let level = caps[2].chars().next().expect("regex group is one char");
        let rack: u32 = caps[3].parse().unwrap_or(0);
        if let Some(loc) = storage(1, rack, position, level) {
            return ParsedLocation::Canonical(loc);
        }
    }
    if let Some(caps) = FALLBACK_LEVEL_RACK_POS.captures(&cleaned) {
        let level = caps[1].chars().next().expect("regex group is one char");
        let rack: u32 = caps[2].parse().unwrap_or(0);
        let position: u32 = caps[3].parse().unwrap_or(0);
        if let Some(loc) = storage(1, rack, position, level) {
            return ParsedLocation::Canonical(loc);
        }
    }
    if let Some(caps) = FALLBACK_POS_LEVEL.captures(&cleaned) {
        let position: u32 = caps[1].parse().unwrap_or(0);
        let level = caps[2].chars().next().expect("regex group is one char");
        if let Some(loc) = storage(1, 1, position, level) {
            return ParsedLocation::Canonical(loc);
        }
    }

    ParsedLocation::Unparseable(cleaned)
}

/// Render a canonical location back to its single textual form.
pub fn render(c: CanonicalLocation) -> String {
    match c {
        CanonicalLocation::Storage { aisle, rack, position, level } => {
            format!("{aisle:02}-{rack:02}-{position:03}{level}")
        }
        CanonicalLocation::Special(SpecialLocation::Named(name)) => name.as_str().to_string(),
        CanonicalLocation::Special(SpecialLocation::Numbered { prefix, number }) => {
            format!("{}-{:02}", prefix.as_str(), number)
        }
    }
}

/// `true` if the raw code normalizes to a special (non-storage) location.
pub fn is_special(raw: &str) -> bool {
    matches!(to_canonical(raw), ParsedLocation::Canonical(CanonicalLocation::Special(_)))
}

/// Emit the canonical form plus up to 4 rewrites actually observed in
/// exported data (two-digit position, compact form, `_N` slot suffix).
/// Bounded to at most 5 elements by construction — callers rely on this.
pub fn search_variants(c: CanonicalLocation) -> Vec<String> {
    let canonical = render(c);
    let mut variants = vec![canonical.clone()];

    match c {
        CanonicalLocation::Storage { aisle, rack, position, level } => {
            variants.push(format!("{aisle:02}-{rack:02}-{position:02}{level}"));
            variants.push(format!("{aisle:02}{level}{position:02}{level}"));
            variants.push(format!("{aisle}-{rack}-{position}{level}"));
            variants.push(format!("{canonical}_{position}"));
        }
        CanonicalLocation::Special(SpecialLocation::Numbered { prefix, number }) => {
            variants.push(format!("{}-{:03}", prefix.as_str(), number));
        }
        CanonicalLocation::Special(SpecialLocation::Named(_)) => {}
    }

    variants.dedup();
    variants.truncate(5);
    variants
}

/// Bounded, thread-safe cache from raw location string to its parsed form
/// (spec.md §5, "Canonical-form LRU cache"). A cache is never load-bearing
/// for correctness (spec.md §9): on overflow we simply clear it rather than
/// track per-entry recency, since eviction is always safe and the next
/// lookup just re-parses.
pub struct CanonicalCache {
    entries: dashmap::DashMap<String, ParsedLocation>,
    capacity: usize,
}

impl CanonicalCache {
    pub fn new(capacity: usize) -> Self {
        Self { entries: dashmap::DashMap::new(), capacity: capacity.max(1) }
    }

    pub fn get_or_parse(&self, raw: &str) -> ParsedLocation {
        if let Some(hit) = self.entries.get(raw) {
            return hit.clone();
        }
        let parsed = to_canonical(raw);
        if self.entries.len() >= self.capacity {
            self.entries.clear();
        }
        self.entries.insert(raw.to_string(), parsed.clone());
        parsed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
