//! Virtual Location Engine (C2).
//!
//! A warehouse template implies a set of valid locations — the "virtual
//! universe" — without ever materializing one record per slot. A
//! 12-aisle warehouse with 12 racks, 100 positions, and 4 levels implies
//! ~58k storage slots; validating a location against it is four integer
//! comparisons, not a row lookup.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

use crate::location::{CanonicalLocation, ParsedLocation, SpecialLocation};

/// The kind of non-storage area a template declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialAreaType {
    Receiving,
    Staging,
    Dock,
    Transitional,
}

/// One declared special area: its code, type, capacity, and zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialArea {
    pub code: String,
    pub area_type: SpecialAreaType,
    pub capacity: u32,
    pub zone: String,
}

/// The compact description of a warehouse's physical layout.
///
/// Invariants (checked by [`WarehouseTemplate::validate`]): `level_names`
/// has at least `levels_per_position` characters; special-area codes are
/// unique; every storage dimension is at least 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseTemplate {
    pub warehouse_id: String,
    pub num_aisles: u8,
    pub racks_per_aisle: u8,
    pub positions_per_rack: u16,
    pub levels_per_position: u8,
    pub level_names: String,
    pub default_pallet_capacity: u32,
    pub special_areas: Vec<SpecialArea>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum TemplateError {
    #[error("level_names has {have} characters, need at least {need}")]
    TooFewLevelNames { have: usize, need: usize },
    #[error("duplicate special area code: {0}")]
    DuplicateSpecialAreaCode(String),
    #[error("storage dimension {field} must be >= 1")]
    ZeroDimension { field: &'static str },
}

impl WarehouseTemplate {
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.level_names.chars().count() < self.levels_per_position as usize {
            return Err(TemplateError::TooFewLevelNames {
                have: self.level_names.chars().count(),
                need: self.levels_per_position as usize,
            });
        }
        if self.num_aisles == 0 {
            return Err(TemplateError::ZeroDimension { field: "num_aisles" });
        }
        if self.racks_per_aisle == 0 {
            return Err(TemplateError::ZeroDimension { field: "racks_per_aisle" });
        }
        if self.positions_per_rack == 0 {
            return Err(TemplateError::ZeroDimension { field: "positions_per_rack" });
        }
        if self.levels_per_position == 0 {
            return Err(TemplateError::ZeroDimension { field: "levels_per_position" });
        }
        let mut seen = std::collections::HashSet::new();
        for area in &self.special_areas {
            if !seen.insert(&area.code) {
                return Err(TemplateError::DuplicateSpecialAreaCode(area.code.clone()));
            }
        }
        Ok(())
    }

    /// Levels actually in play for this template (the first `levels_per_position`
    /// characters of `level_names`).
    fn active_levels(&self) -> Vec<char> {
        self.level_names.chars().take(self.levels_per_position as usize).collect()
    }

    /// A `u64` digest of the fields that determine the virtual universe,
    /// used as the engine cache key alongside `warehouse_id`.
    pub fn digest(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        self.num_aisles.hash(&mut hasher);
        self.racks_per_aisle.hash(&mut hasher);
        self.positions_per_rack.hash(&mut hasher);
        self.levels_per_position.hash(&mut hasher);
        self.level_names.hash(&mut hasher);
        self.default_pallet_capacity.hash(&mut hasher);
        for area in &self.special_areas {
            area.code.hash(&mut hasher);
            area.capacity.hash(&mut hasher);
            area.zone.hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// What [`VirtualEngine::classify`] reports a location as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationType {
    Storage,
    Receiving,
    Staging,
    Dock,
    Transitional,
    Unknown,
}

/// Outcome of validating a canonical location against an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid { location_type: LocationType, zone: Option<String>, capacity: u32 },
    NotInUniverse,
    Unparseable(String),
}

/// Totals describing a virtual universe, for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseSummary {
    pub total_possible: u64,
    pub storage_count: u64,
    pub special_count: u64,
}

/// A pure, O(1)-query view over a template's implied location universe.
/// Never materializes per-slot records.
pub struct VirtualEngine {
    template: WarehouseTemplate,
    levels: Vec<char>,
    special_by_code: HashMap<String, SpecialArea>,
}

impl VirtualEngine {
    pub fn build(template: WarehouseTemplate) -> Result<Self, TemplateError> {
        template.validate()?;
        let levels = template.active_levels();
        let special_by_code =
            template.special_areas.iter().map(|a| (a.code.clone(), a.clone())).collect();
        Ok(Self { template, levels, special_by_code })
    }

    pub fn template(&self) -> &WarehouseTemplate {
        &self.template
    }

    /// O(1): range checks for storage, a map lookup for special areas.
    pub fn validate(&self, parsed: &ParsedLocation) -> ValidationResult {
        match parsed {
            ParsedLocation::Unparseable(s) => ValidationResult::Unparseable(s.clone()),
            ParsedLocation::Canonical(CanonicalLocation::Storage { aisle, rack, position, level }) => {
                let in_range = (1..=self.template.num_aisles).contains(aisle)
                    && (1..=self.template.racks_per_aisle).contains(rack)
                    && (1..=self.template.positions_per_rack).contains(position)
                    && self.levels.contains(level);
                if in_range {
                    ValidationResult::Valid {
                        location_type: LocationType::Storage,
                        zone: None,
                        capacity: self.template.default_pallet_capacity,
                    }
                } else {
                    ValidationResult::NotInUniverse
                }
            }
            ParsedLocation::Canonical(CanonicalLocation::Special(special)) => {
                let code = crate::location::render(CanonicalLocation::Special(*special));
                match self.special_by_code.get(&code) {
                    Some(area) => ValidationResult::Valid {
                        location_type: location_type_of(area.area_type),
                        zone: Some(area.zone.clone()),
                        capacity: area.capacity,
                    },
                    None => ValidationResult::NotInUniverse,
                }
            }
        }
    }

    /// Template-aware classification. Distinct from
    /// [`crate::location::classify`], which only distinguishes storage from
    /// special without knowing the template's declared area types.
    pub fn classify(&self, parsed: &ParsedLocation) -> LocationType {
        match self.validate(parsed) {
            ValidationResult::Valid { location_type, .. } => location_type,
            _ => LocationType::Unknown,
        }
    }

    /// Restartable diagnostic enumeration of every location in the
    /// universe. Never required for validation — `validate` never calls
    /// this.
    pub fn enumerate(&self) -> impl Iterator<Item = CanonicalLocation> + '_ {
        let storage = (1..=self.template.num_aisles).flat_map(move |aisle| {
            (1..=self.template.racks_per_aisle).flat_map(move |rack| {
                (1..=self.template.positions_per_rack).flat_map(move |position| {
                    self.levels.iter().map(move |&level| CanonicalLocation::Storage {
                        aisle,
                        rack,
                        position,
                        level,
                    })
                })
            })
        });
        let special = self.template.special_areas.iter().filter_map(|area| {
            match crate::location::to_canonical(&area.code) {
                ParsedLocation::Canonical(c) => Some(c),
                ParsedLocation::Unparseable(_) => None,
            }
        });
        storage.chain(special)
    }

    pub fn summary(&self) -> UniverseSummary {
        let storage_count = u64::from(self.template.num_aisles)
            * u64::from(self.template.racks_per_aisle)
            * u64::from(self.template.positions_per_rack)
            * u64::from(self.template.levels_per_position);
        let special_count = self.template.special_areas.len() as u64;
        UniverseSummary {
            total_possible: storage_count + special_count,
            storage_count,
            special_count,
        }
    }
}

fn location_type_of(area_type: SpecialAreaType) -> LocationType {
    match area_type {
        SpecialAreaType::Receiving => LocationType::Receiving,
        SpecialAreaType::Staging => LocationType::Staging,
        SpecialAreaType::Dock => LocationType::Dock,
        SpecialAreaType::Transitional => LocationType::Transitional,
    }
}

/// Read-mostly cache of built engines, keyed by `(warehouseId, template
/// digest)` (spec.md §4.2 "Caching", §5 "Shared resources"). Engines are
/// pure functions of their template, so a cache hit is always correct;
/// the only write path is `invalidate`, which a caller uses after
/// replacing a warehouse's template.
pub struct VirtualEngineCache {
    entries: dashmap::DashMap<(String, u64), Arc<VirtualEngine>>,
}

impl VirtualEngineCache {
    pub fn new() -> Self {
        Self { entries: dashmap::DashMap::new() }
    }

    /// Return the cached engine for this template's `(warehouseId, digest)`,
    /// building and inserting one on a miss.
    pub fn get_or_build(&self, template: &WarehouseTemplate) -> Result<Arc<VirtualEngine>, TemplateError> {
        let key = (template.warehouse_id.clone(), template.digest());
        if let Some(existing) = self.entries.get(&key) {
            return Ok(Arc::clone(&existing));
        }
        let engine = Arc::new(VirtualEngine::build(template.clone())?);
        self.entries.insert(key, Arc::clone(&engine));
        Ok(engine)
    }

    /// Drop every cached engine for `warehouse_id`, regardless of digest.
    /// Single-writer semantics: callers invalidate after a template
    /// change; a concurrent reader either sees the old engine (still
    /// correct for its own in-flight evaluation) or rebuilds on the next
    /// `get_or_build`.
    pub fn invalidate(&self, warehouse_id: &str) {
        self.entries.retain(|(id, _), _| id != warehouse_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for VirtualEngineCache {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide engine cache (spec.md §9, "Process-wide state").
static ENGINE_CACHE: LazyLock<VirtualEngineCache> = LazyLock::new(VirtualEngineCache::new);

/// Look up or build an engine for `template` in the process-wide cache.
pub fn cached_engine(template: &WarehouseTemplate) -> Result<Arc<VirtualEngine>, TemplateError> {
    ENGINE_CACHE.get_or_build(template)
}

/// Invalidate every cached engine for `warehouse_id` (e.g. after its
/// template changed upstream).
pub fn invalidate_cached_engine(warehouse_id: &str) {
    ENGINE_CACHE.invalidate(warehouse_id);
}
