//! Administrative boundaries and the resolved hierarchy

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value_objects::AdminLevel;

/// A boundary as held by the boundary store
///
/// Boundaries reference their parent by id only; the store owns every node
/// and parent links are followed by lookup. The data may contain cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminBoundary {
    /// Store id
    pub id: i64,
    /// Canonical name
    pub name: String,
    /// Language code → translated name
    pub translations: BTreeMap<String, String>,
    /// Raw numeric admin level
    pub admin_level: i16,
    /// Parent boundary id, `None` at the hierarchy root
    pub parent_id: Option<i64>,
}

impl AdminBoundary {
    /// Create a boundary without translations
    pub fn new(
        id: i64,
        name: impl Into<String>,
        level: AdminLevel,
        parent_id: Option<i64>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            translations: BTreeMap::new(),
            admin_level: level.code(),
            parent_id,
        }
    }

    /// Add a translated name
    #[must_use]
    pub fn with_translation(mut self, lang: impl Into<String>, name: impl Into<String>) -> Self {
        self.translations.insert(lang.into(), name.into());
        self
    }

    /// Hierarchy level, `None` for levels the pipeline does not track
    #[must_use]
    pub const fn level(&self) -> Option<AdminLevel> {
        AdminLevel::from_code(self.admin_level)
    }
}

/// Public view of one resolved level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryInfo {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub translations: BTreeMap<String, String>,
}

impl From<&AdminBoundary> for BoundaryInfo {
    fn from(boundary: &AdminBoundary) -> Self {
        Self {
            id: boundary.id,
            name: boundary.name.clone(),
            translations: boundary.translations.clone(),
        }
    }
}

/// Administrative hierarchy of a location, at most one boundary per level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<BoundaryInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<BoundaryInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<BoundaryInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<BoundaryInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<BoundaryInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<BoundaryInfo>,
}

impl EnrichedLocation {
    /// Boundary at a level
    #[must_use]
    pub const fn get(&self, level: AdminLevel) -> Option<&BoundaryInfo> {
        match level {
            AdminLevel::Country => self.country.as_ref(),
            AdminLevel::Region => self.region.as_ref(),
            AdminLevel::Province => self.province.as_ref(),
            AdminLevel::City => self.city.as_ref(),
            AdminLevel::District => self.district.as_ref(),
            AdminLevel::Neighborhood => self.neighborhood.as_ref(),
        }
    }

    fn slot_mut(&mut self, level: AdminLevel) -> &mut Option<BoundaryInfo> {
        match level {
            AdminLevel::Country => &mut self.country,
            AdminLevel::Region => &mut self.region,
            AdminLevel::Province => &mut self.province,
            AdminLevel::City => &mut self.city,
            AdminLevel::District => &mut self.district,
            AdminLevel::Neighborhood => &mut self.neighborhood,
        }
    }

    /// Fill a level if it is still empty; returns whether the value was taken
    pub fn fill(&mut self, level: AdminLevel, info: BoundaryInfo) -> bool {
        let slot = self.slot_mut(level);
        if slot.is_some() {
            return false;
        }
        *slot = Some(info);
        true
    }

    /// Fill from a store boundary; boundaries at untracked levels are ignored
    pub fn fill_from(&mut self, boundary: &AdminBoundary) -> bool {
        boundary
            .level()
            .is_some_and(|level| self.fill(level, BoundaryInfo::from(boundary)))
    }

    /// Copy every level of `other` that is empty here
    pub fn merge_missing(&mut self, other: Self) {
        let Self {
            country,
            region,
            province,
            city,
            district,
            neighborhood,
        } = other;
        let incoming = [
            (AdminLevel::Country, country),
            (AdminLevel::Region, region),
            (AdminLevel::Province, province),
            (AdminLevel::City, city),
            (AdminLevel::District, district),
            (AdminLevel::Neighborhood, neighborhood),
        ];
        for (level, info) in incoming {
            if let Some(info) = info {
                self.fill(level, info);
            }
        }
    }

    /// Number of populated levels
    #[must_use]
    pub fn populated_count(&self) -> usize {
        AdminLevel::ALL
            .into_iter()
            .filter(|level| self.get(*level).is_some())
            .count()
    }

    /// Whether no level is populated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.populated_count() == 0
    }

    /// Whether at least one of country/region/province/city is populated
    #[must_use]
    pub fn has_useful_level(&self) -> bool {
        AdminLevel::ALL
            .into_iter()
            .filter(|level| level.is_useful())
            .any(|level| self.get(level).is_some())
    }
}
