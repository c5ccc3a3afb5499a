//! Enrichment request as read from the input stream

use serde::{Deserialize, Serialize};

use crate::{
    errors::DomainError,
    value_objects::{AdminLevel, GeoLocation},
};

/// A location record to enrich
///
/// Address fragments are free text. Only `country` is mandatory; blank
/// fragments are treated as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichRequest {
    /// Opaque correlation id, echoed in the result
    pub id: String,
    /// Country name
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Whether the listing is publicly visible; transport lookups only run for visible records
    #[serde(default)]
    pub visible: bool,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl EnrichRequest {
    /// Create a request with only the mandatory fields
    pub fn new(id: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            country: country.into(),
            region: None,
            province: None,
            city: None,
            district: None,
            neighborhood: None,
            street: None,
            house_number: None,
            latitude: None,
            longitude: None,
            visible: false,
        }
    }

    /// Set the name for one administrative level (country overwrites the mandatory field)
    #[must_use]
    pub fn with_name(mut self, level: AdminLevel, name: impl Into<String>) -> Self {
        let name = name.into();
        match level {
            AdminLevel::Country => self.country = name,
            AdminLevel::Region => self.region = Some(name),
            AdminLevel::Province => self.province = Some(name),
            AdminLevel::City => self.city = Some(name),
            AdminLevel::District => self.district = Some(name),
            AdminLevel::Neighborhood => self.neighborhood = Some(name),
        }
        self
    }

    /// Set coordinates
    #[must_use]
    pub const fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Set street and house number
    #[must_use]
    pub fn with_address(
        mut self,
        street: impl Into<String>,
        house_number: impl Into<String>,
    ) -> Self {
        self.street = Some(street.into());
        self.house_number = Some(house_number.into());
        self
    }

    /// Set the visibility flag
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Name supplied for a level, if non-blank
    #[must_use]
    pub fn name_at(&self, level: AdminLevel) -> Option<&str> {
        match level {
            AdminLevel::Country => Some(self.country.trim()).filter(|v| !v.is_empty()),
            AdminLevel::Region => non_blank(self.region.as_ref()),
            AdminLevel::Province => non_blank(self.province.as_ref()),
            AdminLevel::City => non_blank(self.city.as_ref()),
            AdminLevel::District => non_blank(self.district.as_ref()),
            AdminLevel::Neighborhood => non_blank(self.neighborhood.as_ref()),
        }
    }

    /// Most detailed sub-country name supplied (neighborhood first, region last)
    #[must_use]
    pub fn most_specific_name(&self) -> Option<(AdminLevel, &str)> {
        AdminLevel::SEED_PRIORITY
            .into_iter()
            .find_map(|level| self.name_at(level).map(|name| (level, name)))
    }

    /// Whether any name below country level was supplied
    #[must_use]
    pub fn has_sub_country_names(&self) -> bool {
        self.most_specific_name().is_some()
    }

    /// All supplied names, country first
    #[must_use]
    pub fn name_terms(&self) -> Vec<(AdminLevel, &str)> {
        AdminLevel::ALL
            .into_iter()
            .filter_map(|level| self.name_at(level).map(|name| (level, name)))
            .collect()
    }

    /// Validated coordinates
    ///
    /// # Errors
    ///
    /// Returns `InvalidCoordinates` when only one half of the pair is present
    /// or the values are out of range.
    pub fn location(&self) -> Result<Option<GeoLocation>, DomainError> {
        match (self.latitude, self.longitude) {
            (None, None) => Ok(None),
            (Some(lat), Some(lon)) => Ok(Some(GeoLocation::new(lat, lon)?)),
            _ => Err(DomainError::InvalidCoordinates(
                "latitude and longitude must be supplied together".to_string(),
            )),
        }
    }

    /// Whether both coordinates are present (not necessarily valid)
    #[must_use]
    pub const fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Whether nearby transport should be looked up for this record
    #[must_use]
    pub const fn wants_transport(&self) -> bool {
        self.visible && self.has_coordinates()
    }

    /// Whether both street and house number are present
    #[must_use]
    pub fn has_full_address(&self) -> bool {
        non_blank(self.street.as_ref()).is_some() && non_blank(self.house_number.as_ref()).is_some()
    }
}
