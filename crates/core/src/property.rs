//! Property attributes captured by the form wizard.
//!
//! [`PropertyDetails`] is the input to every valuation. Its unit, type and condition are closed
//! enumerations; their serialised labels match what the browser client and the relay exchange.

use crate::constants::{DEFAULT_LATITUDE, DEFAULT_LONGITUDE};
use crate::error::{ValidationError, ValidationResult};
use crate::validation::{validate_coordinates, validate_location};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum AreaUnit {
    #[serde(rename = "sqft")]
    SquareFeet,
    #[serde(rename = "acre")]
    Acres,
}

impl AreaUnit {
    pub fn label(&self) -> &'static str {
        match self {
            AreaUnit::SquareFeet => "sqft",
            AreaUnit::Acres => "acre",
        }
    }
}

impl fmt::Display for AreaUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AreaUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqft" | "sq ft" | "square-feet" => Ok(AreaUnit::SquareFeet),
            "acre" | "acres" => Ok(AreaUnit::Acres),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown area unit: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum PropertyType {
    Apartment,
    #[serde(rename = "Individual House")]
    IndividualHouse,
    #[serde(rename = "Commercial Space")]
    CommercialSpace,
    #[serde(rename = "Empty Land")]
    EmptyLand,
    #[serde(rename = "Industrial Land")]
    IndustrialLand,
    #[serde(rename = "Agricultural Land")]
    AgriculturalLand,
}

impl PropertyType {
    pub const ALL: [PropertyType; 6] = [
        PropertyType::Apartment,
        PropertyType::IndividualHouse,
        PropertyType::CommercialSpace,
        PropertyType::EmptyLand,
        PropertyType::IndustrialLand,
        PropertyType::AgriculturalLand,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "Apartment",
            PropertyType::IndividualHouse => "Individual House",
            PropertyType::CommercialSpace => "Commercial Space",
            PropertyType::EmptyLand => "Empty Land",
            PropertyType::IndustrialLand => "Industrial Land",
            PropertyType::AgriculturalLand => "Agricultural Land",
        }
    }

    /// Stock photo shown by the visualizer when the user uploaded none.
    pub fn placeholder_image_url(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "https://images.unsplash.com/photo-1545324418-cc1a3fa10c00?auto=format&fit=crop&w=1200&q=80",
            PropertyType::IndividualHouse => "https://images.unsplash.com/photo-1568605114967-8130f3a36994?auto=format&fit=crop&w=1200&q=80",
            PropertyType::CommercialSpace => "https://images.unsplash.com/photo-1486406146926-c627a92ad1ab?auto=format&fit=crop&w=1200&q=80",
            PropertyType::EmptyLand => "https://images.unsplash.com/photo-1500382017468-9049fed747ef?auto=format&fit=crop&w=1200&q=80",
            PropertyType::IndustrialLand => "https://images.unsplash.com/photo-1581091226825-a6a2a5aee158?auto=format&fit=crop&w=1200&q=80",
            PropertyType::AgriculturalLand => "https://images.unsplash.com/photo-1625246333195-78d9c38ad449?auto=format&fit=crop&w=1200&q=80",
        }
    }

    /// Whether the property is bare land rather than a built structure.
    pub fn is_land(&self) -> bool {
        matches!(
            self,
            PropertyType::EmptyLand | PropertyType::IndustrialLand | PropertyType::AgriculturalLand
        )
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PropertyType {
    type Err = ValidationError;

    /// Accepts the display label or a kebab/snake-case spelling, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = canonical_token(s);
        PropertyType::ALL
            .into_iter()
            .find(|ty| canonical_token(ty.label()) == wanted)
            .ok_or_else(|| ValidationError::InvalidInput(format!("unknown property type: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Condition {
    New,
    Good,
    Fair,
    #[serde(rename = "Needs Renovation")]
    NeedsRenovation,
}

impl Condition {
    pub const ALL: [Condition; 4] = [
        Condition::New,
        Condition::Good,
        Condition::Fair,
        Condition::NeedsRenovation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::NeedsRenovation => "Needs Renovation",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Condition {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = canonical_token(s);
        Condition::ALL
            .into_iter()
            .find(|c| canonical_token(c.label()) == wanted)
            .ok_or_else(|| ValidationError::InvalidInput(format!("unknown condition: {s}")))
    }
}

fn canonical_token(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Property attributes as submitted by the form wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetails {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    pub size: f64,
    pub unit: AreaUnit,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub amenities: BTreeSet<String>,
    pub age: u32,
    pub condition: Condition,
    /// Photo of the property as a data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Default for PropertyDetails {
    fn default() -> Self {
        Self {
            location: String::new(),
            lat: Some(DEFAULT_LATITUDE),
            lng: Some(DEFAULT_LONGITUDE),
            size: 1200.0,
            unit: AreaUnit::SquareFeet,
            property_type: PropertyType::Apartment,
            amenities: BTreeSet::new(),
            age: 0,
            condition: Condition::New,
            image: None,
        }
    }
}

impl PropertyDetails {
    /// Both coordinates, when the pin has been placed.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }

    pub fn set_coordinates(&mut self, coords: Coordinates) {
        self.lat = Some(coords.latitude);
        self.lng = Some(coords.longitude);
    }

    /// Amenities in a stable order, comma separated.
    pub fn amenities_label(&self) -> String {
        self.amenities
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Copy without the embedded photo, as forwarded by the relay.
    pub fn without_image(&self) -> Self {
        Self {
            image: None,
            ..self.clone()
        }
    }

    /// Check the invariants a submitted form must satisfy.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidInput` if:
    /// - the location is empty,
    /// - the size is negative or not finite,
    /// - only one of `lat`/`lng` is present, or either is out of range.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_location(&self.location)?;

        if !self.size.is_finite() || self.size < 0.0 {
            return Err(ValidationError::InvalidInput(
                "size must be a non-negative number".into(),
            ));
        }

        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => validate_coordinates(lat, lng),
            (None, None) => Ok(()),
            _ => Err(ValidationError::InvalidInput(
                "latitude and longitude must be supplied together".into(),
            )),
        }
    }
}
