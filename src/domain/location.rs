use crate::error::{DispatchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        Self { latitude, longitude }.validated()
    }

    /// Checks the coordinate ranges of a point that was built or deserialized directly.
    pub fn validated(self) -> Result<Self> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(DispatchError::ValidationError(format!(
                "Latitude {} out of range",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(DispatchError::ValidationError(format!(
                "Longitude {} out of range",
                self.longitude
            )));
        }
        Ok(self)
    }

    /// Builds a point from a pair of optional columns. Both or neither must be set.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Result<Option<Self>> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Self::new(latitude, longitude).map(Some),
            (None, None) => Ok(None),
            _ => Err(DispatchError::ValidationError(
                "Latitude and longitude must be given together".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationType {
    #[serde(rename = "b")]
    Base,
    #[serde(rename = "a")]
    Aed,
    #[serde(rename = "i")]
    Incident,
    #[serde(rename = "h")]
    Hospital,
    #[serde(rename = "w")]
    Waypoint,
    #[serde(rename = "o")]
    Other,
}

impl LocationType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Base => "Base",
            Self::Aed => "Defibrillator",
            Self::Incident => "Incident",
            Self::Hospital => "Hospital",
            Self::Waypoint => "Waypoint",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Street address of a place. Every part is optional free text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub number: String,
    pub street: String,
    pub unit: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub country: String,
}

/// A typed place: an incident scene, a hospital, a base, or any stop on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: u32,
    pub r#type: LocationType,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub address: Address,
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub comment: String,
    pub updated_by: Option<String>,
    pub updated_on: Option<DateTime<Utc>>,
}

impl Location {
    pub fn new(id: u32, r#type: LocationType) -> Self {
        Self {
            id,
            r#type,
            name: String::new(),
            address: Address::default(),
            location: None,
            comment: String::new(),
            updated_by: None,
            updated_on: None,
        }
    }

    /// Marks the location as written by `operator` at `now`.
    pub fn touch(&mut self, operator: &str, now: DateTime<Utc>) {
        self.updated_by = Some(operator.to_string());
        self.updated_on = Some(now);
    }
}
