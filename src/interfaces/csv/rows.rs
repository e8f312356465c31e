//! Flat CSV row shapes and their conversion into domain payloads.
//!
//! Empty cells deserialize to `None`, so every optional column may be left blank
//! or omitted.

use crate::domain::ambulance::{AmbulanceCapability, AmbulanceStatus};
use crate::domain::location::{Address, GeoPoint, LocationType};
use crate::domain::payload::{AmbulanceChange, AmbulanceForm, LocationPayload};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `identifier,capability,status,comment,orientation,latitude,longitude`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AmbulanceRow {
    pub identifier: String,
    pub capability: AmbulanceCapability,
    #[serde(default)]
    pub status: Option<AmbulanceStatus>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub orientation: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl From<AmbulanceRow> for AmbulanceForm {
    fn from(row: AmbulanceRow) -> Self {
        Self {
            identifier: row.identifier,
            capability: row.capability,
            status: row.status.unwrap_or_default(),
            comment: row.comment,
            orientation: row.orientation,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

/// `type,name,number,street,unit,neighborhood,city,state,zipcode,country,latitude,longitude,comment`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationRow {
    pub r#type: LocationType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl LocationRow {
    pub fn into_payload(self) -> Result<LocationPayload> {
        Ok(LocationPayload {
            r#type: self.r#type,
            name: self.name.unwrap_or_default(),
            address: Address {
                number: self.number.unwrap_or_default(),
                street: self.street.unwrap_or_default(),
                unit: self.unit.unwrap_or_default(),
                neighborhood: self.neighborhood.unwrap_or_default(),
                city: self.city.unwrap_or_default(),
                state: self.state.unwrap_or_default(),
                zipcode: self.zipcode.unwrap_or_default(),
                country: self.country.unwrap_or_default(),
            },
            location: GeoPoint::from_parts(self.latitude, self.longitude)?,
            comment: self.comment.unwrap_or_default(),
        })
    }
}

/// `ambulance,status,latitude,longitude,orientation,timestamp,comment`
///
/// `ambulance` is the ambulance's identifier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateRow {
    pub ambulance: String,
    #[serde(default)]
    pub status: Option<AmbulanceStatus>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub orientation: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl UpdateRow {
    pub fn into_change(self) -> Result<(String, AmbulanceChange)> {
        let change = AmbulanceChange {
            status: self.status,
            capability: None,
            orientation: self.orientation,
            location: GeoPoint::from_parts(self.latitude, self.longitude)?,
            timestamp: self.timestamp,
            comment: self.comment,
        };
        Ok((self.ambulance, change))
    }
}
