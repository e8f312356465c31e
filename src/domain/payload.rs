//! Write-side shapes.
//!
//! These mirror the nested request bodies accepted by the dispatch API: a call
//! arrives together with its ambulance assignments, their routes and its
//! patients, and is accepted or rejected as a whole.

use super::ambulance::{AmbulanceCapability, AmbulanceStatus};
use super::call::{CallPriority, CallStatus};
use super::location::{Address, GeoPoint, Location, LocationType};
use crate::error::{DispatchError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CallPayload {
    #[serde(default)]
    pub status: CallStatus,
    #[serde(default)]
    pub priority: CallPriority,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub ambulancecall_set: Vec<AmbulanceCallPayload>,
    #[serde(default)]
    pub patient_set: Vec<PatientPayload>,
}

impl CallPayload {
    /// Checks everything that can be checked without looking at stored data.
    pub fn validate(&self) -> Result<()> {
        match self.status {
            CallStatus::Pending => {}
            CallStatus::Started if self.ambulancecall_set.is_empty() => {
                return Err(DispatchError::ValidationError(
                    "A started call needs at least one ambulance".to_string(),
                ));
            }
            CallStatus::Started => {}
            CallStatus::Ended => {
                return Err(DispatchError::ValidationError(
                    "A call cannot be created as ended".to_string(),
                ));
            }
        }

        let mut ambulances = HashSet::new();
        for ambulance_call in &self.ambulancecall_set {
            if !ambulances.insert(ambulance_call.ambulance_id) {
                return Err(DispatchError::IntegrityError(format!(
                    "Ambulance {} is listed twice",
                    ambulance_call.ambulance_id
                )));
            }
            ambulance_call.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AmbulanceCallPayload {
    pub ambulance_id: u32,
    #[serde(default)]
    pub waypoint_set: Vec<WaypointPayload>,
}

impl AmbulanceCallPayload {
    pub fn validate(&self) -> Result<()> {
        let mut orders = HashSet::new();
        for waypoint in &self.waypoint_set {
            if !orders.insert(waypoint.order) {
                return Err(DispatchError::ValidationError(format!(
                    "Waypoint order {} is repeated for ambulance {}",
                    waypoint.order, self.ambulance_id
                )));
            }
            waypoint.validate()?;
        }
        Ok(())
    }
}

/// A stop on a route: either a new place described inline, or a reference to a
/// registered one (a hospital or a base, typically).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WaypointPayload {
    pub order: u32,
    #[serde(default)]
    pub visited: bool,
    #[serde(default)]
    pub location: Option<LocationPayload>,
    #[serde(default)]
    pub location_id: Option<u32>,
}

impl WaypointPayload {
    pub fn validate(&self) -> Result<()> {
        match (&self.location, self.location_id) {
            (Some(location), None) => location.validate(),
            (None, Some(_)) => Ok(()),
            (Some(_), Some(_)) => Err(DispatchError::ValidationError(format!(
                "Waypoint {} has both an inline location and a location id",
                self.order
            ))),
            (None, None) => Err(DispatchError::ValidationError(format!(
                "Waypoint {} has no location",
                self.order
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationPayload {
    pub r#type: LocationType,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub address: Address,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub comment: String,
}

impl LocationPayload {
    pub fn validate(&self) -> Result<()> {
        if let Some(point) = self.location {
            point.validated()?;
        }
        Ok(())
    }

    pub fn into_location(self, id: u32, operator: &str, now: DateTime<Utc>) -> Location {
        let mut location = Location::new(id, self.r#type);
        location.name = self.name.trim().to_string();
        location.address = self.address;
        location.location = self.location;
        location.comment = self.comment;
        location.touch(operator, now);
        location
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PatientPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
}

/// Partial update of a call. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CallPatch {
    pub status: Option<CallStatus>,
    pub priority: Option<CallPriority>,
    pub details: Option<String>,
    pub comment: Option<String>,
}

/// Registration of a new ambulance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AmbulanceForm {
    pub identifier: String,
    pub capability: AmbulanceCapability,
    #[serde(default)]
    pub status: AmbulanceStatus,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub orientation: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Change reported for an ambulance. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AmbulanceChange {
    pub status: Option<AmbulanceStatus>,
    pub capability: Option<AmbulanceCapability>,
    pub orientation: Option<f64>,
    pub location: Option<GeoPoint>,
    /// When the change happened; defaults to the time it is applied.
    pub timestamp: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}
