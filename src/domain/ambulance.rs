use super::location::GeoPoint;
use super::payload::{AmbulanceChange, AmbulanceForm};
use super::update::AmbulanceUpdate;
use crate::error::{DispatchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmbulanceCapability {
    #[serde(rename = "B")]
    Basic,
    #[serde(rename = "A")]
    Advanced,
    #[serde(rename = "R")]
    Rescue,
}

impl fmt::Display for AmbulanceCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Basic => "Basic",
            Self::Advanced => "Advanced",
            Self::Rescue => "Rescue",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AmbulanceStatus {
    #[default]
    #[serde(rename = "UK")]
    Unknown,
    #[serde(rename = "AV")]
    Available,
    #[serde(rename = "OS")]
    OutOfService,
    #[serde(rename = "PB")]
    PatientBound,
    #[serde(rename = "AP")]
    AtPatient,
    #[serde(rename = "HB")]
    HospitalBound,
    #[serde(rename = "AH")]
    AtHospital,
    #[serde(rename = "BB")]
    BaseBound,
    #[serde(rename = "AB")]
    AtBase,
    #[serde(rename = "WB")]
    WaypointBound,
    #[serde(rename = "AW")]
    AtWaypoint,
}

impl fmt::Display for AmbulanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "Unknown",
            Self::Available => "Available",
            Self::OutOfService => "Out of service",
            Self::PatientBound => "Patient bound",
            Self::AtPatient => "At patient",
            Self::HospitalBound => "Hospital bound",
            Self::AtHospital => "At hospital",
            Self::BaseBound => "Base bound",
            Self::AtBase => "At base",
            Self::WaypointBound => "Waypoint bound",
            Self::AtWaypoint => "At waypoint",
        })
    }
}

/// An ambulance and its latest known state.
///
/// `timestamp` is the time of the last location fix, `updated_on` the time of
/// the last write of any field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ambulance {
    pub id: u32,
    pub identifier: String,
    pub capability: AmbulanceCapability,
    pub status: AmbulanceStatus,
    pub orientation: f64,
    pub location: Option<GeoPoint>,
    pub timestamp: DateTime<Utc>,
    pub comment: String,
    pub updated_by: String,
    pub updated_on: DateTime<Utc>,
}

fn validate_orientation(orientation: f64) -> Result<f64> {
    if (0.0..360.0).contains(&orientation) {
        Ok(orientation)
    } else {
        Err(DispatchError::ValidationError(format!(
            "Orientation {} must be in [0, 360)",
            orientation
        )))
    }
}

impl Ambulance {
    pub fn new(id: u32, form: AmbulanceForm, operator: &str, now: DateTime<Utc>) -> Result<Self> {
        let identifier = form.identifier.trim().to_string();
        if identifier.is_empty() {
            return Err(DispatchError::ValidationError(
                "Ambulance identifier must not be empty".to_string(),
            ));
        }
        let location = GeoPoint::from_parts(form.latitude, form.longitude)?;

        Ok(Self {
            id,
            identifier,
            capability: form.capability,
            status: form.status,
            orientation: validate_orientation(form.orientation.unwrap_or(0.0))?,
            location,
            timestamp: now,
            comment: form.comment.unwrap_or_default(),
            updated_by: operator.to_string(),
            updated_on: now,
        })
    }

    /// Applies a change and returns the history record describing the new state.
    ///
    /// Nothing is modified when the change is invalid. A new location moves
    /// `timestamp` to the time of the fix.
    pub fn apply(
        &mut self,
        update_id: u32,
        change: AmbulanceChange,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<AmbulanceUpdate> {
        let orientation = change.orientation.map(validate_orientation).transpose()?;
        let location = change.location.map(GeoPoint::validated).transpose()?;
        let fix_time = change.timestamp.unwrap_or(now);

        if let Some(status) = change.status {
            self.status = status;
        }
        if let Some(capability) = change.capability {
            self.capability = capability;
        }
        if let Some(orientation) = orientation {
            self.orientation = orientation;
        }
        if let Some(location) = location
            && self.location != Some(location)
        {
            self.location = Some(location);
            self.timestamp = fix_time;
        }
        if let Some(comment) = change.comment {
            self.comment = comment;
        }
        self.updated_by = operator.to_string();
        self.updated_on = now;

        Ok(self.snapshot(update_id, fix_time))
    }

    /// History record of the current state, stamped at `timestamp`.
    pub fn snapshot(&self, update_id: u32, timestamp: DateTime<Utc>) -> AmbulanceUpdate {
        AmbulanceUpdate {
            id: update_id,
            ambulance_id: self.id,
            ambulance_identifier: self.identifier.clone(),
            status: self.status,
            orientation: self.orientation,
            location: self.location,
            timestamp,
            comment: self.comment.clone(),
            updated_by: self.updated_by.clone(),
            updated_on: self.updated_on,
        }
    }
}
