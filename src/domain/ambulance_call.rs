use super::location::Location;
use crate::error::{DispatchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AmbulanceCallStatus {
    #[default]
    #[serde(rename = "R")]
    Requested,
    #[serde(rename = "O")]
    Ongoing,
    #[serde(rename = "D")]
    Declined,
    #[serde(rename = "S")]
    Suspended,
    #[serde(rename = "C")]
    Completed,
}

impl AmbulanceCallStatus {
    pub fn can_transition_to(self, to: Self) -> bool {
        use AmbulanceCallStatus::*;
        matches!(
            (self, to),
            (Requested, Ongoing)
                | (Requested, Declined)
                | (Declined, Requested)
                | (Ongoing, Suspended)
                | (Suspended, Ongoing)
                | (Ongoing, Completed)
                | (Suspended, Completed)
        )
    }

    /// Still waiting on or serving the call.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Requested | Self::Ongoing | Self::Suspended)
    }
}

impl fmt::Display for AmbulanceCallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Requested => "Requested",
            Self::Ongoing => "Ongoing",
            Self::Declined => "Declined",
            Self::Suspended => "Suspended",
            Self::Completed => "Completed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbulanceCall {
    pub id: u32,
    pub call_id: u32,
    pub ambulance_id: u32,
    pub status: AmbulanceCallStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: u32,
    pub ambulance_call_id: u32,
    pub order: u32,
    pub visited: bool,
    pub location: Location,
}

/// An ambulance-call together with its route, as stored and serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbulanceCallRecord {
    #[serde(flatten)]
    pub ambulance_call: AmbulanceCall,
    #[serde(default)]
    pub waypoint_set: Vec<Waypoint>,
}

impl AmbulanceCallRecord {
    pub fn new(id: u32, call_id: u32, ambulance_id: u32, now: DateTime<Utc>) -> Self {
        Self {
            ambulance_call: AmbulanceCall {
                id,
                call_id,
                ambulance_id,
                status: AmbulanceCallStatus::Requested,
                created_at: now,
            },
            waypoint_set: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.ambulance_call.id
    }

    pub fn ambulance_id(&self) -> u32 {
        self.ambulance_call.ambulance_id
    }

    pub fn status(&self) -> AmbulanceCallStatus {
        self.ambulance_call.status
    }

    pub fn set_status(&mut self, to: AmbulanceCallStatus) -> Result<()> {
        let from = self.ambulance_call.status;
        if from == to {
            return Ok(());
        }
        if !from.can_transition_to(to) {
            return Err(DispatchError::InvalidTransition {
                entity: "ambulance call",
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        self.ambulance_call.status = to;
        Ok(())
    }

    /// Inserts a waypoint keeping the route sorted by `order`.
    pub fn insert_waypoint(&mut self, waypoint: Waypoint) -> Result<()> {
        match self
            .waypoint_set
            .binary_search_by_key(&waypoint.order, |w| w.order)
        {
            Ok(_) => Err(DispatchError::ValidationError(format!(
                "Ambulance call {} already has a waypoint with order {}",
                self.id(),
                waypoint.order
            ))),
            Err(index) => {
                self.waypoint_set.insert(index, waypoint);
                Ok(())
            }
        }
    }

    pub fn visit_waypoint(&mut self, waypoint_id: u32) -> Result<&Waypoint> {
        let waypoint = self
            .waypoint_set
            .iter_mut()
            .find(|w| w.id == waypoint_id)
            .ok_or_else(|| DispatchError::not_found("waypoint", waypoint_id))?;
        waypoint.visited = true;
        Ok(waypoint)
    }

    /// First unvisited stop on the route.
    pub fn next_waypoint(&self) -> Option<&Waypoint> {
        self.waypoint_set.iter().find(|w| !w.visited)
    }
}
