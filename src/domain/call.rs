use super::ambulance_call::{AmbulanceCallRecord, AmbulanceCallStatus};
use super::patient::Patient;
use super::update::TimeRange;
use crate::error::{DispatchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CallStatus {
    #[default]
    #[serde(rename = "P")]
    Pending,
    #[serde(rename = "S")]
    Started,
    #[serde(rename = "E")]
    Ended,
}

impl CallStatus {
    pub fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Started) | (Self::Pending, Self::Ended) | (Self::Started, Self::Ended)
        )
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "Pending",
            Self::Started => "Started",
            Self::Ended => "Ended",
        })
    }
}

impl FromStr for CallStatus {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p" | "pending" => Ok(Self::Pending),
            "s" | "started" => Ok(Self::Started),
            "e" | "ended" => Ok(Self::Ended),
            other => Err(DispatchError::ValidationError(format!(
                "Unknown call status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CallPriority {
    #[serde(rename = "A")]
    Resuscitation,
    #[serde(rename = "B")]
    Emergent,
    #[serde(rename = "C")]
    Urgent,
    #[serde(rename = "D")]
    LessUrgent,
    #[default]
    #[serde(rename = "E")]
    NotUrgent,
    #[serde(rename = "O")]
    Omega,
}

impl fmt::Display for CallPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resuscitation => "Resuscitation",
            Self::Emergent => "Emergent",
            Self::Urgent => "Urgent",
            Self::LessUrgent => "Less urgent",
            Self::NotUrgent => "Not urgent",
            Self::Omega => "Omega",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub id: u32,
    pub status: CallStatus,
    pub details: String,
    pub priority: CallPriority,
    pub created_at: DateTime<Utc>,
    pub pending_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub comment: String,
    pub updated_by: String,
    pub updated_on: DateTime<Utc>,
}

impl Call {
    /// Window in which the call's ambulances were working it, if it has started.
    pub fn active_range(&self) -> Option<TimeRange> {
        self.started_at.map(|started_at| TimeRange {
            since: Some(started_at),
            until: self.ended_at,
        })
    }
}

/// A call with everything it owns. This is the unit of persistence: storing a
/// record writes the call, its ambulance-calls, their waypoints and its
/// patients in one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    #[serde(flatten)]
    pub call: Call,
    #[serde(default)]
    pub ambulancecall_set: Vec<AmbulanceCallRecord>,
    #[serde(default)]
    pub patient_set: Vec<Patient>,
}

impl CallRecord {
    pub fn id(&self) -> u32 {
        self.call.id
    }

    pub fn status(&self) -> CallStatus {
        self.call.status
    }

    pub fn involves(&self, ambulance_id: u32) -> bool {
        self.ambulancecall_set
            .iter()
            .any(|ac| ac.ambulance_id() == ambulance_id)
    }

    pub fn ambulance_call(&self, ambulance_id: u32) -> Result<&AmbulanceCallRecord> {
        self.ambulancecall_set
            .iter()
            .find(|ac| ac.ambulance_id() == ambulance_id)
            .ok_or_else(|| self.missing_ambulance(ambulance_id))
    }

    pub fn ambulance_call_mut(&mut self, ambulance_id: u32) -> Result<&mut AmbulanceCallRecord> {
        let call_id = self.id();
        self.ambulancecall_set
            .iter_mut()
            .find(|ac| ac.ambulance_id() == ambulance_id)
            .ok_or_else(|| {
                DispatchError::not_found("ambulance call", format!("{}/{}", call_id, ambulance_id))
            })
    }

    fn missing_ambulance(&self, ambulance_id: u32) -> DispatchError {
        DispatchError::not_found("ambulance call", format!("{}/{}", self.id(), ambulance_id))
    }

    /// Adds an ambulance to the call. Each ambulance is assigned at most once.
    pub fn add_ambulance_call(&mut self, ambulance_call: AmbulanceCallRecord) -> Result<()> {
        self.ensure_open()?;
        if self.involves(ambulance_call.ambulance_id()) {
            return Err(DispatchError::IntegrityError(format!(
                "Ambulance {} is already assigned to call {}",
                ambulance_call.ambulance_id(),
                self.id()
            )));
        }
        self.ambulancecall_set.push(ambulance_call);
        Ok(())
    }

    /// Moves the call to `to`, stamping the matching timestamp.
    ///
    /// Starting requires at least one assigned ambulance. Ending completes every
    /// ambulance-call that is still open.
    pub fn transition(&mut self, to: CallStatus, now: DateTime<Utc>) -> Result<()> {
        let from = self.call.status;
        if from == to {
            return Ok(());
        }
        if !from.can_transition_to(to) {
            return Err(DispatchError::InvalidTransition {
                entity: "call",
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        match to {
            CallStatus::Pending => {}
            CallStatus::Started => {
                if self.ambulancecall_set.is_empty() {
                    return Err(DispatchError::ValidationError(format!(
                        "Call {} cannot start without an ambulance",
                        self.id()
                    )));
                }
                self.call.started_at = Some(now);
            }
            CallStatus::Ended => {
                for ambulance_call in &mut self.ambulancecall_set {
                    if ambulance_call.status().is_open() {
                        ambulance_call.ambulance_call.status = AmbulanceCallStatus::Completed;
                    }
                }
                self.call.ended_at = Some(now);
            }
        }
        self.call.status = to;
        Ok(())
    }

    /// Fails once the call has ended; its assignments and routes are frozen.
    pub fn ensure_open(&self) -> Result<()> {
        if self.call.status == CallStatus::Ended {
            return Err(DispatchError::ValidationError(format!(
                "Call {} has ended",
                self.id()
            )));
        }
        Ok(())
    }

    pub fn touch(&mut self, operator: &str, now: DateTime<Utc>) {
        self.call.updated_by = operator.to_string();
        self.call.updated_on = now;
    }

    /// Checks the invariants of the whole aggregate.
    pub fn validate(&self) -> Result<()> {
        if self.call.status == CallStatus::Started && self.ambulancecall_set.is_empty() {
            return Err(DispatchError::ValidationError(format!(
                "Started call {} has no ambulance",
                self.id()
            )));
        }

        let mut seen = HashSet::new();
        for ambulance_call in &self.ambulancecall_set {
            if !seen.insert(ambulance_call.ambulance_id()) {
                return Err(DispatchError::IntegrityError(format!(
                    "Ambulance {} is assigned twice to call {}",
                    ambulance_call.ambulance_id(),
                    self.id()
                )));
            }
            if ambulance_call
                .waypoint_set
                .windows(2)
                .any(|pair| pair[0].order >= pair[1].order)
            {
                return Err(DispatchError::ValidationError(format!(
                    "Waypoints of ambulance call {} are not strictly ordered",
                    ambulance_call.id()
                )));
            }
        }
        Ok(())
    }
}

/// Selects calls for the call board.
#[derive(Debug, Clone, Default)]
pub struct CallFilter {
    /// Only calls with at least one of these ambulances assigned.
    pub ambulances: Option<Vec<u32>>,
    pub status: Option<CallStatus>,
}

impl CallFilter {
    pub fn matches(&self, record: &CallRecord) -> bool {
        let status_ok = self.status.is_none_or(|status| record.status() == status);
        let ambulance_ok = self
            .ambulances
            .as_ref()
            .is_none_or(|ids| ids.iter().any(|id| record.involves(*id)));
        status_ok && ambulance_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: CallStatus) -> CallRecord {
        let now = Utc::now();
        CallRecord {
            call: Call {
                id: 1,
                status,
                details: String::new(),
                priority: CallPriority::Emergent,
                created_at: now,
                pending_at: Some(now),
                started_at: None,
                ended_at: None,
                comment: String::new(),
                updated_by: "admin".to_string(),
                updated_on: now,
            },
            ambulancecall_set: Vec::new(),
            patient_set: Vec::new(),
        }
    }

    #[test]
    fn test_start_requires_ambulance() {
        let mut call = record(CallStatus::Pending);
        assert!(matches!(
            call.transition(CallStatus::Started, Utc::now()),
            Err(DispatchError::ValidationError(_))
        ));
        assert_eq!(call.status(), CallStatus::Pending);
        assert!(call.call.started_at.is_none());

        call.add_ambulance_call(AmbulanceCallRecord::new(1, 1, 5, Utc::now()))
            .unwrap();
        call.transition(CallStatus::Started, Utc::now()).unwrap();
        assert_eq!(call.status(), CallStatus::Started);
        assert!(call.call.started_at.is_some());
    }

    #[test]
    fn test_end_completes_open_ambulance_calls() {
        let mut call = record(CallStatus::Pending);
        call.add_ambulance_call(AmbulanceCallRecord::new(1, 1, 5, Utc::now()))
            .unwrap();
        let mut declined = AmbulanceCallRecord::new(2, 1, 6, Utc::now());
        declined.set_status(AmbulanceCallStatus::Declined).unwrap();
        call.add_ambulance_call(declined).unwrap();

        call.transition(CallStatus::Started, Utc::now()).unwrap();
        call.transition(CallStatus::Ended, Utc::now()).unwrap();

        assert!(call.call.ended_at.is_some());
        assert_eq!(
            call.ambulance_call(5).unwrap().status(),
            AmbulanceCallStatus::Completed
        );
        assert_eq!(
            call.ambulance_call(6).unwrap().status(),
            AmbulanceCallStatus::Declined
        );
    }

    #[test]
    fn test_ended_is_terminal() {
        let mut call = record(CallStatus::Pending);
        call.transition(CallStatus::Ended, Utc::now()).unwrap();
        assert!(matches!(
            call.transition(CallStatus::Pending, Utc::now()),
            Err(DispatchError::InvalidTransition { .. })
        ));
        assert!(matches!(
            call.add_ambulance_call(AmbulanceCallRecord::new(1, 1, 5, Utc::now())),
            Err(DispatchError::ValidationError(_))
        ));
        assert!(matches!(call.ensure_open(), Err(DispatchError::ValidationError(_))));
    }

    #[test]
    fn test_duplicate_ambulance_rejected() {
        let mut call = record(CallStatus::Pending);
        call.add_ambulance_call(AmbulanceCallRecord::new(1, 1, 5, Utc::now()))
            .unwrap();
        assert!(matches!(
            call.add_ambulance_call(AmbulanceCallRecord::new(2, 1, 5, Utc::now())),
            Err(DispatchError::IntegrityError(_))
        ));
    }

    #[test]
    fn test_active_range() {
        let mut call = record(CallStatus::Pending);
        assert!(call.call.active_range().is_none());

        call.add_ambulance_call(AmbulanceCallRecord::new(1, 1, 5, Utc::now()))
            .unwrap();
        call.transition(CallStatus::Started, Utc::now()).unwrap();
        let range = call.call.active_range().unwrap();
        assert_eq!(range.since, call.call.started_at);
        assert_eq!(range.until, None);

        call.transition(CallStatus::Ended, Utc::now()).unwrap();
        let range = call.call.active_range().unwrap();
        assert_eq!(range.since, call.call.started_at);
        assert_eq!(range.until, call.call.ended_at);
        assert!(range.until.is_some());
    }

    #[test]
    fn test_filter() {
        let mut call = record(CallStatus::Pending);
        call.add_ambulance_call(AmbulanceCallRecord::new(1, 1, 5, Utc::now()))
            .unwrap();

        assert!(CallFilter::default().matches(&call));
        assert!(
            CallFilter {
                ambulances: Some(vec![3, 5]),
                status: Some(CallStatus::Pending),
            }
            .matches(&call)
        );
        assert!(
            !CallFilter {
                ambulances: Some(vec![3]),
                status: None,
            }
            .matches(&call)
        );
        assert!(
            !CallFilter {
                ambulances: None,
                status: Some(CallStatus::Ended),
            }
            .matches(&call)
        );
    }

    #[test]
    fn test_call_wire_shape() {
        let call = record(CallStatus::Pending);
        let value = serde_json::to_value(&call).unwrap();
        assert_eq!(value["status"], "P");
        assert_eq!(value["priority"], "B");
        assert!(value["started_at"].is_null());
        assert!(value["ambulancecall_set"].as_array().unwrap().is_empty());
        assert!(value["patient_set"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("S".parse::<CallStatus>().unwrap(), CallStatus::Started);
        assert_eq!("ended".parse::<CallStatus>().unwrap(), CallStatus::Ended);
        assert!("x".parse::<CallStatus>().is_err());
    }
}
