use crate::domain::call::{CallPriority, CallRecord, CallStatus};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// One line of the call board.
#[derive(Debug, Serialize)]
struct CallSummary<'a> {
    id: u32,
    status: CallStatus,
    priority: CallPriority,
    /// Assigned ambulance ids, `;`-separated.
    ambulances: String,
    patients: usize,
    waypoints: usize,
    pending_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    details: &'a str,
}

impl<'a> From<&'a CallRecord> for CallSummary<'a> {
    fn from(record: &'a CallRecord) -> Self {
        Self {
            id: record.call.id,
            status: record.call.status,
            priority: record.call.priority,
            ambulances: record
                .ambulancecall_set
                .iter()
                .map(|ac| ac.ambulance_id().to_string())
                .collect::<Vec<_>>()
                .join(";"),
            patients: record.patient_set.len(),
            waypoints: record
                .ambulancecall_set
                .iter()
                .map(|ac| ac.waypoint_set.len())
                .sum(),
            pending_at: record.call.pending_at,
            started_at: record.call.started_at,
            ended_at: record.call.ended_at,
            details: &record.call.details,
        }
    }
}

/// Writes the call board as CSV.
pub struct CallWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CallWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_calls(&mut self, calls: &[CallRecord]) -> Result<()> {
        if calls.is_empty() {
            self.writer.write_record([
                "id",
                "status",
                "priority",
                "ambulances",
                "patients",
                "waypoints",
                "pending_at",
                "started_at",
                "ended_at",
                "details",
            ])?;
        }
        for record in calls {
            self.writer.serialize(CallSummary::from(record))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
