use crate::domain::ambulance::AmbulanceStatus;
use crate::domain::update::AmbulanceUpdate;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct UpdateLine<'a> {
    id: u32,
    ambulance: &'a str,
    status: AmbulanceStatus,
    latitude: Option<f64>,
    longitude: Option<f64>,
    orientation: f64,
    timestamp: DateTime<Utc>,
    comment: &'a str,
    updated_by: &'a str,
}

/// Writes an ambulance history as CSV.
pub struct UpdateWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> UpdateWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_updates(&mut self, updates: &[AmbulanceUpdate]) -> Result<()> {
        if updates.is_empty() {
            self.writer.write_record([
                "id",
                "ambulance",
                "status",
                "latitude",
                "longitude",
                "orientation",
                "timestamp",
                "comment",
                "updated_by",
            ])?;
        }
        for update in updates {
            self.writer.serialize(UpdateLine {
                id: update.id,
                ambulance: &update.ambulance_identifier,
                status: update.status,
                latitude: update.location.map(|p| p.latitude),
                longitude: update.location.map(|p| p.longitude),
                orientation: update.orientation,
                timestamp: update.timestamp,
                comment: &update.comment,
                updated_by: &update.updated_by,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
