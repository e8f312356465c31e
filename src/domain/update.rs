use super::ambulance::AmbulanceStatus;
use super::location::GeoPoint;
use crate::error::{DispatchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of an ambulance's status/location log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbulanceUpdate {
    pub id: u32,
    pub ambulance_id: u32,
    pub ambulance_identifier: String,
    pub status: AmbulanceStatus,
    pub orientation: f64,
    pub location: Option<GeoPoint>,
    pub timestamp: DateTime<Utc>,
    pub comment: String,
    pub updated_by: String,
    pub updated_on: DateTime<Utc>,
}

/// Inclusive time window. An open end matches everything on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub const ALL: Self = Self {
        since: None,
        until: None,
    };

    pub fn new(since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Result<Self> {
        if let (Some(since), Some(until)) = (since, until)
            && since > until
        {
            return Err(DispatchError::ValidationError(format!(
                "Time range starts ({}) after it ends ({})",
                since, until
            )));
        }
        Ok(Self { since, until })
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.since.is_none_or(|since| timestamp >= since)
            && self.until.is_none_or(|until| timestamp <= until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_range_contains() {
        let t = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
        let range = TimeRange::new(Some(t(10)), Some(t(12))).unwrap();

        assert!(!range.contains(t(9)));
        assert!(range.contains(t(10)));
        assert!(range.contains(t(12)));
        assert!(!range.contains(t(13)));

        let open = TimeRange::new(Some(t(10)), None).unwrap();
        assert!(open.contains(t(23)));
        assert!(TimeRange::ALL.contains(t(0)));
    }

    #[test]
    fn test_time_range_rejects_inverted_bounds() {
        let t = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
        assert!(matches!(
            TimeRange::new(Some(t(12)), Some(t(10))),
            Err(DispatchError::ValidationError(_))
        ));
    }
}
