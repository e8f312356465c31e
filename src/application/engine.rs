use crate::domain::ambulance::Ambulance;
use crate::domain::ambulance_call::{AmbulanceCallRecord, AmbulanceCallStatus, Waypoint};
use crate::domain::call::{Call, CallFilter, CallRecord, CallStatus};
use crate::domain::location::{Location, LocationType};
use crate::domain::patient::Patient;
use crate::domain::payload::{
    AmbulanceCallPayload, AmbulanceChange, AmbulanceForm, CallPatch, CallPayload, LocationPayload,
    PatientPayload, WaypointPayload,
};
use crate::domain::ports::{Entity, Stores};
use crate::domain::update::{AmbulanceUpdate, TimeRange};
use crate::error::{DispatchError, Result};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// The entry point of the dispatch back-end.
///
/// `DispatchEngine` owns the storage backends and runs every write as a
/// read-validate-store cycle behind a single async mutex, so two writers never
/// interleave. Reads go straight to the stores.
pub struct DispatchEngine {
    stores: Stores,
    writer: Mutex<()>,
}

impl DispatchEngine {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            writer: Mutex::new(()),
        }
    }

    async fn next_id(&self, entity: Entity) -> Result<u32> {
        self.stores.sequence.next_id(entity).await
    }

    // Ambulances

    /// Registers an ambulance and writes the first entry of its history.
    pub async fn register_ambulance(&self, form: AmbulanceForm, operator: &str) -> Result<Ambulance> {
        let _guard = self.writer.lock().await;

        let identifier = form.identifier.trim();
        if self
            .stores
            .ambulances
            .get_by_identifier(identifier)
            .await?
            .is_some()
        {
            return Err(DispatchError::IntegrityError(format!(
                "Ambulance '{}' already exists",
                identifier
            )));
        }

        let now = Utc::now();
        let id = self.next_id(Entity::Ambulance).await?;
        let ambulance = Ambulance::new(id, form, operator, now)?;
        let update_id = self.next_id(Entity::AmbulanceUpdate).await?;

        // History entry first, then the state it describes.
        self.stores
            .updates
            .append(ambulance.snapshot(update_id, now))
            .await?;
        self.stores.ambulances.store(ambulance.clone()).await?;

        info!(ambulance = id, identifier = %ambulance.identifier, "ambulance registered");
        Ok(ambulance)
    }

    /// Applies a change to an ambulance and appends it to the history log.
    pub async fn update_ambulance(
        &self,
        ambulance_id: u32,
        change: AmbulanceChange,
        operator: &str,
    ) -> Result<AmbulanceUpdate> {
        let _guard = self.writer.lock().await;

        let mut ambulance = self.ambulance(ambulance_id).await?;
        let update_id = self.next_id(Entity::AmbulanceUpdate).await?;
        let update = ambulance.apply(update_id, change, operator, Utc::now())?;

        self.stores.updates.append(update.clone()).await?;
        self.stores.ambulances.store(ambulance).await?;

        debug!(ambulance = ambulance_id, status = %update.status, "ambulance updated");
        Ok(update)
    }

    pub async fn update_ambulance_by_identifier(
        &self,
        identifier: &str,
        change: AmbulanceChange,
        operator: &str,
    ) -> Result<AmbulanceUpdate> {
        let ambulance = self.ambulance_by_identifier(identifier).await?;
        self.update_ambulance(ambulance.id, change, operator).await
    }

    pub async fn ambulance(&self, ambulance_id: u32) -> Result<Ambulance> {
        self.stores
            .ambulances
            .get(ambulance_id)
            .await?
            .ok_or_else(|| DispatchError::not_found("ambulance", ambulance_id))
    }

    pub async fn ambulance_by_identifier(&self, identifier: &str) -> Result<Ambulance> {
        self.stores
            .ambulances
            .get_by_identifier(identifier.trim())
            .await?
            .ok_or_else(|| DispatchError::not_found("ambulance", identifier))
    }

    pub async fn ambulances(&self) -> Result<Vec<Ambulance>> {
        self.stores.ambulances.get_all().await
    }

    pub async fn ambulance_history(
        &self,
        ambulance_id: u32,
        range: TimeRange,
    ) -> Result<Vec<AmbulanceUpdate>> {
        self.ambulance(ambulance_id).await?;
        self.stores.updates.history(ambulance_id, range).await
    }

    /// History of an ambulance while it was working a call.
    ///
    /// Empty until the call starts; afterwards bounded by the call's start and,
    /// once it has ended, its end.
    pub async fn ambulance_updates_for_call(
        &self,
        ambulance_id: u32,
        call_id: u32,
    ) -> Result<Vec<AmbulanceUpdate>> {
        let record = self.call(call_id).await?;
        if !record.involves(ambulance_id) {
            return Err(DispatchError::ValidationError(format!(
                "Ambulance {} is not assigned to call {}",
                ambulance_id, call_id
            )));
        }
        match record.call.active_range() {
            Some(range) => self.ambulance_history(ambulance_id, range).await,
            None => Ok(Vec::new()),
        }
    }

    // Locations

    pub async fn register_location(
        &self,
        payload: LocationPayload,
        operator: &str,
    ) -> Result<Location> {
        let _guard = self.writer.lock().await;

        payload.validate()?;
        let id = self.next_id(Entity::Location).await?;
        let location = payload.into_location(id, operator, Utc::now());
        self.stores.locations.store(location.clone()).await?;

        info!(location = id, kind = %location.r#type, "location registered");
        Ok(location)
    }

    pub async fn location(&self, location_id: u32) -> Result<Location> {
        self.stores
            .locations
            .get(location_id)
            .await?
            .ok_or_else(|| DispatchError::not_found("location", location_id))
    }

    pub async fn locations(&self, kind: Option<LocationType>) -> Result<Vec<Location>> {
        let locations = self.stores.locations.get_all().await?;
        Ok(locations
            .into_iter()
            .filter(|l| kind.is_none_or(|kind| l.r#type == kind))
            .collect())
    }

    // Calls

    /// Creates a call with its ambulance-calls, waypoints and patients.
    ///
    /// Either the whole call is stored or nothing is: every check runs before
    /// the single write of the aggregate.
    pub async fn create_call(&self, payload: CallPayload, operator: &str) -> Result<CallRecord> {
        let _guard = self.writer.lock().await;

        payload.validate()?;
        for ambulance_call in &payload.ambulancecall_set {
            self.check_ambulance_call(ambulance_call).await?;
        }

        let now = Utc::now();
        let call_id = self.next_id(Entity::Call).await?;
        let mut record = CallRecord {
            call: Call {
                id: call_id,
                status: payload.status,
                details: payload.details,
                priority: payload.priority,
                created_at: now,
                pending_at: Some(now),
                started_at: (payload.status == CallStatus::Started).then_some(now),
                ended_at: None,
                comment: payload.comment,
                updated_by: operator.to_string(),
                updated_on: now,
            },
            ambulancecall_set: Vec::new(),
            patient_set: Vec::new(),
        };

        for ambulance_call in payload.ambulancecall_set {
            let ambulance_call = self
                .build_ambulance_call(call_id, ambulance_call, operator, now)
                .await?;
            record.add_ambulance_call(ambulance_call)?;
        }
        for patient in payload.patient_set {
            let id = self.next_id(Entity::Patient).await?;
            record.patient_set.push(Patient::new(id, call_id, patient));
        }

        record.validate()?;
        self.stores.calls.store(record.clone()).await?;

        info!(
            call = call_id,
            status = %record.status(),
            ambulances = record.ambulancecall_set.len(),
            patients = record.patient_set.len(),
            "call created"
        );
        Ok(record)
    }

    /// Partially updates a call, including its status.
    pub async fn update_call(
        &self,
        call_id: u32,
        patch: CallPatch,
        operator: &str,
    ) -> Result<CallRecord> {
        self.modify_call(call_id, operator, |record, now| {
            if let Some(status) = patch.status {
                record.transition(status, now)?;
            }
            if let Some(priority) = patch.priority {
                record.call.priority = priority;
            }
            if let Some(details) = patch.details {
                record.call.details = details;
            }
            if let Some(comment) = patch.comment {
                record.call.comment = comment;
            }
            Ok(())
        })
        .await
    }

    /// Assigns one more ambulance to a call.
    pub async fn add_ambulance_call(
        &self,
        call_id: u32,
        payload: AmbulanceCallPayload,
        operator: &str,
    ) -> Result<CallRecord> {
        let _guard = self.writer.lock().await;

        let mut record = self.call(call_id).await?;
        payload.validate()?;
        self.check_ambulance_call(&payload).await?;
        if record.involves(payload.ambulance_id) {
            return Err(DispatchError::IntegrityError(format!(
                "Ambulance {} is already assigned to call {}",
                payload.ambulance_id, call_id
            )));
        }

        let now = Utc::now();
        let ambulance_call = self
            .build_ambulance_call(call_id, payload, operator, now)
            .await?;
        record.add_ambulance_call(ambulance_call)?;
        record.touch(operator, now);
        record.validate()?;
        self.stores.calls.store(record.clone()).await?;

        info!(call = call_id, "ambulance assigned");
        Ok(record)
    }

    pub async fn set_ambulance_call_status(
        &self,
        call_id: u32,
        ambulance_id: u32,
        status: AmbulanceCallStatus,
        operator: &str,
    ) -> Result<CallRecord> {
        self.modify_call(call_id, operator, |record, _now| {
            record.ensure_open()?;
            record.ambulance_call_mut(ambulance_id)?.set_status(status)
        })
        .await
    }

    /// Adds a stop to the route of one of the call's ambulances.
    pub async fn add_waypoint(
        &self,
        call_id: u32,
        ambulance_id: u32,
        payload: WaypointPayload,
        operator: &str,
    ) -> Result<CallRecord> {
        let _guard = self.writer.lock().await;

        let mut record = self.call(call_id).await?;
        record.ensure_open()?;
        payload.validate()?;
        record.ambulance_call(ambulance_id)?;
        if let Some(location_id) = payload.location_id {
            self.location(location_id).await?;
        }

        let now = Utc::now();
        let ambulance_call = record.ambulance_call(ambulance_id)?.id();
        let waypoint = self
            .build_waypoint(ambulance_call, payload, operator, now)
            .await?;
        record
            .ambulance_call_mut(ambulance_id)?
            .insert_waypoint(waypoint)?;
        record.touch(operator, now);
        self.stores.calls.store(record.clone()).await?;

        Ok(record)
    }

    pub async fn visit_waypoint(
        &self,
        call_id: u32,
        ambulance_id: u32,
        waypoint_id: u32,
        operator: &str,
    ) -> Result<CallRecord> {
        self.modify_call(call_id, operator, |record, _now| {
            record.ensure_open()?;
            record
                .ambulance_call_mut(ambulance_id)?
                .visit_waypoint(waypoint_id)?;
            Ok(())
        })
        .await
    }

    /// Next unvisited stop of an ambulance on a call, if any.
    pub async fn next_waypoint(&self, call_id: u32, ambulance_id: u32) -> Result<Option<Waypoint>> {
        let record = self.call(call_id).await?;
        Ok(record.ambulance_call(ambulance_id)?.next_waypoint().cloned())
    }

    pub async fn add_patient(
        &self,
        call_id: u32,
        payload: PatientPayload,
        operator: &str,
    ) -> Result<CallRecord> {
        let _guard = self.writer.lock().await;

        let mut record = self.call(call_id).await?;
        let id = self.next_id(Entity::Patient).await?;
        record.patient_set.push(Patient::new(id, call_id, payload));
        record.touch(operator, Utc::now());
        self.stores.calls.store(record.clone()).await?;

        Ok(record)
    }

    pub async fn call(&self, call_id: u32) -> Result<CallRecord> {
        self.stores
            .calls
            .get(call_id)
            .await?
            .ok_or_else(|| DispatchError::not_found("call", call_id))
    }

    /// Calls matching `filter`, ordered by id.
    pub async fn calls(&self, filter: &CallFilter) -> Result<Vec<CallRecord>> {
        let mut calls: Vec<CallRecord> = self
            .stores
            .calls
            .get_all()
            .await?
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect();
        calls.sort_by_key(|record| record.id());
        Ok(calls)
    }

    /// Loads a call, lets `change` edit it, and stores it back. Nothing is
    /// written when `change` fails.
    async fn modify_call<F>(&self, call_id: u32, operator: &str, change: F) -> Result<CallRecord>
    where
        F: FnOnce(&mut CallRecord, DateTime<Utc>) -> Result<()>,
    {
        let _guard = self.writer.lock().await;

        let mut record = self.call(call_id).await?;
        let now = Utc::now();
        change(&mut record, now)?;
        record.touch(operator, now);
        record.validate()?;
        self.stores.calls.store(record.clone()).await?;

        debug!(call = call_id, status = %record.status(), "call modified");
        Ok(record)
    }

    /// Checks the stored data an ambulance-call payload refers to.
    async fn check_ambulance_call(&self, payload: &AmbulanceCallPayload) -> Result<()> {
        self.ambulance(payload.ambulance_id).await?;
        for waypoint in &payload.waypoint_set {
            if let Some(location_id) = waypoint.location_id {
                self.location(location_id).await?;
            }
        }
        Ok(())
    }

    async fn build_ambulance_call(
        &self,
        call_id: u32,
        payload: AmbulanceCallPayload,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<AmbulanceCallRecord> {
        let id = self.next_id(Entity::AmbulanceCall).await?;
        let mut record = AmbulanceCallRecord::new(id, call_id, payload.ambulance_id, now);
        for waypoint in payload.waypoint_set {
            let waypoint = self.build_waypoint(id, waypoint, operator, now).await?;
            record.insert_waypoint(waypoint)?;
        }
        Ok(record)
    }

    async fn build_waypoint(
        &self,
        ambulance_call_id: u32,
        payload: WaypointPayload,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<Waypoint> {
        let location = match (payload.location, payload.location_id) {
            (Some(location), _) => {
                let id = self.next_id(Entity::Location).await?;
                location.into_location(id, operator, now)
            }
            (None, Some(location_id)) => self.location(location_id).await?,
            (None, None) => {
                return Err(DispatchError::ValidationError(format!(
                    "Waypoint {} has no location",
                    payload.order
                )));
            }
        };
        Ok(Waypoint {
            id: self.next_id(Entity::Waypoint).await?,
            ambulance_call_id,
            order: payload.order,
            visited: payload.visited,
            location,
        })
    }
}
