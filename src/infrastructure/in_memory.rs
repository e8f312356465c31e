use crate::domain::ambulance::Ambulance;
use crate::domain::call::CallRecord;
use crate::domain::location::Location;
use crate::domain::ports::{
    AmbulanceStore, CallStore, Entity, IdSequence, LocationStore, Stores, UpdateStore,
};
use crate::domain::update::{AmbulanceUpdate, TimeRange};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A thread-safe in-memory store for ambulances.
///
/// Uses `Arc<RwLock<BTreeMap<u32, Ambulance>>>` so listings come back ordered by id.
#[derive(Default, Clone)]
pub struct InMemoryAmbulanceStore {
    ambulances: Arc<RwLock<BTreeMap<u32, Ambulance>>>,
}

impl InMemoryAmbulanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AmbulanceStore for InMemoryAmbulanceStore {
    async fn store(&self, ambulance: Ambulance) -> Result<()> {
        let mut ambulances = self.ambulances.write().await;
        ambulances.insert(ambulance.id, ambulance);
        Ok(())
    }

    async fn get(&self, ambulance_id: u32) -> Result<Option<Ambulance>> {
        let ambulances = self.ambulances.read().await;
        Ok(ambulances.get(&ambulance_id).cloned())
    }

    async fn get_by_identifier(&self, identifier: &str) -> Result<Option<Ambulance>> {
        let ambulances = self.ambulances.read().await;
        Ok(ambulances
            .values()
            .find(|a| a.identifier == identifier)
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Ambulance>> {
        let ambulances = self.ambulances.read().await;
        Ok(ambulances.values().cloned().collect())
    }
}

/// In-memory update log, one time-ordered vector per ambulance.
#[derive(Default, Clone)]
pub struct InMemoryUpdateStore {
    updates: Arc<RwLock<HashMap<u32, Vec<AmbulanceUpdate>>>>,
}

impl InMemoryUpdateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UpdateStore for InMemoryUpdateStore {
    async fn append(&self, update: AmbulanceUpdate) -> Result<()> {
        let mut updates = self.updates.write().await;
        let log = updates.entry(update.ambulance_id).or_default();
        // Updates may arrive out of timestamp order when replayed from a file.
        let index = log.partition_point(|u| (u.timestamp, u.id) <= (update.timestamp, update.id));
        log.insert(index, update);
        Ok(())
    }

    async fn history(&self, ambulance_id: u32, range: TimeRange) -> Result<Vec<AmbulanceUpdate>> {
        let updates = self.updates.read().await;
        Ok(updates
            .get(&ambulance_id)
            .map(|log| {
                log.iter()
                    .filter(|u| range.contains(u.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryLocationStore {
    locations: Arc<RwLock<BTreeMap<u32, Location>>>,
}

impl InMemoryLocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocationStore for InMemoryLocationStore {
    async fn store(&self, location: Location) -> Result<()> {
        let mut locations = self.locations.write().await;
        locations.insert(location.id, location);
        Ok(())
    }

    async fn get(&self, location_id: u32) -> Result<Option<Location>> {
        let locations = self.locations.read().await;
        Ok(locations.get(&location_id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Location>> {
        let locations = self.locations.read().await;
        Ok(locations.values().cloned().collect())
    }
}

/// In-memory call aggregates. Replacing a map entry under the write lock makes
/// each `store` atomic.
#[derive(Default, Clone)]
pub struct InMemoryCallStore {
    calls: Arc<RwLock<BTreeMap<u32, CallRecord>>>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallStore for InMemoryCallStore {
    async fn store(&self, record: CallRecord) -> Result<()> {
        let mut calls = self.calls.write().await;
        calls.insert(record.id(), record);
        Ok(())
    }

    async fn get(&self, call_id: u32) -> Result<Option<CallRecord>> {
        let calls = self.calls.read().await;
        Ok(calls.get(&call_id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<CallRecord>> {
        let calls = self.calls.read().await;
        Ok(calls.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemorySequence {
    counters: Arc<Mutex<HashMap<Entity, u32>>>,
}

impl InMemorySequence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdSequence for InMemorySequence {
    async fn next_id(&self, entity: Entity) -> Result<u32> {
        let mut counters = self.counters.lock().await;
        let counter = counters.entry(entity).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}

/// A fresh, empty set of in-memory stores.
pub fn in_memory_stores() -> Stores {
    Stores {
        ambulances: Box::new(InMemoryAmbulanceStore::new()),
        updates: Box::new(InMemoryUpdateStore::new()),
        locations: Box::new(InMemoryLocationStore::new()),
        calls: Box::new(InMemoryCallStore::new()),
        sequence: Box::new(InMemorySequence::new()),
    }
}
