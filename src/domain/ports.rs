use super::ambulance::Ambulance;
use super::call::CallRecord;
use super::location::Location;
use super::update::{AmbulanceUpdate, TimeRange};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait AmbulanceStore: Send + Sync {
    async fn store(&self, ambulance: Ambulance) -> Result<()>;
    async fn get(&self, ambulance_id: u32) -> Result<Option<Ambulance>>;
    async fn get_by_identifier(&self, identifier: &str) -> Result<Option<Ambulance>>;
    async fn get_all(&self) -> Result<Vec<Ambulance>>;
}

/// Append-only log of ambulance updates.
#[async_trait]
pub trait UpdateStore: Send + Sync {
    async fn append(&self, update: AmbulanceUpdate) -> Result<()>;
    /// Updates of one ambulance within `range`, ordered by timestamp then id.
    async fn history(&self, ambulance_id: u32, range: TimeRange) -> Result<Vec<AmbulanceUpdate>>;
}

#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn store(&self, location: Location) -> Result<()>;
    async fn get(&self, location_id: u32) -> Result<Option<Location>>;
    async fn get_all(&self) -> Result<Vec<Location>>;
}

/// Stores whole call aggregates. A single `store` must be atomic.
#[async_trait]
pub trait CallStore: Send + Sync {
    async fn store(&self, record: CallRecord) -> Result<()>;
    async fn get(&self, call_id: u32) -> Result<Option<CallRecord>>;
    async fn get_all(&self) -> Result<Vec<CallRecord>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Ambulance,
    AmbulanceUpdate,
    Location,
    Call,
    AmbulanceCall,
    Waypoint,
    Patient,
}

impl Entity {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Ambulance => "ambulance",
            Self::AmbulanceUpdate => "ambulance_update",
            Self::Location => "location",
            Self::Call => "call",
            Self::AmbulanceCall => "ambulance_call",
            Self::Waypoint => "waypoint",
            Self::Patient => "patient",
        }
    }
}

/// Hands out ids, per entity, starting at 1.
#[async_trait]
pub trait IdSequence: Send + Sync {
    async fn next_id(&self, entity: Entity) -> Result<u32>;
}

pub type AmbulanceStoreBox = Box<dyn AmbulanceStore>;
pub type UpdateStoreBox = Box<dyn UpdateStore>;
pub type LocationStoreBox = Box<dyn LocationStore>;
pub type CallStoreBox = Box<dyn CallStore>;
pub type IdSequenceBox = Box<dyn IdSequence>;

/// Every port the dispatch engine needs.
pub struct Stores {
    pub ambulances: AmbulanceStoreBox,
    pub updates: UpdateStoreBox,
    pub locations: LocationStoreBox,
    pub calls: CallStoreBox,
    pub sequence: IdSequenceBox,
}

impl Stores {
    /// Uses one backend for every port.
    pub fn shared<S>(store: S) -> Self
    where
        S: AmbulanceStore + UpdateStore + LocationStore + CallStore + IdSequence + Clone + 'static,
    {
        Self {
            ambulances: Box::new(store.clone()),
            updates: Box::new(store.clone()),
            locations: Box::new(store.clone()),
            calls: Box::new(store.clone()),
            sequence: Box::new(store),
        }
    }
}
