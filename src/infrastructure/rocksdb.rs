use crate::domain::ambulance::Ambulance;
use crate::domain::call::CallRecord;
use crate::domain::location::Location;
use crate::domain::ports::{
    AmbulanceStore, CallStore, Entity, IdSequence, LocationStore, Stores, UpdateStore,
};
use crate::domain::update::{AmbulanceUpdate, TimeRange};
use crate::error::{DispatchError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for ambulance states.
pub const CF_AMBULANCES: &str = "ambulances";
/// Column Family for the ambulance update log.
pub const CF_UPDATES: &str = "ambulance_updates";
/// Column Family for registered locations.
pub const CF_LOCATIONS: &str = "locations";
/// Column Family for call aggregates.
pub const CF_CALLS: &str = "calls";
/// Column Family for id counters.
pub const CF_SEQUENCES: &str = "sequences";

const COLUMN_FAMILIES: [&str; 5] = [
    CF_AMBULANCES,
    CF_UPDATES,
    CF_LOCATIONS,
    CF_CALLS,
    CF_SEQUENCES,
];

/// A persistent store implementation using RocksDB.
///
/// Every entity kind lives in its own Column Family and is encoded as JSON.
/// Call aggregates are written as a single value, which makes storing a call
/// together with its ambulance-calls, waypoints and patients atomic.
///
/// Update log keys are `ambulance id | seconds | nanoseconds | update id`,
/// big-endian with the sign bit of the seconds flipped, so a forward scan from
/// `ambulance id | since` yields one ambulance's history ordered by timestamp
/// then id.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    sequence_lock: Arc<Mutex<()>>,
}

fn update_key_prefix(ambulance_id: u32, timestamp: Option<DateTime<Utc>>) -> Vec<u8> {
    let mut key = ambulance_id.to_be_bytes().to_vec();
    if let Some(timestamp) = timestamp {
        let seconds = (timestamp.timestamp() as u64) ^ (1 << 63);
        key.extend_from_slice(&seconds.to_be_bytes());
        key.extend_from_slice(&timestamp.timestamp_subsec_nanos().to_be_bytes());
    }
    key
}

fn update_key(update: &AmbulanceUpdate) -> Vec<u8> {
    let mut key = update_key_prefix(update.ambulance_id, Some(update.timestamp));
    key.extend_from_slice(&update.id.to_be_bytes());
    key
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column family.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            sequence_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn into_stores(self) -> Stores {
        Stores::shared(self)
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            DispatchError::InternalError(Box::new(std::io::Error::other(format!(
                "{} column family not found",
                name
            ))))
        })
    }

    fn put_json<T: Serialize>(&self, cf: &'static str, key: &[u8], value: &T) -> Result<()> {
        let handle = self.cf(cf)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(handle, key, bytes)?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &'static str, key: &[u8]) -> Result<Option<T>> {
        let handle = self.cf(cf)?;
        match self.db.get_pinned_cf(handle, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_json<T: DeserializeOwned>(&self, cf: &'static str) -> Result<Vec<T>> {
        let handle = self.cf(cf)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(handle, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }
}

#[async_trait]
impl AmbulanceStore for RocksDBStore {
    async fn store(&self, ambulance: Ambulance) -> Result<()> {
        self.put_json(CF_AMBULANCES, &ambulance.id.to_be_bytes(), &ambulance)
    }

    async fn get(&self, ambulance_id: u32) -> Result<Option<Ambulance>> {
        self.get_json(CF_AMBULANCES, &ambulance_id.to_be_bytes())
    }

    async fn get_by_identifier(&self, identifier: &str) -> Result<Option<Ambulance>> {
        let ambulances: Vec<Ambulance> = self.scan_json(CF_AMBULANCES)?;
        Ok(ambulances.into_iter().find(|a| a.identifier == identifier))
    }

    async fn get_all(&self) -> Result<Vec<Ambulance>> {
        self.scan_json(CF_AMBULANCES)
    }
}

#[async_trait]
impl UpdateStore for RocksDBStore {
    async fn append(&self, update: AmbulanceUpdate) -> Result<()> {
        self.put_json(CF_UPDATES, &update_key(&update), &update)
    }

    async fn history(&self, ambulance_id: u32, range: TimeRange) -> Result<Vec<AmbulanceUpdate>> {
        let handle = self.cf(CF_UPDATES)?;
        let prefix = update_key_prefix(ambulance_id, None);
        let start = update_key_prefix(ambulance_id, range.since);

        let mut updates = Vec::new();
        let iter = self
            .db
            .iterator_cf(handle, IteratorMode::From(&start, Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let update: AmbulanceUpdate = serde_json::from_slice(&value)?;
            if range.until.is_some_and(|until| update.timestamp > until) {
                break;
            }
            updates.push(update);
        }
        Ok(updates)
    }
}

#[async_trait]
impl LocationStore for RocksDBStore {
    async fn store(&self, location: Location) -> Result<()> {
        self.put_json(CF_LOCATIONS, &location.id.to_be_bytes(), &location)
    }

    async fn get(&self, location_id: u32) -> Result<Option<Location>> {
        self.get_json(CF_LOCATIONS, &location_id.to_be_bytes())
    }

    async fn get_all(&self) -> Result<Vec<Location>> {
        self.scan_json(CF_LOCATIONS)
    }
}

#[async_trait]
impl CallStore for RocksDBStore {
    async fn store(&self, record: CallRecord) -> Result<()> {
        self.put_json(CF_CALLS, &record.id().to_be_bytes(), &record)
    }

    async fn get(&self, call_id: u32) -> Result<Option<CallRecord>> {
        self.get_json(CF_CALLS, &call_id.to_be_bytes())
    }

    async fn get_all(&self) -> Result<Vec<CallRecord>> {
        self.scan_json(CF_CALLS)
    }
}

#[async_trait]
impl IdSequence for RocksDBStore {
    async fn next_id(&self, entity: Entity) -> Result<u32> {
        let _guard = self.sequence_lock.lock().await;
        let current: u32 = self.get_json(CF_SEQUENCES, entity.key().as_bytes())?.unwrap_or(0);
        let next = current + 1;
        self.put_json(CF_SEQUENCES, entity.key().as_bytes(), &next)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ambulance::{AmbulanceCapability, AmbulanceStatus};
    use crate::domain::payload::AmbulanceForm;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn ambulance(id: u32) -> Ambulance {
        let form = AmbulanceForm {
            identifier: format!("BUS-{}", id),
            capability: AmbulanceCapability::Basic,
            status: AmbulanceStatus::Available,
            comment: None,
            orientation: None,
            latitude: Some(32.5),
            longitude: Some(-117.0),
        };
        Ambulance::new(id, form, "admin", Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        for name in COLUMN_FAMILIES {
            assert!(store.db.cf_handle(name).is_some());
        }
    }

    #[tokio::test]
    async fn test_rocksdb_ambulance_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let bus = ambulance(1);
        AmbulanceStore::store(&store, bus.clone()).await.unwrap();

        let retrieved = AmbulanceStore::get(&store, 1).await.unwrap().unwrap();
        assert_eq!(retrieved, bus);
        let by_identifier = store.get_by_identifier("BUS-1").await.unwrap().unwrap();
        assert_eq!(by_identifier, bus);
        assert_eq!(AmbulanceStore::get_all(&store).await.unwrap().len(), 1);
        assert!(AmbulanceStore::get(&store, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_history_range_scan() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let t = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();

        let bus_1 = ambulance(1);
        let bus_2 = ambulance(2);
        store.append(bus_1.snapshot(1, t(12))).await.unwrap();
        store.append(bus_1.snapshot(2, t(10))).await.unwrap();
        store.append(bus_2.snapshot(3, t(11))).await.unwrap();
        store.append(bus_1.snapshot(4, t(11))).await.unwrap();

        let ids = |updates: Vec<AmbulanceUpdate>| updates.iter().map(|u| u.id).collect::<Vec<_>>();

        assert_eq!(ids(store.history(1, TimeRange::ALL).await.unwrap()), vec![2, 4, 1]);
        let window = TimeRange::new(Some(t(11)), Some(t(11))).unwrap();
        assert_eq!(ids(store.history(1, window).await.unwrap()), vec![4]);
        assert_eq!(ids(store.history(2, TimeRange::ALL).await.unwrap()), vec![3]);
    }

    #[tokio::test]
    async fn test_rocksdb_timestamps_before_epoch_sort_first() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let bus = ambulance(1);

        store
            .append(bus.snapshot(1, Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap()))
            .await
            .unwrap();
        store
            .append(bus.snapshot(2, Utc.with_ymd_and_hms(1969, 12, 31, 0, 0, 0).unwrap()))
            .await
            .unwrap();

        let history = store.history(1, TimeRange::ALL).await.unwrap();
        assert_eq!(history.iter().map(|u| u.id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_rocksdb_history_orders_within_a_microsecond() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let at = |nanos| base + chrono::Duration::nanoseconds(nanos);

        let bus = ambulance(1);
        store.append(bus.snapshot(1, at(900))).await.unwrap();
        store.append(bus.snapshot(2, at(100))).await.unwrap();

        let ids = |updates: Vec<AmbulanceUpdate>| updates.iter().map(|u| u.id).collect::<Vec<_>>();
        assert_eq!(ids(store.history(1, TimeRange::ALL).await.unwrap()), vec![2, 1]);

        let early = TimeRange::new(None, Some(at(500))).unwrap();
        assert_eq!(ids(store.history(1, early).await.unwrap()), vec![2]);
        let late = TimeRange::new(Some(at(500)), None).unwrap();
        assert_eq!(ids(store.history(1, late).await.unwrap()), vec![1]);
    }

    #[tokio::test]
    async fn test_rocksdb_sequence_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            assert_eq!(store.next_id(Entity::Call).await.unwrap(), 1);
            assert_eq!(store.next_id(Entity::Call).await.unwrap(), 2);
        }
        let store = RocksDBStore::open(dir.path()).unwrap();
        assert_eq!(store.next_id(Entity::Call).await.unwrap(), 3);
        assert_eq!(store.next_id(Entity::Waypoint).await.unwrap(), 1);
    }
}
