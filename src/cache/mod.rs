// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Time-limited caches of expensive upstream results: geocoded addresses
//! and downloaded road data.
//!
//! A [CacheManager] keeps two independent stores. Geocoded addresses are persisted
//! in full and reloaded on construction. For map data only the metadata (timestamps
//! and covered areas) is persisted, so map data never outlives the process.

mod clock;
mod config;
mod daemon;
mod persist;
mod store;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use daemon::CleanupDaemon;
pub use persist::{FileStorage, MemoryStorage, PersistError, SnapshotStorage};
pub use store::{CacheEntry, TtlStore};

use crate::bounds::round_to;
use crate::osm::Element;
use crate::{Bounds, Coord};

/// Name of the snapshot with geocoding entries.
pub const GEOCODING_SNAPSHOT: &str = "geocoding";

/// Name of the snapshot with map data metadata.
pub const MAP_DATA_SNAPSHOT: &str = "mapdata_meta";

/// Road data stored in the map data cache.
pub type MapData = Arc<Vec<Element>>;

/// Persisted part of a map data entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDataMeta {
    pub timestamp: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

/// Number of entries in each of the stores of a [CacheManager].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub geocoding: usize,
    pub map_data: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} geocoding entries, {} map data entries",
            self.geocoding, self.map_data
        )
    }
}

/// Returns the geocoding cache key of an address: lower-cased and trimmed.
pub fn geocoding_key(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Returns the map data cache key of an area, see [Bounds::key].
pub fn map_data_key(bounds: &Bounds, precision: u32) -> String {
    bounds.key(precision)
}

/// Returns the map data cache key of a trip between two positions.
pub fn route_key(start: Coord, end: Coord, precision: u32) -> String {
    format!(
        "route_{},{}_to_{},{}",
        round_to(start.lat, precision),
        round_to(start.lon, precision),
        round_to(end.lat, precision),
        round_to(end.lon, precision),
    )
}

/// Caches geocoded addresses and downloaded road data.
///
/// Every write persists snapshots to the [SnapshotStorage]. Failures to persist
/// are only logged, and the cache keeps working in memory.
///
/// All methods take `&self`, so that a manager can be shared with a [CleanupDaemon]
/// through an [Arc].
#[derive(Debug)]
pub struct CacheManager {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    storage: Box<dyn SnapshotStorage>,
    geocoding: Mutex<TtlStore<Coord>>,
    map_data: Mutex<TtlStore<MapData>>,
}

impl CacheManager {
    /// Creates a new manager using the system clock, reloading geocoding entries
    /// from the storage.
    pub fn new(config: CacheConfig, storage: Box<dyn SnapshotStorage>) -> Self {
        Self::with_clock(config, storage, Arc::new(SystemClock))
    }

    /// Creates a new manager persisting snapshots as files in a directory.
    pub fn open<P: AsRef<Path>>(dir: P, config: CacheConfig) -> Self {
        let storage = FileStorage::new(dir.as_ref(), config.storage_prefix.clone());
        Self::new(config, Box::new(storage))
    }

    /// Creates a new manager with a custom time source, reloading geocoding entries
    /// from the storage.
    pub fn with_clock(
        config: CacheConfig,
        storage: Box<dyn SnapshotStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let geocoding = TtlStore::new(config.geocoding_expiry(), config.max_geocoding_entries);
        let map_data = TtlStore::new(config.map_data_expiry(), config.max_map_data_entries);

        let manager = Self {
            config,
            clock,
            storage,
            geocoding: Mutex::new(geocoding),
            map_data: Mutex::new(map_data),
        };

        match manager.load_geocoding() {
            Ok(0) => {}
            Ok(loaded) => log::debug!("loaded {loaded} geocoding cache entries"),
            Err(e) => log::warn!("failed to load geocoding cache: {e}"),
        }

        // Entries may have expired while persisted
        let purged = manager.geocoding().purge_expired(manager.now());
        if purged > 0 {
            log::debug!("dropped {purged} expired geocoding cache entries");
            manager.save_snapshots();
        }

        manager
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn now(&self) -> u64 {
        self.clock.now_millis()
    }

    fn geocoding(&self) -> MutexGuard<'_, TtlStore<Coord>> {
        self.geocoding.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn map_data(&self) -> MutexGuard<'_, TtlStore<MapData>> {
        self.map_data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached position of an address, unless expired.
    pub fn get_geocode(&self, address: &str) -> Option<Coord> {
        let key = geocoding_key(address);
        let hit = self.geocoding().get(&key, self.now()).map(|e| e.data);
        match hit {
            Some(_) => log::debug!("geocoding cache hit for {key:?}"),
            None => log::debug!("geocoding cache miss for {key:?}"),
        }
        hit
    }

    pub fn set_geocode(&self, address: &str, coord: Coord) {
        let key = geocoding_key(address);
        let evicted = self
            .geocoding()
            .insert(key, CacheEntry::new(coord, self.now()));
        if !evicted.is_empty() {
            log::debug!("evicted {} geocoding cache entries", evicted.len());
        }
        self.save_snapshots();
    }

    /// Looks for cached map data covering the requested area.
    ///
    /// First, an entry whose (rounded) area contains the requested one is looked for;
    /// then, an entry whose area covers at least [CacheConfig::overlap_threshold] of the
    /// requested one. Entries are considered in key order, and the first match wins.
    /// Entries stored by route are not considered.
    pub fn get_map_data(&self, bounds: &Bounds) -> Option<MapData> {
        let store = self.map_data();
        let candidates: Vec<(Bounds, &MapData)> = store
            .iter_fresh(self.now())
            .filter_map(|(key, entry)| Some((Bounds::from_key(key)?, &entry.data)))
            .collect();

        if let Some((_, data)) = candidates.iter().find(|(b, _)| b.contains(bounds)) {
            log::info!("map data cache hit (containment)");
            return Some(Arc::clone(data));
        }

        let overlapping = candidates
            .iter()
            .find(|(b, _)| b.overlap_ratio(bounds) >= self.config.overlap_threshold);
        if let Some((_, data)) = overlapping {
            log::info!("map data cache hit (overlap)");
            return Some(Arc::clone(data));
        }

        log::debug!("map data cache miss for {}", bounds.key(self.config.key_precision));
        None
    }

    /// Returns map data stored for a trip between (approximately) the same positions.
    pub fn get_map_data_by_route(&self, start: Coord, end: Coord) -> Option<MapData> {
        let key = route_key(start, end, self.config.key_precision);
        let hit = self
            .map_data()
            .get(&key, self.now())
            .map(|e| Arc::clone(&e.data));
        if hit.is_some() {
            log::info!("map data cache hit (route {key})");
        }
        hit
    }

    /// Looks for map data for a trip: first by the route, then by the area.
    pub fn lookup_map_data(&self, start: Coord, end: Coord, bounds: &Bounds) -> Option<MapData> {
        self.get_map_data_by_route(start, end)
            .or_else(|| self.get_map_data(bounds))
    }

    /// Stores map data under the key of the area it covers.
    pub fn set_map_data(&self, bounds: &Bounds, data: MapData) {
        let key = map_data_key(bounds, self.config.key_precision);
        self.insert_map_data(key, *bounds, data);
    }

    /// Stores map data under the key of a trip between two positions.
    pub fn set_map_data_by_route(&self, start: Coord, end: Coord, bounds: &Bounds, data: MapData) {
        let key = route_key(start, end, self.config.key_precision);
        self.insert_map_data(key, *bounds, data);
    }

    fn insert_map_data(&self, key: String, bounds: Bounds, data: MapData) {
        log::debug!("caching {} map elements under {key}", data.len());
        let entry = CacheEntry::new(data, self.now()).with_bounds(bounds);
        let evicted = self.map_data().insert(key, entry);
        if !evicted.is_empty() {
            log::debug!("evicted map data cache entries: {evicted:?}");
        }
        self.save_snapshots();
    }

    /// Removes all expired entries and persists the remaining ones.
    /// Returns the number of removed entries.
    pub fn cleanup(&self) -> usize {
        let now = self.now();
        let removed = self.geocoding().purge_expired(now) + self.map_data().purge_expired(now);
        self.save_snapshots();
        removed
    }

    /// Empties both stores and removes all persisted snapshots.
    pub fn clear_all(&self) {
        self.geocoding().clear();
        self.map_data().clear();
        if let Err(e) = self.storage.clear() {
            log::warn!("failed to clear persisted cache: {e}");
        }
        log::info!("cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            geocoding: self.geocoding().len(),
            map_data: self.map_data().len(),
        }
    }

    /// Reads the persisted map data metadata. The map data itself is never persisted.
    pub fn map_data_snapshot(&self) -> Result<Vec<(String, MapDataMeta)>, PersistError> {
        match self.storage.load(MAP_DATA_SNAPSHOT)? {
            Some(contents) => Ok(serde_json::from_str(&contents)?),
            None => Ok(Vec::default()),
        }
    }

    fn load_geocoding(&self) -> Result<usize, PersistError> {
        let contents = match self.storage.load(GEOCODING_SNAPSHOT)? {
            Some(contents) => contents,
            None => return Ok(0),
        };

        let entries: Vec<(String, CacheEntry<Coord>)> = serde_json::from_str(&contents)?;
        let loaded = entries.len();
        let mut store = self.geocoding();
        for (key, entry) in entries {
            store.insert(key, entry);
        }
        Ok(loaded)
    }

    fn save_snapshots(&self) {
        if let Err(e) = self.try_save_snapshots() {
            log::warn!("failed to persist cache: {e}");
        }
    }

    fn try_save_snapshots(&self) -> Result<(), PersistError> {
        let geocoding = {
            let store = self.geocoding();
            let entries: Vec<(&String, &CacheEntry<Coord>)> = store.iter().collect();
            serde_json::to_string(&entries)?
        };

        let map_data = {
            let store = self.map_data();
            let entries: Vec<(&String, MapDataMeta)> = store
                .iter()
                .map(|(key, entry)| {
                    let meta = MapDataMeta {
                        timestamp: entry.timestamp,
                        bounds: entry.bounds,
                    };
                    (key, meta)
                })
                .collect();
            serde_json::to_string(&entries)?
        };

        self.storage.save(GEOCODING_SNAPSHOT, &geocoding)?;
        self.storage.save(MAP_DATA_SNAPSHOT, &map_data)?;
        Ok(())
    }
}
