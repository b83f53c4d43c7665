// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::PersistError;

const DAY_SECS: u64 = 24 * 60 * 60;

/// Tunables of a [CacheManager](super::CacheManager).
///
/// Missing fields of a JSON config file take their [default](CacheConfig::default) values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long geocoded addresses stay valid (default: 7 days)
    pub geocoding_expiry_secs: u64,

    /// How long downloaded map data stays valid (default: 3 days)
    pub map_data_expiry_secs: u64,

    /// Maximum number of geocoded addresses (default: 100)
    pub max_geocoding_entries: usize,

    /// Maximum number of map data entries (default: 20)
    pub max_map_data_entries: usize,

    /// Interval of the periodic cleanup (default: 30 minutes)
    pub cleanup_interval_secs: u64,

    /// Minimum fraction of a requested area which a cached map data entry must cover
    /// to be used (default: 0.8)
    pub overlap_threshold: f64,

    /// Number of decimal places of coordinates in cache keys (default: 2, about 1 km)
    pub key_precision: u32,

    /// Prefix of persisted snapshot names (default: `route_finder_cache_`)
    pub storage_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            geocoding_expiry_secs: 7 * DAY_SECS,
            map_data_expiry_secs: 3 * DAY_SECS,
            max_geocoding_entries: 100,
            max_map_data_entries: 20,
            cleanup_interval_secs: 30 * 60,
            overlap_threshold: 0.8,
            key_precision: 2,
            storage_prefix: "route_finder_cache_".to_string(),
        }
    }
}

impl CacheConfig {
    /// Loads the config from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PersistError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn geocoding_expiry(&self) -> Duration {
        Duration::from_secs(self.geocoding_expiry_secs)
    }

    pub fn map_data_expiry(&self) -> Duration {
        Duration::from_secs(self.map_data_expiry_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = CacheConfig::default();
        assert_eq!(c.geocoding_expiry(), Duration::from_secs(604_800));
        assert_eq!(c.map_data_expiry(), Duration::from_secs(259_200));
        assert_eq!(c.cleanup_interval(), Duration::from_secs(1_800));
    }

    #[test]
    fn from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, r#"{"max_map_data_entries": 5, "key_precision": 3}"#).unwrap();

        let c = CacheConfig::from_file(&path).unwrap();
        assert_eq!(c.max_map_data_entries, 5);
        assert_eq!(c.key_precision, 3);
        assert_eq!(c.max_geocoding_entries, 100);
        assert_eq!(c.storage_prefix, "route_finder_cache_");
    }

    #[test]
    fn from_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            CacheConfig::from_file(dir.path().join("missing.json")),
            Err(PersistError::Io(_)),
        ));

        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"key_precision": "two"}"#).unwrap();
        assert!(matches!(
            CacheConfig::from_file(&path),
            Err(PersistError::Json(_)),
        ));
    }
}
