// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Bounds;

/// Cached value together with the time (in milliseconds since the Unix epoch)
/// it was stored at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub data: V,
    pub timestamp: u64,

    /// Area covered by map data entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

impl<V> CacheEntry<V> {
    pub fn new(data: V, timestamp: u64) -> Self {
        Self {
            data,
            timestamp,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }
}

/// Keyed store whose entries expire after a fixed time, holding at most
/// a fixed number of entries.
///
/// Entries are visited in key order. When the store grows over its capacity,
/// the oldest entries (by timestamp, ties broken by key) are evicted.
#[derive(Debug, Clone)]
pub struct TtlStore<V> {
    entries: BTreeMap<String, CacheEntry<V>>,
    expiry: Duration,
    max_entries: usize,
}

impl<V> TtlStore<V> {
    pub fn new(expiry: Duration, max_entries: usize) -> Self {
        Self {
            entries: BTreeMap::default(),
            expiry,
            max_entries,
        }
    }

    /// Returns the number of stored entries, including expired ones not purged yet.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks if an entry is older than the expiry time at `now`.
    pub fn is_expired(&self, entry: &CacheEntry<V>, now: u64) -> bool {
        Duration::from_millis(now.saturating_sub(entry.timestamp)) > self.expiry
    }

    /// Returns a non-expired entry with the given key.
    pub fn get(&self, key: &str, now: u64) -> Option<&CacheEntry<V>> {
        self.entries
            .get(key)
            .filter(|entry| !self.is_expired(entry, now))
    }

    /// Iterates over all non-expired entries, in key order.
    pub fn iter_fresh(&self, now: u64) -> impl Iterator<Item = (&String, &CacheEntry<V>)> {
        self.entries
            .iter()
            .filter(move |(_, entry)| !self.is_expired(entry, now))
    }

    /// Iterates over all entries, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry<V>)> {
        self.entries.iter()
    }

    /// Inserts or overwrites an entry, then evicts the oldest entries while
    /// over capacity. Returns the keys of evicted entries.
    pub fn insert(&mut self, key: String, entry: CacheEntry<V>) -> Vec<String> {
        self.entries.insert(key, entry);
        self.enforce_limit()
    }

    fn enforce_limit(&mut self) -> Vec<String> {
        let mut evicted = Vec::default();

        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by(|(a_key, a), (b_key, b)| {
                    a.timestamp.cmp(&b.timestamp).then_with(|| a_key.cmp(b_key))
                })
                .map(|(key, _)| key.clone());

            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    evicted.push(key);
                }
                None => break,
            }
        }

        evicted
    }

    /// Removes all expired entries, returning how many were removed.
    pub fn purge_expired(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        let expiry = self.expiry;
        self.entries.retain(|_, entry| {
            Duration::from_millis(now.saturating_sub(entry.timestamp)) <= expiry
        });
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: u64 = 3_600_000;

    fn store() -> TtlStore<u32> {
        TtlStore::new(Duration::from_millis(10 * HOUR), 3)
    }

    #[test]
    fn expiry() {
        let mut s = store();
        s.insert("a".to_string(), CacheEntry::new(1, 0));

        assert_eq!(s.get("a", 10 * HOUR).map(|e| e.data), Some(1));
        assert_eq!(s.get("a", 10 * HOUR + 1), None);
        assert_eq!(s.get("b", 0), None);

        // Still stored until purged
        assert_eq!(s.len(), 1);
        assert_eq!(s.purge_expired(10 * HOUR + 1), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn evicts_exactly_the_oldest() {
        let mut s = store();
        s.insert("c".to_string(), CacheEntry::new(1, 30));
        s.insert("a".to_string(), CacheEntry::new(2, 10));
        s.insert("b".to_string(), CacheEntry::new(3, 20));
        assert_eq!(s.len(), 3);

        let evicted = s.insert("d".to_string(), CacheEntry::new(4, 40));
        assert_eq!(evicted, vec!["a".to_string()]);

        let keys: Vec<&str> = s.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "c", "d"]);
    }

    #[test]
    fn eviction_ties_broken_by_key() {
        let mut s = store();
        for key in ["y", "x", "z", "w"] {
            s.insert(key.to_string(), CacheEntry::new(0, 5));
        }
        let keys: Vec<&str> = s.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["x", "y", "z"]);
    }

    #[test]
    fn overwrite_refreshes_timestamp() {
        let mut s = store();
        s.insert("a".to_string(), CacheEntry::new(1, 0));
        s.insert("a".to_string(), CacheEntry::new(2, 5 * HOUR));

        assert_eq!(s.len(), 1);
        assert_eq!(s.get("a", 12 * HOUR).map(|e| e.data), Some(2));
    }

    #[test]
    fn iter_fresh_skips_expired() {
        let mut s = store();
        s.insert("old".to_string(), CacheEntry::new(1, 0));
        s.insert("new".to_string(), CacheEntry::new(2, 5 * HOUR));

        let fresh: Vec<&str> = s.iter_fresh(12 * HOUR).map(|(k, _)| k.as_str()).collect();
        assert_eq!(fresh, vec!["new"]);
    }

    #[test]
    fn serialized_entry() {
        let geocode = CacheEntry::new(crate::Coord::new(52.23, 21.01), 1_700_000_000_000);
        let json = serde_json::to_string(&geocode).unwrap();
        assert_eq!(
            json,
            r#"{"data":{"lat":52.23,"lon":21.01},"timestamp":1700000000000}"#
        );
        let back: CacheEntry<crate::Coord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, geocode);
    }
}
