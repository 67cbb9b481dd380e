//! Query cache: short-lived memoization of listing queries.
//!
//! Entries live for a fixed TTL measured from insertion; reading an entry
//! does not extend it. Invalidation is coarse: any catalog mutation drops
//! every entry. The cache is process-local, so separate processes may
//! disagree for up to one TTL after a write.

use crate::{clock::Clock, error::CatalogResult};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::Arc;

/// Cache key for a product listing: normalized search term plus the
/// selected category set.
///
/// The search term is folded with ASCII rules only, matching SQLite's
/// `lower()`. Two terms share a key only when the query treats them alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey {
    pub search: String,
    pub categories: BTreeSet<String>,
}

impl ListingKey {
    pub fn new(search: &str, categories: &[String]) -> Self {
        Self {
            search: search.trim().to_ascii_lowercase(),
            categories: categories.iter().cloned().collect(),
        }
    }
}

struct CacheEntry<V> {
    value: V,
    inserted_at: DateTime<Utc>,
}

pub struct QueryCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh cached value, if any. Expired entries are dropped on sight.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if now - entry.inserted_at < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let inserted_at = self.clock.now();
        self.entries
            .lock()
            .insert(key, CacheEntry { value, inserted_at });
    }

    /// Return the cached value or compute, store and return a fresh one.
    /// A failed computation is returned as-is and nothing is cached.
    ///
    /// The lock is not held while `compute` runs.
    pub fn get_or_compute<F>(&self, key: &K, compute: F) -> CatalogResult<V>
    where
        F: FnOnce() -> CatalogResult<V>,
    {
        if let Some(hit) = self.get(key) {
            log::trace!("cache: hit");
            return Ok(hit);
        }
        log::trace!("cache: miss");
        let value = compute()?;
        self.insert(key.clone(), value.clone());
        Ok(value)
    }

    /// Drop every entry.
    pub fn invalidate(&self) {
        let mut entries = self.entries.lock();
        if !entries.is_empty() {
            log::debug!("cache: invalidated {} entries", entries.len());
        }
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
