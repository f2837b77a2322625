use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::clock::Clock;

/// A stored response. Expiry turns an entry stale, it never removes it.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub captured_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// What a read hands back: the payload plus staleness as of the read.
#[derive(Debug, Clone, Serialize)]
pub struct CachedValue<T> {
    pub key: String,
    pub payload: T,
    pub captured_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_stale: bool,
}

/// In-memory keyed cache with a fixed freshness window.
///
/// Staleness is computed at read time, so the same entry reads fresh and
/// later stale without any write in between. Entries leave only through
/// [`FreshnessCache::clear`] or by being overwritten.
pub struct FreshnessCache<T: Clone> {
    entries: HashMap<String, CacheEntry<T>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> FreshnessCache<T> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<CachedValue<T>> {
        let now = self.clock.now();
        self.entries.get(key).map(|entry| view(key, entry, now))
    }

    /// Store `payload` under `key`, replacing any previous entry.
    pub fn put(&mut self, key: impl Into<String>, payload: T) {
        let captured_at = self.clock.now();
        self.entries.insert(
            key.into(),
            CacheEntry {
                payload,
                captured_at,
                expires_at: captured_at
                    .checked_add_signed(self.ttl)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Every entry, ordered by key.
    pub fn all(&self) -> Vec<CachedValue<T>> {
        let now = self.clock.now();
        let mut values: Vec<_> = self
            .entries
            .iter()
            .map(|(key, entry)| view(key, entry, now))
            .collect();
        values.sort_by(|a, b| a.key.cmp(&b.key));
        values
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

fn view<T: Clone>(key: &str, entry: &CacheEntry<T>, now: DateTime<Utc>) -> CachedValue<T> {
    CachedValue {
        key: key.to_string(),
        payload: entry.payload.clone(),
        captured_at: entry.captured_at,
        expires_at: entry.expires_at,
        is_stale: entry.is_stale_at(now),
    }
}
