//! Time-boxed cache for web augmentation results.
//!
//! One writer at a time (the session is single-threaded and turn-synchronous)
//! so a plain map with lazy expiry is enough; there is no eviction beyond TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A string-keyed cache whose entries expire after a fixed TTL.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: HashMap<String, (Instant, V)>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Look up a live entry. Expired entries are dropped on access.
    pub fn get(&mut self, key: &str) -> Option<V> {
        match self.entries.get(key) {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), (Instant::now(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
