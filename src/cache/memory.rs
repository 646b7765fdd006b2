//! # Bounded LRU + TTL in-memory cache.
//!
//! Default [`ValueCache`] implementation. Entries expire `ttl` after
//! insertion; expiry is checked on read and expired entries read as absent.
//! Reads refresh LRU recency (eviction order) but never the TTL.
//!
//! Time comes from [`tokio::time::Instant`], so tests running under a paused
//! runtime clock observe expiry deterministically.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

use crate::types::RequestKey;

use super::ValueCache;

struct Entry {
    value: Value,
    expires_at: Instant,
}

struct Inner {
    entries: HashMap<RequestKey, Entry>,
    /// Recency order, oldest first. Small capacities make the linear scans fine.
    order: Vec<RequestKey>,
}

/// Bounded in-memory cache with TTL expiry and LRU eviction.
pub struct MemoryCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl MemoryCache {
    /// Creates a cache holding at most `capacity` entries (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner { entries: HashMap::new(), order: Vec::new() }),
        }
    }

    /// Number of entries currently stored (including not-yet-reaped expired ones).
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// True if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ValueCache for MemoryCache {
    fn get(&self, key: &RequestKey) -> Option<Value> {
        let mut inner = self.inner.lock();

        let live = match inner.entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.value.clone()),
            Some(_) => None,
            None => return None,
        };

        match live {
            Some(value) => {
                inner.order.retain(|k| k != key);
                inner.order.push(key.clone());
                Some(value)
            }
            None => {
                let _ = inner.entries.remove(key);
                inner.order.retain(|k| k != key);
                None
            }
        }
    }

    fn set(&self, key: RequestKey, value: Value, ttl: Duration) {
        let mut inner = self.inner.lock();

        inner.order.retain(|k| k != &key);
        while inner.entries.len() >= self.capacity && !inner.entries.contains_key(&key) {
            if inner.order.is_empty() {
                break;
            }
            let oldest = inner.order.remove(0);
            let _ = inner.entries.remove(&oldest);
        }

        let entry = Entry { value, expires_at: Instant::now() + ttl };
        let _ = inner.entries.insert(key.clone(), entry);
        inner.order.push(key);
    }
}
