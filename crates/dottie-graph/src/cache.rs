use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cache entry with TTL
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// Single-slot, read-only snapshot of reference data with a time-to-live.
///
/// Entries are only ever replaced wholesale after expiry; callers get a shared
/// immutable view and can never mutate cached data.
pub struct SnapshotCache<T> {
    slot: RwLock<Option<CacheEntry<Arc<T>>>>,
    ttl: Duration,
}

impl<T> SnapshotCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
        }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        let slot = self.slot.read();
        match slot.as_ref() {
            Some(entry) if !entry.is_expired() => Some(Arc::clone(&entry.value)),
            _ => None,
        }
    }

    pub fn put(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        *self.slot.write() = Some(CacheEntry::new(Arc::clone(&value), self.ttl));
        value
    }
}
