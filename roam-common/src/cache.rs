//! TTL cache for provider results
//!
//! **[REC-CACHE-010]** Process-wide cache for venue-provider listings.
//! Writes are atomic single-key replacements under a write lock; readers
//! never observe a partially written entry. The lock is never held across
//! an I/O suspension point — callers fetch, then insert.

use std::collections::HashMap;
use std::hash::Hash;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

struct Entry<V> {
    inserted_at: Instant,
    value: V,
}

/// Async TTL cache with replace-on-refresh semantics
///
/// Expired entries are dropped lazily on access and by `purge_expired()`.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get a live entry, or None if absent or past TTL
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Insert or replace a single key
    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            Entry {
                inserted_at: Instant::now(),
                value,
            },
        );
    }

    /// Drop all expired entries
    pub async fn purge_expired(&self) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, e| e.inserted_at.elapsed() < ttl);
    }

    /// Number of entries currently stored (live or expired-but-unpurged)
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
