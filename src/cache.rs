//! Time-bounded memo for per-query results
//!
//! Entries expire lazily on read; there is no other invalidation.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<K, (Instant, V)>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fresh value for `key`, if any
    pub async fn get(&self, key: &K) -> Option<V> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((stored_at, value)) if stored_at.elapsed() < self.ttl => {
                    return Some(value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it so the map does not grow with dead keys.
        let mut entries = self.entries.write().await;
        if let Some((stored_at, _)) = entries.get(key) {
            if stored_at.elapsed() >= self.ttl {
                entries.remove(key);
            }
        }
        None
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(key, (Instant::now(), value));
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
