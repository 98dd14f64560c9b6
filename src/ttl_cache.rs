use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

pub const DEFAULT_MAX_ENTRIES: usize = 512;

/// In-memory key → value map whose entries expire after a fixed TTL.
/// One entry per key; the last write wins. Inserts sweep expired entries
/// and, when still full, evict the entry closest to expiry.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_max_entries(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut entries = self.lock();
        let fresh = entries.get(key).map(|entry| now < entry.expires_at)?;
        if fresh {
            entries.get(key).map(|entry| entry.value.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&self, key: K, value: V, now: Instant) {
        let entry = CacheEntry {
            value,
            expires_at: now + self.ttl,
        };
        let mut entries = self.lock();
        entries.retain(|_, entry| now < entry.expires_at);
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let soonest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(k, _)| k.clone());
            if let Some(victim) = soonest {
                entries.remove(&victim);
            }
        }
        entries.insert(key, entry);
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        // Entries are replaced whole; a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::TtlCache;

    #[test]
    fn entries_expire_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at("k", 1, t0);
        assert_eq!(cache.get_at(&"k", t0 + Duration::from_secs(59)), Some(1));
        assert_eq!(cache.get_at(&"k", t0 + Duration::from_secs(60)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn last_write_wins() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at("k", 1, t0);
        cache.insert_at("k", 2, t0);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at(&"k", t0), Some(2));
    }

    #[test]
    fn purge_removes_only_stale_entries() {
        let cache = TtlCache::new(Duration::from_secs(10));
        let t0 = Instant::now();
        cache.insert_at("old", 1, t0);
        cache.insert_at("new", 2, t0 + Duration::from_secs(8));
        assert_eq!(cache.purge_expired(t0 + Duration::from_secs(12)), 1);
        assert_eq!(cache.get_at(&"new", t0 + Duration::from_secs(12)), Some(2));
    }

    #[test]
    fn insert_sweeps_expired_entries() {
        let cache = TtlCache::new(Duration::from_millis(1));
        let t0 = Instant::now();
        for i in 0..1000 {
            cache.insert_at(i, i, t0);
        }
        cache.insert_at(1000, 1000, t0 + Duration::from_millis(5));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn full_cache_evicts_the_oldest_entry() {
        let cache = TtlCache::with_max_entries(Duration::from_secs(60), 2);
        let t0 = Instant::now();
        cache.insert_at("a", 1, t0);
        cache.insert_at("b", 2, t0 + Duration::from_secs(1));
        cache.insert_at("c", 3, t0 + Duration::from_secs(2));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at(&"a", t0 + Duration::from_secs(2)), None);
        assert_eq!(cache.get_at(&"c", t0 + Duration::from_secs(2)), Some(3));

        cache.insert_at("c", 4, t0 + Duration::from_secs(3));
        assert_eq!(cache.get_at(&"b", t0 + Duration::from_secs(3)), Some(2));
    }
}
