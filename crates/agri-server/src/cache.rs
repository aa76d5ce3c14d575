use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub trait CacheEntry {
    fn fetched_at(&self) -> Instant;
}

/// Drop entries older than `max_age`, then the oldest ones until at most
/// `max_entries` remain.
pub fn prune_cache<K, V>(cache: &DashMap<K, V>, max_entries: usize, max_age: Duration)
where
    K: Clone + Eq + Hash,
    V: CacheEntry,
{
    let now = Instant::now();
    let mut entries: Vec<(K, Instant)> = cache
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().fetched_at()))
        .collect();

    entries.retain(|(key, fetched_at)| {
        let expired = now.duration_since(*fetched_at) > max_age;
        if expired {
            cache.remove(key);
        }
        !expired
    });

    if cache.len() <= max_entries {
        return;
    }

    entries.sort_by_key(|(_, fetched_at)| *fetched_at);
    for (key, _) in entries {
        if cache.len() <= max_entries {
            break;
        }
        cache.remove(&key);
    }
}

/// Fresh value for `key`, if cached and younger than `max_age`.
pub fn fresh<K, V>(cache: &DashMap<K, V>, key: &K, max_age: Duration) -> Option<V>
where
    K: Eq + Hash,
    V: CacheEntry + Clone,
{
    cache
        .get(key)
        .filter(|entry| entry.fetched_at().elapsed() <= max_age)
        .map(|entry| entry.value().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Entry(Instant);

    impl CacheEntry for Entry {
        fn fetched_at(&self) -> Instant {
            self.0
        }
    }

    #[test]
    fn prune_drops_oldest_beyond_capacity() {
        let cache = DashMap::new();
        let now = Instant::now();
        cache.insert("old", Entry(now - Duration::from_secs(3)));
        cache.insert("mid", Entry(now - Duration::from_secs(2)));
        cache.insert("new", Entry(now));

        prune_cache(&cache, 2, Duration::from_secs(60));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains_key("old"));
    }

    #[test]
    fn prune_drops_expired_entries() {
        let cache = DashMap::new();
        cache.insert("stale", Entry(Instant::now() - Duration::from_secs(120)));
        cache.insert("live", Entry(Instant::now()));

        prune_cache(&cache, 10, Duration::from_secs(60));
        assert!(cache.contains_key("live"));
        assert!(!cache.contains_key("stale"));
    }

    #[test]
    fn fresh_ignores_expired() {
        let cache = DashMap::new();
        cache.insert("k", Entry(Instant::now() - Duration::from_secs(120)));
        assert!(fresh(&cache, &"k", Duration::from_secs(60)).is_none());
        assert!(fresh(&cache, &"k", Duration::from_secs(600)).is_some());
    }
}
