// ==============================================
// LRU BEHAVIORAL PROPERTY TESTS (integration)
// ==============================================
//
// Observable guarantees of the eviction engine through its public API:
// capacity bound, recency order, promotion, non-mutating peek, overwrite
// semantics, purge and close lifecycle, and counter monotonicity.

use std::sync::{Arc, Mutex};

use evictkit::builder::LruBuilder;
use evictkit::metrics::registry::Registry;
use evictkit::policy::lru::LruCache;

type Evicted<K, V> = Arc<Mutex<Vec<(K, V)>>>;

fn recording<K, V>(capacity: usize) -> (LruCache<K, V>, Evicted<K, V>)
where
    K: Eq + std::hash::Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    let evicted: Evicted<K, V> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evicted);
    let cache = LruCache::with_eviction_callback(capacity, move |k, v| {
        sink.lock().unwrap().push((k, v));
    });
    (cache, evicted)
}

// ==============================================
// Capacity
// ==============================================

mod capacity {
    use super::*;

    #[test]
    fn len_never_exceeds_capacity() {
        for capacity in 1..=8 {
            let mut cache = LruCache::new(capacity);
            for k in 0..(capacity * 5) {
                cache.add(k, k);
                assert!(
                    cache.len() <= capacity,
                    "len {} exceeds capacity {}",
                    cache.len(),
                    capacity
                );
            }
            assert_eq!(cache.len(), capacity);
        }
    }

    #[test]
    fn one_eviction_per_add_at_most() {
        let (mut cache, evicted) = recording(3);
        for k in 0..10u32 {
            let before = evicted.lock().unwrap().len();
            cache.add(k, ());
            let after = evicted.lock().unwrap().len();
            assert!(after - before <= 1);
        }
        assert_eq!(cache.metrics().evictions(), 7);
    }

    #[test]
    fn capacity_zero_is_unbounded() {
        let mut cache = LruCache::new(0);
        for k in 0..500u32 {
            cache.add(k, k);
        }
        assert_eq!(cache.len(), 500);
        assert_eq!(cache.capacity(), 0);
        assert_eq!(cache.metrics().evictions(), 0);
    }
}

// ==============================================
// Recency
// ==============================================

mod recency {
    use super::*;

    #[test]
    fn first_of_c_plus_one_is_evicted() {
        const C: u32 = 5;
        let mut cache = LruCache::new(C as usize);
        for k in 1..=C + 1 {
            cache.add(k, ());
        }
        assert!(!cache.contains(&1));
        for k in 2..=C + 1 {
            assert!(cache.contains(&k), "k{k} should remain");
        }
    }

    #[test]
    fn read_promotes() {
        let mut cache = LruCache::new(2);
        cache.add("k1", 1);
        cache.add("k2", 2);
        assert_eq!(cache.get(&"k1"), Some(&1));
        cache.add("k3", 3);

        assert!(cache.contains(&"k1"));
        assert!(!cache.contains(&"k2"));
        assert!(cache.contains(&"k3"));
    }

    #[test]
    fn peek_never_changes_eviction_victim() {
        let build = || {
            let mut cache = LruCache::new(3);
            cache.add(1, ());
            cache.add(2, ());
            cache.add(3, ());
            cache
        };

        let mut untouched = build();
        let mut peeked = build();
        for _ in 0..10 {
            for k in 1..=3 {
                peeked.peek(&k);
            }
        }
        assert_eq!(
            untouched.peek_lru().map(|(k, _)| *k),
            peeked.peek_lru().map(|(k, _)| *k)
        );

        untouched.add(4, ());
        peeked.add(4, ());
        let a: Vec<_> = untouched.iter().map(|(k, _)| *k).collect();
        let b: Vec<_> = peeked.iter().map(|(k, _)| *k).collect();
        assert_eq!(a, b);
        assert_eq!(peeked.metrics_snapshot().lookups(), 0);
    }

    #[test]
    fn repeated_add_resets_recency() {
        let mut cache = LruCache::new(2);
        cache.add('a', 0);
        cache.add('b', 0);
        cache.add('a', 1);
        cache.add('c', 0);
        assert!(cache.contains(&'a'));
        assert!(!cache.contains(&'b'));
        assert_eq!(cache.len(), 2);
    }
}

// ==============================================
// Overwrite / Remove / Purge / Close
// ==============================================

mod lifecycle {
    use super::*;

    #[test]
    fn overwrite_is_not_eviction() {
        let (mut cache, evicted) = recording(4);
        cache.add("k1", "v1");
        cache.add("k1", "v2");

        assert!(evicted.lock().unwrap().is_empty());
        assert_eq!(cache.metrics().evictions(), 0);
        assert_eq!(cache.get(&"k1"), Some(&"v2"));
    }

    #[test]
    fn remove_absent_is_noop() {
        let (mut cache, evicted) = recording::<u8, u8>(4);
        assert!(!cache.remove(&9));
        assert!(evicted.lock().unwrap().is_empty());
        assert_eq!(cache.metrics().evictions(), 0);
    }

    #[test]
    fn purge_on_empty_cache_is_idempotent() {
        let (mut cache, evicted) = recording::<u8, u8>(4);
        cache.add(1, 1);
        cache.get(&1);
        cache.purge();
        let snapshot = cache.metrics_snapshot();

        cache.purge();
        cache.purge();
        assert_eq!(evicted.lock().unwrap().len(), 1);
        assert_eq!(cache.metrics_snapshot(), snapshot);
    }

    #[test]
    fn close_is_terminal_and_idempotent() {
        let registry = Arc::new(Registry::new());
        let evicted: Evicted<u32, u32> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&evicted);
        let mut cache = LruBuilder::new(8)
            .name("close")
            .registry(registry.clone())
            .on_evicted(move |k, v| sink.lock().unwrap().push((k, v)))
            .build()
            .unwrap();
        for k in 0..5 {
            cache.add(k, k);
        }

        cache.close().unwrap();
        assert_eq!(cache.len(), 0);
        assert_eq!(evicted.lock().unwrap().len(), 5);
        assert!(registry.is_empty());

        cache.close().unwrap();
        assert_eq!(evicted.lock().unwrap().len(), 5);
    }

    #[test]
    fn empty_cache_lookups_are_not_errors() {
        let mut cache: LruCache<String, u8> = LruCache::new(2);
        assert_eq!(cache.get("x"), None);
        assert_eq!(cache.peek("x"), None);
        assert!(!cache.remove("x"));
    }
}

// ==============================================
// Counters
// ==============================================

mod counters {
    use super::*;

    #[test]
    fn counters_are_monotonic_across_lifecycle() {
        let mut cache = LruCache::new(2);
        let mut last = cache.metrics_snapshot();
        for round in 0..4u32 {
            for k in 0..6 {
                cache.add(k, round);
                cache.get(&(k / 2));
                cache.get(&(k + 100));
                if k % 3 == 0 {
                    cache.remove(&k);
                }
                let now = cache.metrics_snapshot();
                assert!(now.hits >= last.hits);
                assert!(now.misses >= last.misses);
                assert!(now.evictions >= last.evictions);
                last = now;
            }
            cache.purge();
            assert_eq!(cache.metrics_snapshot().evictions, last.evictions);
        }
        cache.close().unwrap();
        let end = cache.metrics_snapshot();
        assert_eq!((end.hits, end.misses, end.evictions), (last.hits, last.misses, last.evictions));
    }

    #[test]
    fn remove_counts_as_eviction() {
        let mut cache = LruCache::new(4);
        cache.add(1, ());
        cache.add(2, ());
        cache.remove(&1);
        assert_eq!(cache.metrics().evictions(), 1);
    }
}
