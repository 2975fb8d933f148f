//! DHAT heap profiler for evictkit.
//!
//! Run with: cargo run --bin dhat_profile --release --features dhat-heap
//! View results: Open dhat-heap.json in <https://nnethercote.github.io/dh_view/dh_view.html>

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::sync::Arc;

use evictkit::builder::LruBuilder;
use evictkit::metrics::registry::Registry;
use evictkit::policy::lru::LruCache;

/// Simple XorShift64 RNG for deterministic workloads.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_f64(&mut self) -> f64 {
        const SCALE: f64 = 1.0 / (u64::MAX as f64);
        (self.next_u64() as f64) * SCALE
    }
}

/// Read-through on a hot set: 90% of lookups target 10% of keys.
fn hotset_workload(cache: &mut LruCache<u64, Arc<u64>>, operations: usize, universe: u64) {
    let mut rng = XorShift64::new(42);
    let hot_size = universe / 10;
    for _ in 0..operations {
        let key = if rng.next_f64() < 0.9 {
            rng.next_u64() % hot_size
        } else {
            hot_size + (rng.next_u64() % (universe - hot_size))
        };
        if cache.get(&key).is_none() {
            cache.add(key, Arc::new(key));
        }
    }
}

fn eviction_churn(cache: &mut LruCache<u64, Arc<u64>>, operations: usize) {
    for i in 0..operations as u64 {
        cache.add(i, Arc::new(i));
    }
}

fn profile(label: &str, mut cache: LruCache<u64, Arc<u64>>) {
    println!("=== Profiling {label} ===");
    let operations = 100_000;
    let universe = 16_384;

    for i in 0..cache.capacity() as u64 {
        cache.add(i, Arc::new(i));
    }
    hotset_workload(&mut cache, operations, universe);
    eviction_churn(&mut cache, operations / 4);

    let snapshot = cache.metrics_snapshot();
    println!(
        "  len={} hits={} misses={} evictions={}",
        snapshot.cache_len, snapshot.hits, snapshot.misses, snapshot.evictions
    );
    if let Err(err) = cache.close() {
        eprintln!("  close failed: {err}");
    }
}

fn main() {
    let _profiler = dhat::Profiler::new_heap();

    println!("evictkit DHAT Heap Profiling");
    println!("============================\n");

    profile("LRU", LruCache::new(4096));

    profile(
        "LRU + callback",
        LruCache::with_eviction_callback(4096, |_, value: Arc<u64>| drop(value)),
    );

    let registry = Arc::new(Registry::new());
    match LruBuilder::new(4096).name("dhat").registry(registry).build() {
        Ok(cache) => profile("LRU + registry", cache),
        Err(err) => eprintln!("build failed: {err}"),
    }

    println!("\n============================");
    println!("Profile written to dhat-heap.json");
}
