//! Symbol cache inside a profiling agent.
//!
//! Caches resolved symbol names per address, forwards evicted entries to a
//! downstream store, and exposes cache and unwinder statistics in
//! Prometheus text format.
//!
//! Run with: `RUST_LOG=evictkit=trace cargo run --example symbol_cache`

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use evictkit::builder::LruBuilder;
use evictkit::error::SourceError;
use evictkit::metrics::exporter::PrometheusTextExporter;
use evictkit::metrics::registry::Registry;
use evictkit::metrics::traits::{MetricsExporter, Registerer};
use evictkit::stats::{CounterSnapshot, CounterSource, MapStats, StatsCollector, UnwinderStats};
use tracing_subscriber::EnvFilter;

/// Stands in for the kernel-side per-CPU counters.
struct FakeKernelCounters {
    reads: AtomicU64,
}

impl CounterSource for FakeKernelCounters {
    fn read_snapshot(&self) -> Result<CounterSnapshot, SourceError> {
        let n = self.reads.fetch_add(1, Ordering::Relaxed);
        if n == 0 {
            return Err(SourceError::Unavailable("unwind maps not loaded yet".into()));
        }
        let per_cpu = (0..4).map(|cpu| UnwinderStats {
            total_samples: 250 * n + cpu,
            success_dwarf: 240 * n,
            error_pc_not_covered: 7 * n,
            error_truncated: 3 * n,
            ..Default::default()
        });
        Ok(CounterSnapshot {
            unwinder: UnwinderStats::from_per_cpu(per_cpu),
            maps: vec![
                MapStats::new("stack_counts")
                    .key_size(40)
                    .value_size(8)
                    .max_entries(10_240)
                    .memlock(1_015_808),
                MapStats::new("unwind_tables")
                    .key_size(8)
                    .value_size(32)
                    .max_entries(65_536)
                    .memlock(2_101_248),
            ],
        })
    }
}

fn resolve(addr: u64) -> String {
    format!("fn_{addr:#x}")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = Arc::new(Registry::new());
    let downstream: Arc<Mutex<HashMap<u64, String>>> = Arc::default();
    let sink = Arc::clone(&downstream);

    let symbols = LruBuilder::new(4)
        .name("symbols")
        .registry(registry.clone())
        .on_evicted(move |addr: u64, name: String| {
            if let Ok(mut store) = sink.lock() {
                store.insert(addr, name);
            }
        })
        .build_concurrent()?;

    let stats = StatsCollector::builder(FakeKernelCounters {
        reads: AtomicU64::new(0),
    })
    .build()?;
    registry.register(Arc::new(stats))?;

    for addr in [0x1000u64, 0x2000, 0x1000, 0x3000, 0x4000, 0x5000, 0x1000, 0x6000] {
        match symbols.get(&addr) {
            Some(name) => println!("hit  {addr:#x} -> {name}"),
            None => {
                let name = resolve(addr);
                println!("miss {addr:#x} -> {name}");
                symbols.add(addr, name);
            },
        }
    }

    let exporter = PrometheusTextExporter::new("parca_agent", io::stdout());
    println!("\n--- scrape 1 (source offline) ---");
    exporter.export(&registry.gather()[..])?;
    println!("\n--- scrape 2 ---");
    exporter.export(&registry.gather()[..])?;

    symbols.close()?;
    let stored = downstream.lock().map(|s| s.len()).unwrap_or_default();
    println!("\nforwarded {stored} evicted symbols downstream");
    Ok(())
}
