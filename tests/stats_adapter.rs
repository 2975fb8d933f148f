// ==============================================
// STATISTICS ADAPTER TESTS (integration)
// ==============================================
//
// The adapter registered with a real registry, scraped and exported the
// way an agent's metrics endpoint would, including source failures.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use evictkit::builder::LruBuilder;
use evictkit::error::SourceError;
use evictkit::metrics::exporter::PrometheusTextExporter;
use evictkit::metrics::registry::{MetricFamily, Registry};
use evictkit::metrics::traits::{MetricsExporter, Registerer};
use evictkit::policy::lru::LruCache;
use evictkit::stats::{
    CounterSnapshot, CounterSource, MapStats, StatsCollector, UnwindErrorReason, UnwinderStats,
};

/// Source that can be switched offline between scrapes.
struct Switchable {
    online: AtomicBool,
}

impl CounterSource for Switchable {
    fn read_snapshot(&self) -> Result<CounterSnapshot, SourceError> {
        if !self.online.load(Ordering::Relaxed) {
            return Err(SourceError::Unavailable("maps not loaded".into()));
        }
        let per_cpu = [
            UnwinderStats {
                total_samples: 60,
                success_dwarf: 55,
                error_catchall: 5,
                ..Default::default()
            },
            UnwinderStats {
                total_samples: 40,
                success_dwarf: 38,
                error_unsupported_jit: 2,
                ..Default::default()
            },
        ];
        Ok(CounterSnapshot {
            unwinder: UnwinderStats::from_per_cpu(per_cpu),
            maps: vec![
                MapStats::new("stack_counts")
                    .key_size(40)
                    .value_size(8)
                    .max_entries(10_240)
                    .memlock(1_015_808),
            ],
        })
    }
}

fn family_value(families: &[MetricFamily], name: &str, label: (&str, &str)) -> Option<f64> {
    families
        .iter()
        .find(|f| f.name == name)?
        .samples
        .iter()
        .find(|s| s.label(label.0) == Some(label.1))
        .map(|s| s.value())
}

mod registry_integration {
    use super::*;

    #[test]
    fn gathers_folded_unwinder_and_map_figures() {
        let registry = Registry::new();
        let collector = StatsCollector::new(Switchable {
            online: AtomicBool::new(true),
        });
        registry.register(Arc::new(collector)).unwrap();

        let families = registry.gather();
        assert_eq!(
            family_value(&families, "native_unwinder_samples_total", ("unwinder", "dwarf")),
            Some(100.0)
        );
        assert_eq!(
            family_value(&families, "native_unwinder_success_total", ("unwinder", "dwarf")),
            Some(93.0)
        );
        assert_eq!(
            family_value(&families, "native_unwinder_error_total", ("reason", "catchall")),
            Some(5.0)
        );
        assert_eq!(
            family_value(&families, "bpf_map_max_entries", ("map", "stack_counts")),
            Some(10_240.0)
        );

        let errors = families
            .iter()
            .find(|f| f.name == "native_unwinder_error_total")
            .unwrap();
        assert_eq!(errors.samples.len(), UnwindErrorReason::ALL.len());
    }

    #[test]
    fn failed_read_omits_only_external_measurements() {
        let registry = Arc::new(Registry::new());
        let mut cache = LruBuilder::new(4)
            .name("symbols")
            .registry(registry.clone())
            .build()
            .unwrap();
        cache.add(1u64, ());
        cache.get(&1);

        let collector = Arc::new(
            StatsCollector::builder(Switchable {
                online: AtomicBool::new(false),
            })
            .build()
            .unwrap(),
        );
        registry.register(Arc::new(Arc::clone(&collector))).unwrap();

        let offline = registry.gather();
        let names: Vec<_> = offline.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec![
            "cache_evictions_total",
            "cache_hits_total",
            "cache_misses_total"
        ]);

        // The next cycle retries on its own.
        collector.source().online.store(true, Ordering::Relaxed);
        let online = registry.gather();
        assert!(online.iter().any(|f| f.name == "bpf_map_memlock"));
        assert_eq!(
            family_value(&online, "cache_hits_total", ("cache", "symbols")),
            Some(1.0)
        );
    }

    #[test]
    fn cache_attached_to_adapter_reports_through_it() {
        let registry = Registry::new();
        let mut cache = LruBuilder::new(2).name("debuginfo").build().unwrap();
        let collector = StatsCollector::builder(|| Ok::<_, SourceError>(CounterSnapshot::default()))
            .with_cache(cache.metrics().clone())
            .build()
            .unwrap();
        registry.register(Arc::new(collector)).unwrap();

        cache.add("a", 1);
        cache.add("b", 2);
        cache.add("c", 3);
        cache.get(&"zzz");

        let families = registry.gather();
        assert_eq!(
            family_value(&families, "cache_evictions_total", ("cache", "debuginfo")),
            Some(1.0)
        );
        assert_eq!(
            family_value(&families, "cache_misses_total", ("cache", "debuginfo")),
            Some(1.0)
        );
    }

    #[test]
    fn double_registration_of_cache_metrics_is_rejected() {
        let registry = Arc::new(Registry::new());
        let cache: LruCache<u8, u8> = LruBuilder::new(2)
            .name("twice")
            .registry(registry.clone())
            .build()
            .unwrap();
        let collector = StatsCollector::builder(|| Ok::<_, SourceError>(CounterSnapshot::default()))
            .with_cache(cache.metrics().clone())
            .build()
            .unwrap();
        assert!(registry.register(Arc::new(collector)).is_err());
        assert_eq!(registry.len(), 1);
    }
}

mod exposition {
    use super::*;

    #[test]
    fn renders_prefixed_prometheus_text() {
        let registry = Registry::new();
        registry
            .register(Arc::new(StatsCollector::new(Switchable {
                online: AtomicBool::new(true),
            })))
            .unwrap();

        let exporter = PrometheusTextExporter::new("parca_agent", Vec::new());
        exporter.export(&registry.gather()[..]).unwrap();
        let text = String::from_utf8(exporter.into_inner()).unwrap();

        assert!(text.contains("# HELP parca_agent_bpf_map_memlock Memlock value held by BPF map\n"));
        assert!(text.contains("# TYPE parca_agent_bpf_map_memlock gauge\n"));
        assert!(text.contains("parca_agent_bpf_map_memlock{map=\"stack_counts\"} 1015808\n"));
        assert!(text.contains("# TYPE parca_agent_native_unwinder_error_total counter\n"));
        assert!(text.contains(
            "parca_agent_native_unwinder_error_total{reason=\"unsupported_jit\"} 2\n"
        ));
        assert!(text.contains("parca_agent_native_unwinder_samples_total{unwinder=\"dwarf\"} 100\n"));
    }
}
