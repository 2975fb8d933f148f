//! In-process pull-based metrics registry.
//!
//! Collectors are registered with their descriptors validated up front.
//! [`Registry::gather`] asks every collector for its current samples and
//! groups them into [`MetricFamily`] values sorted by metric name.
//!
//! Collectors run *outside* the registry lock, so a slow or logging
//! collector never blocks registration, and a collector may itself take
//! other locks (e.g. a cache mutex) without lock-order hazards here.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::RegistryError;
use crate::metrics::desc::{Desc, MetricKind, Sample};
use crate::metrics::traits::{Collector, CollectorId, Registerer};

/// All samples sharing one metric name.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub samples: Vec<Sample>,
}

struct Registered {
    collector: Arc<dyn Collector>,
    descs: Vec<Desc>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    collectors: BTreeMap<CollectorId, Registered>,
}

/// Thread-safe collector registry.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered collectors.
    pub fn len(&self) -> usize {
        self.inner.lock().collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs one collection cycle across every registered collector.
    ///
    /// Samples whose name no registered descriptor declares, or whose label
    /// names differ from that descriptor's, are dropped.
    pub fn gather(&self) -> Vec<MetricFamily> {
        let (collectors, mut families) = {
            let inner = self.inner.lock();
            let collectors: Vec<Arc<dyn Collector>> = inner
                .collectors
                .values()
                .map(|r| Arc::clone(&r.collector))
                .collect();
            let mut families = BTreeMap::new();
            for desc in inner.collectors.values().flat_map(|r| &r.descs) {
                families.entry(desc.name().to_string()).or_insert_with(|| {
                    let label_names: Vec<String> =
                        desc.label_names().into_iter().map(String::from).collect();
                    let family = MetricFamily {
                        name: desc.name().to_string(),
                        help: desc.help().to_string(),
                        kind: desc.kind(),
                        samples: Vec::new(),
                    };
                    (family, label_names)
                });
            }
            (collectors, families)
        };

        for collector in collectors {
            for sample in collector.collect() {
                let Some((family, label_names)) = families.get_mut(sample.name()) else {
                    tracing::warn!(metric = sample.name(), "dropping sample for undescribed metric");
                    continue;
                };
                // Both sides are sorted by label name.
                let matches = sample.labels().len() == label_names.len()
                    && sample
                        .labels()
                        .iter()
                        .zip(label_names.iter())
                        .all(|((k, _), expected)| k == expected);
                if matches {
                    family.samples.push(sample);
                } else {
                    tracing::warn!(
                        metric = sample.name(),
                        "dropping sample whose labels differ from its descriptor"
                    );
                }
            }
        }

        families
            .into_values()
            .map(|(family, _)| family)
            .filter(|f| !f.samples.is_empty())
            .map(|mut f| {
                f.samples.sort_by(|a, b| a.labels().cmp(b.labels()));
                f
            })
            .collect()
    }

    /// Checks `new` against every descriptor already registered.
    ///
    /// A metric name may be shared across collectors only with the same
    /// help, kind and label names, and distinct constant label values.
    fn check_conflicts(inner: &RegistryInner, new: &[Desc]) -> Result<(), RegistryError> {
        let existing = inner.collectors.values().flat_map(|r| &r.descs);
        for (i, desc) in new.iter().enumerate() {
            desc.validate()?;
            for other in existing.clone().chain(&new[..i]) {
                if other.name() != desc.name() {
                    continue;
                }
                if other.const_labels() == desc.const_labels() {
                    return Err(RegistryError::AlreadyRegistered {
                        name: desc.name().to_string(),
                    });
                }
                if other.kind() != desc.kind()
                    || other.help() != desc.help()
                    || other.label_names() != desc.label_names()
                {
                    return Err(RegistryError::InvalidDescriptor(format!(
                        "{} is registered with a different help, kind or label set",
                        desc.name()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Registerer for Registry {
    fn register(&self, collector: Arc<dyn Collector>) -> Result<CollectorId, RegistryError> {
        let descs = collector.describe();
        let mut inner = self.inner.lock();
        Self::check_conflicts(&inner, &descs)?;

        let id = CollectorId(inner.next_id);
        inner.next_id += 1;
        tracing::debug!(collector = %id, metrics = descs.len(), "registered collector");
        inner.collectors.insert(id, Registered { collector, descs });
        Ok(id)
    }

    fn unregister(&self, id: CollectorId) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock();
        match inner.collectors.remove(&id) {
            Some(_) => {
                tracing::debug!(collector = %id, "unregistered collector");
                Ok(())
            },
            None => Err(RegistryError::NotRegistered { id }),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("collectors", &self.len())
            .finish_non_exhaustive()
    }
}
