use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A shared, monotonically increasing counter.
///
/// Clones share the same underlying value, so the engine can bump a counter
/// while a registry scrape reads it without taking the engine's lock.
/// Loads and stores are `Relaxed`: a scrape may observe a count that is
/// momentarily behind, never one that goes backwards.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicU64>);

impl Counter {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn inc(&self) {
        self.inc_by(1);
    }

    #[inline]
    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_value() {
        let a = Counter::new();
        let b = a.clone();
        a.inc();
        b.inc_by(4);
        assert_eq!(a.get(), 5);
        assert_eq!(b.get(), 5);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let counter = Counter::new();
        std::thread::scope(|s| {
            for _ in 0..4 {
                let c = counter.clone();
                s.spawn(move || {
                    for _ in 0..1000 {
                        c.inc();
                    }
                });
            }
        });
        assert_eq!(counter.get(), 4000);
    }
}
