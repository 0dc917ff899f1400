//! Named atomic counters for service statistics.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe counter collection.
///
/// The set of names is fixed at construction; unknown names are ignored so a
/// typo never panics in production paths.
pub struct StatsCounter {
    counters: HashMap<&'static str, AtomicU64>,
}

impl StatsCounter {
    pub fn new(names: &[&'static str]) -> Self {
        let mut counters = HashMap::new();
        for &name in names {
            counters.insert(name, AtomicU64::new(0));
        }
        Self { counters }
    }

    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Point-in-time copy of every counter, ordered by name.
    pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        self.counters
            .iter()
            .map(|(&k, v)| (k, v.load(Ordering::Relaxed)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_known_names_only() {
        let stats = StatsCounter::new(&["a", "b"]);
        stats.increment("a");
        stats.add("a", 2);
        stats.increment("missing");
        assert_eq!(stats.get("a"), 3);
        assert_eq!(stats.get("b"), 0);
        assert_eq!(stats.get("missing"), 0);
    }

    #[test]
    fn snapshot_is_ordered() {
        let stats = StatsCounter::new(&["zeta", "alpha"]);
        stats.increment("zeta");
        let names: Vec<_> = stats.snapshot().into_keys().collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
