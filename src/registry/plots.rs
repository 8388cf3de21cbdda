//! Plot capacity bookkeeping for downstream miners.
//!
//! Every miner that submits through this gateway announces the hash of its
//! plot set together with the capacity behind it. The registry keeps the
//! latest announcement per hash so capacity forwards can report the total
//! storage standing behind this gateway.

use std::sync::Arc;

use dashmap::DashMap;

/// Thread-safe map of plot-set hash to announced capacity.
#[derive(Debug, Clone, Default)]
pub struct PlotCapacityRegistry {
    inner: Arc<DashMap<String, u64>>,
}

impl PlotCapacityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or replace the capacity announced for a plot-set hash.
    pub fn set(&self, hash: impl Into<String>, capacity: u64) {
        self.inner.insert(hash.into(), capacity);
    }

    /// Capacity announced for a specific plot-set hash.
    pub fn get(&self, hash: &str) -> Option<u64> {
        self.inner.get(hash).map(|entry| *entry.value())
    }

    /// Sum of all announced capacities.
    pub fn total(&self) -> u64 {
        self.inner
            .iter()
            .fold(0u64, |acc, entry| acc.saturating_add(*entry.value()))
    }

    /// Number of distinct plot sets seen so far.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no miner has announced capacity yet.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_sums_all_entries() {
        let registry = PlotCapacityRegistry::new();
        registry.set("a", 10);
        registry.set("b", 32);
        assert_eq!(registry.total(), 42);
    }

    #[test]
    fn test_reannouncement_replaces_previous_value() {
        let registry = PlotCapacityRegistry::new();
        registry.set("a", 10);
        registry.set("a", 25);
        assert_eq!(registry.total(), 25);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_total_saturates_instead_of_overflowing() {
        let registry = PlotCapacityRegistry::new();
        registry.set("a", u64::MAX);
        registry.set("b", 1);
        assert_eq!(registry.total(), u64::MAX);
    }
}
