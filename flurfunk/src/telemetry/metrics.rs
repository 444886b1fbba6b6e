//! Atomic counters for the refresh pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

use super::MetricsSnapshot;

/// Counters updated by the scheduler.
///
/// All updates use relaxed ordering; values are for observation only.
#[derive(Debug, Default)]
pub struct QueryMetrics {
    queries_issued: AtomicU64,
    responses_published: AtomicU64,
    stale_discarded: AtomicU64,
    store_failures: AtomicU64,
    validation_rejections: AtomicU64,
    notes_refiltered: AtomicU64,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_issued(&self) {
        self.queries_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn response_published(&self) {
        self.responses_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stale_discarded(&self) {
        self.stale_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn store_failed(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn validation_rejected(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record notes dropped by the assembler's radius re-filter.
    pub fn notes_refiltered(&self, count: usize) {
        self.notes_refiltered
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_issued: self.queries_issued.load(Ordering::Relaxed),
            responses_published: self.responses_published.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            notes_refiltered: self.notes_refiltered.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = QueryMetrics::new();
        metrics.query_issued();
        metrics.query_issued();
        metrics.response_published();
        metrics.stale_discarded();
        metrics.store_failed();
        metrics.notes_refiltered(3);
        metrics.notes_refiltered(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.queries_issued, 2);
        assert_eq!(snapshot.responses_published, 1);
        assert_eq!(snapshot.stale_discarded, 1);
        assert_eq!(snapshot.store_failures, 1);
        assert_eq!(snapshot.validation_rejections, 0);
        assert_eq!(snapshot.notes_refiltered, 5);
    }
}
