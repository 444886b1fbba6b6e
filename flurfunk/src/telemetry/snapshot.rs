//! Point-in-time copy of the query counters.

use std::fmt;

/// Plain values copied out of [`super::QueryMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queries_issued: u64,
    pub responses_published: u64,
    pub stale_discarded: u64,
    pub store_failures: u64,
    pub validation_rejections: u64,
    pub notes_refiltered: u64,
}

impl MetricsSnapshot {
    /// Queries that have neither been published, discarded nor failed.
    pub fn outstanding(&self) -> u64 {
        self.queries_issued.saturating_sub(
            self.responses_published + self.stale_discarded + self.store_failures,
        )
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "queries: {} issued, {} published, {} stale, {} failed, {} invalid; {} notes re-filtered",
            self.queries_issued,
            self.responses_published,
            self.stale_discarded,
            self.store_failures,
            self.validation_rejections,
            self.notes_refiltered
        )
    }
}
