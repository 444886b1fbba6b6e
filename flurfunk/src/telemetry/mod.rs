//! Query telemetry.
//!
//! Lock-free counters for the refresh pipeline. Stale responses are dropped
//! silently by the scheduler; this is where they show up.
//!
//! ```text
//! RefreshScheduler ─────► QueryMetrics ─────► MetricsSnapshot ─────► CLI / logs
//!                        (atomic counters)   (point-in-time copy)
//! ```

mod metrics;
mod snapshot;

pub use metrics::QueryMetrics;
pub use snapshot::MetricsSnapshot;
