//! Scheduler configuration.

use std::time::Duration;

use crate::store::WireLimits;
use crate::viewport::RadiusConfig;

/// Quiet period after the last viewport change before a query is issued.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Settings for a refresh session.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Debounce delay for viewport changes.
    pub debounce: Duration,
    /// Viewport to radius conversion.
    pub radius: RadiusConfig,
    /// Bounds applied before a request reaches the store.
    pub wire: WireLimits,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            radius: RadiusConfig::default(),
            wire: WireLimits::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_radius(mut self, radius: RadiusConfig) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_wire_limits(mut self, wire: WireLimits) -> Self {
        self.wire = wire;
        self
    }
}
