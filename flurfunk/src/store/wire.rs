//! Wire-level request validation.
//!
//! Requests are checked before they leave the process: latitude in
//! [-90, 90], longitude in [-180, 180], radius in (0, max] km. The deployed
//! store takes a whole-number radius, so fractional radii are floored when
//! truncation is enabled and radii below 1 km are rejected.

use thiserror::Error;

use crate::geo::Coordinate;

/// Largest radius accepted by the store, in kilometers.
pub const DEFAULT_MAX_RADIUS_KM: f64 = 50.0;

/// A request that failed wire validation. Every violation is listed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Validation failed: {}", .0.join("; "))]
pub struct WireValidationError(pub Vec<String>);

/// Bounds enforced on outgoing store requests.
#[derive(Debug, Clone, PartialEq)]
pub struct WireLimits {
    /// Upper bound (inclusive) for the radius.
    pub max_radius_km: f64,
    /// Floor the radius to a whole number before transmission.
    pub truncate_radius: bool,
}

impl Default for WireLimits {
    fn default() -> Self {
        Self {
            max_radius_km: DEFAULT_MAX_RADIUS_KM,
            truncate_radius: true,
        }
    }
}

impl WireLimits {
    pub fn with_max_radius_km(mut self, km: f64) -> Self {
        self.max_radius_km = km;
        self
    }

    pub fn with_truncation(mut self, truncate: bool) -> Self {
        self.truncate_radius = truncate;
        self
    }

    /// Validate a query and produce the request to transmit.
    pub fn validate(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> Result<WireQuery, WireValidationError> {
        let mut errors = Vec::new();

        if !(-90.0..=90.0).contains(&center.latitude) {
            errors.push("Latitude must be between -90 and 90".to_string());
        }
        if !(-180.0..=180.0).contains(&center.longitude) {
            errors.push("Longitude must be between -180 and 180".to_string());
        }
        if radius_km.is_nan() || radius_km <= 0.0 || radius_km > self.max_radius_km {
            errors.push(format!(
                "Radius must be between 0 and {} km",
                self.max_radius_km
            ));
        } else if self.truncate_radius && radius_km < 1.0 {
            // Would be sent as zero
            errors.push("Radius must be at least 1 km when truncated".to_string());
        }

        if !errors.is_empty() {
            return Err(WireValidationError(errors));
        }

        Ok(WireQuery {
            center,
            radius_km,
            truncate: self.truncate_radius,
        })
    }
}

/// A validated store request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireQuery {
    pub center: Coordinate,
    /// Radius as requested, before truncation.
    pub radius_km: f64,
    truncate: bool,
}

impl WireQuery {
    /// Radius as sent to the store.
    pub fn transmitted_radius_km(&self) -> f64 {
        if self.truncate {
            self.radius_km.floor()
        } else {
            self.radius_km
        }
    }
}
