//! Map viewport and covering-radius estimation.
//!
//! A viewport is the rectangle currently visible on the map. Proximity queries
//! are circular, so the rectangle is reduced to a single search radius around
//! its center.
//!
//! # Algorithm
//!
//! ```text
//! lat_km   = lat_span * km_per_degree
//! lon_km   = lon_span * km_per_degree * cos(center.lat)
//! radius   = max(buffer_factor * sqrt(lat_km² + lon_km²), min_radius_km)
//! ```
//!
//! With the default buffer factor of 0.6 the circle does not reach the
//! rectangle's corners. Smaller queries are preferred over full corner
//! coverage; raise [`RadiusConfig::buffer_factor`] to change that.

use crate::geo::Coordinate;

/// Approximate length of one degree of latitude, in kilometers.
pub const DEFAULT_KM_PER_DEGREE: f64 = 111.0;

/// Fraction of the viewport diagonal used as the search radius.
pub const DEFAULT_RADIUS_BUFFER_FACTOR: f64 = 0.6;

/// Lower bound for any covering radius, in kilometers.
pub const DEFAULT_MIN_RADIUS_KM: f64 = 1.0;

/// The geographic rectangle currently visible on a map.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Center of the visible area.
    pub center: Coordinate,
    /// Visible latitude extent in degrees (> 0).
    pub latitude_span: f64,
    /// Visible longitude extent in degrees (> 0).
    pub longitude_span: f64,
}

impl Viewport {
    /// Create a viewport from its center and spans.
    pub const fn new(center: Coordinate, latitude_span: f64, longitude_span: f64) -> Self {
        Self {
            center,
            latitude_span,
            longitude_span,
        }
    }

    /// A square viewport (equal degree spans) around `center`.
    pub const fn around(center: Coordinate, span: f64) -> Self {
        Self::new(center, span, span)
    }

    /// True if the center is in range and both spans are positive and finite.
    pub fn is_valid(&self) -> bool {
        self.center.is_valid()
            && self.latitude_span.is_finite()
            && self.longitude_span.is_finite()
            && self.latitude_span > 0.0
            && self.longitude_span > 0.0
    }

    /// Covering radius using the default [`RadiusConfig`].
    pub fn covering_radius_km(&self) -> f64 {
        RadiusConfig::default().covering_radius_km(self)
    }
}

/// Constants for converting a viewport into a search radius.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusConfig {
    /// Kilometers per degree of latitude (and of longitude at the equator).
    pub km_per_degree: f64,
    /// Multiplier applied to the bounding-box diagonal.
    pub buffer_factor: f64,
    /// Radius floor in kilometers. There is no upper clamp.
    pub min_radius_km: f64,
}

impl Default for RadiusConfig {
    fn default() -> Self {
        Self {
            km_per_degree: DEFAULT_KM_PER_DEGREE,
            buffer_factor: DEFAULT_RADIUS_BUFFER_FACTOR,
            min_radius_km: DEFAULT_MIN_RADIUS_KM,
        }
    }
}

impl RadiusConfig {
    /// Set the diagonal buffer factor.
    pub fn with_buffer_factor(mut self, factor: f64) -> Self {
        self.buffer_factor = factor;
        self
    }

    /// Set the minimum radius.
    pub fn with_min_radius_km(mut self, km: f64) -> Self {
        self.min_radius_km = km;
        self
    }

    /// Derive a circular search radius that approximately covers `viewport`.
    ///
    /// Deterministic and side-effect free.
    pub fn covering_radius_km(&self, viewport: &Viewport) -> f64 {
        let lat_km = viewport.latitude_span * self.km_per_degree;
        let lon_km = viewport.longitude_span
            * self.km_per_degree
            * viewport.center.latitude.to_radians().cos();

        let diagonal_km = (lat_km * lat_km + lon_km * lon_km).sqrt();

        (diagonal_km * self.buffer_factor).max(self.min_radius_km)
    }
}

/// Covering radius for `viewport` with the default constants.
pub fn covering_radius_km(viewport: &Viewport) -> f64 {
    RadiusConfig::default().covering_radius_km(viewport)
}
