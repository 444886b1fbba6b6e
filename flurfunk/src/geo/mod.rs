//! Geographic primitives
//!
//! Provides the [`Coordinate`] value type and great-circle distance math
//! shared by the viewport estimator, the result assembler and the stores.

use thiserror::Error;

/// Mean Earth radius used by the haversine formula, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors raised when constructing a coordinate from raw degrees.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Latitude must be between -90 and 90 (got {0})")]
    InvalidLatitude(f64),

    #[error("Longitude must be between -180 and 180 (got {0})")]
    InvalidLongitude(f64),
}

/// A point on the Earth's surface in WGS84 degrees.
///
/// Fields are public so values coming off the wire can be represented before
/// they are checked; use [`Coordinate::validated`] or [`Coordinate::is_valid`]
/// where the range matters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate without range checks.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a coordinate, rejecting out-of-range or non-finite degrees.
    pub fn validated(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        Ok(Self::new(latitude, longitude))
    }

    /// True if both components are within their valid ranges.
    pub fn is_valid(&self) -> bool {
        (MIN_LAT..=MAX_LAT).contains(&self.latitude)
            && (MIN_LON..=MAX_LON).contains(&self.longitude)
    }

    /// Great-circle distance to `other` in kilometers.
    #[inline]
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        distance_km(*self, *other)
    }

    /// Offset this coordinate by the given degree deltas (no wrapping).
    pub fn offset(&self, d_lat: f64, d_lon: f64) -> Self {
        Self::new(self.latitude + d_lat, self.longitude + d_lon)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

/// Great-circle distance between two coordinates using the haversine formula.
///
/// Total over all inputs: the intermediate term is clamped so antipodal points
/// produce `π · R` rather than NaN.
#[inline]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Format a distance for display.
///
/// Below one kilometer the value is shown in whole meters (`"250m"`),
/// otherwise in kilometers with one decimal (`"1.2km"`).
pub fn format_distance(distance_km: f64) -> String {
    if distance_km < 1.0 {
        format!("{}m", (distance_km * 1000.0).round() as i64)
    } else {
        format!("{:.1}km", distance_km)
    }
}
