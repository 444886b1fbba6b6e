//! Result assembly: raw store rows to display-ready notes.
//!
//! For every raw note:
//!
//! 1. Distance from the query center is recomputed and notes beyond the
//!    requested radius are dropped. The store's own filtering is not trusted
//!    to use the same metric.
//! 2. Distance from the user is attached for display.
//!
//! Output order follows input order. Sorting is the caller's concern.
//! Assembly is a pure function of its inputs.

use crate::geo::{distance_km, Coordinate};
use crate::note::{Note, ScoredNote};

/// Outcome of one assembly pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    /// Notes inside the radius, in input order.
    pub notes: Vec<ScoredNote>,
    /// How many raw notes were outside the radius.
    pub rejected: usize,
}

/// Filter and score raw store results.
///
/// # Arguments
///
/// * `raw` - Notes returned by the store
/// * `center` - Query center
/// * `radius_km` - Query radius (before any wire truncation)
/// * `user_location` - Where distances for display are measured from
pub fn assemble(
    raw: &[Note],
    center: Coordinate,
    radius_km: f64,
    user_location: Coordinate,
) -> Assembled {
    let mut rejected = 0;
    let notes = raw
        .iter()
        .filter(|note| {
            let inside = distance_km(center, note.location) <= radius_km;
            if !inside {
                rejected += 1;
            }
            inside
        })
        .map(|note| ScoredNote {
            note: note.clone(),
            distance_from_user_km: distance_km(user_location, note.location),
        })
        .collect();

    Assembled { notes, rejected }
}
