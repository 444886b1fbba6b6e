//! Published state of a refresh session.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::geo::Coordinate;
use crate::note::ScoredNote;
use crate::store::{StoreError, WireValidationError};

/// Lifecycle state of a refresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing pending.
    #[default]
    Idle,
    /// Waiting for viewport changes to settle.
    Debouncing,
    /// At least one query is running and no debounce is pending.
    InFlight,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Debouncing => "Debouncing",
            SessionState::InFlight => "InFlight",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A query issued by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryRequest {
    /// Viewport center.
    pub center: Coordinate,
    /// Covering radius before wire truncation.
    pub radius_km: f64,
    /// Strictly increasing per session, starting at 1.
    pub sequence: u64,
}

/// Why the most recent refresh failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RefreshError {
    /// The request was rejected before reaching the store.
    #[error(transparent)]
    Validation(#[from] WireValidationError),

    /// The store could not be reached or failed.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for RefreshError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(v) => RefreshError::Validation(v),
            StoreError::Unavailable(msg) => RefreshError::StoreUnavailable(msg),
        }
    }
}

/// What the UI sees: the current notes plus refresh status.
///
/// Snapshots are replaced as a whole, so `sequence`, `query` and `notes`
/// always belong to the same response.
#[derive(Debug, Clone, Default)]
pub struct ResultSnapshot {
    /// Sequence number of the published response; 0 before the first one.
    pub sequence: u64,
    /// The request the published notes answer.
    pub query: Option<QueryRequest>,
    /// Notes in store order. Sort with [`crate::note::sort_recent_first`].
    pub notes: Arc<Vec<ScoredNote>>,
    pub state: SessionState,
    /// Queries currently running.
    pub in_flight: usize,
    /// A refresh that asked for a loading indicator is still running.
    pub loading: bool,
    /// Set when the latest refresh failed; cleared by a newer success.
    pub last_error: Option<RefreshError>,
}

impl ResultSnapshot {
    pub fn has_published(&self) -> bool {
        self.sequence > 0
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight > 0
    }

    pub fn failed(&self) -> bool {
        self.last_error.is_some()
    }
}
