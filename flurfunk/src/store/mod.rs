//! Backing store boundary.
//!
//! The engine consumes a store through a single geospatial primitive,
//! [`ProximityStore::find_within`], and the posting flow through
//! [`NotePublisher::publish`]. Everything about indexing and persistence
//! lives behind these traits.
//!
//! # Distance Contract
//!
//! `find_within` must return every note whose great-circle distance to the
//! center is at most the radius, using [`crate::geo::distance_km`]. Stores
//! that approximate (e.g. bounding boxes) still work because the assembler
//! re-filters, but the extra rows are wasted.
//!
//! # Dyn Compatibility
//!
//! Async methods return [`BoxFuture`] so stores can be shared as
//! `Arc<dyn ProximityStore>`.

mod http;
mod memory;
mod wire;

pub use http::{HttpStore, HttpStoreConfig, DEFAULT_STORE_TIMEOUT, DEFAULT_STORE_URL};
pub use memory::{sample_notes, InMemoryStore};
pub use wire::{WireLimits, WireQuery, WireValidationError, DEFAULT_MAX_RADIUS_KM};

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::geo::Coordinate;
use crate::note::{Note, NoteDraft};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors returned by store operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The request was malformed and never reached (or was refused by) the store.
    #[error(transparent)]
    Validation(#[from] WireValidationError),

    /// Transport or backing-store fault. Recoverable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        StoreError::Unavailable(msg.into())
    }
}

/// Geospatial lookup of notes.
pub trait ProximityStore: Send + Sync {
    /// All stored notes within `radius_km` of `center`, in no particular order.
    fn find_within(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> BoxFuture<'_, Result<Vec<Note>, StoreError>>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Persists new notes.
pub trait NotePublisher: Send + Sync {
    /// Store a validated draft and return the created note.
    fn publish(&self, draft: NoteDraft) -> BoxFuture<'_, Result<Note, StoreError>>;
}
