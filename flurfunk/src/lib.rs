//! Flurfunk - anonymous, location-tagged notes near the map viewport
//!
//! The library keeps a visible set of notes synchronized with a moving map:
//! viewport changes are debounced, turned into a circular proximity query,
//! sent to a backing store, re-filtered and scored, and published without
//! ever regressing to an older viewport's answer.
//!
//! # Pipeline
//!
//! ```text
//! viewport change ─► scheduler (debounce) ─► viewport (covering radius)
//!                        │
//!                        ▼
//!                  store::ProximityStore ─► assembler ─► ResultSnapshot ─► UI
//! ```
//!
//! # Modules
//!
//! - [`geo`] - coordinates and great-circle distance
//! - [`viewport`] - viewport to search radius
//! - [`note`] - notes, scored notes, draft validation
//! - [`store`] - store traits, wire validation, in-memory and HTTP stores
//! - [`assembler`] - re-filtering and scoring of raw results
//! - [`scheduler`] - the refresh session
//! - [`posting`] - publish a note and refresh
//! - [`telemetry`] - query counters
//! - [`config`] - INI configuration file
//! - [`logging`] - tracing subscriber setup

pub mod assembler;
pub mod config;
pub mod geo;
pub mod logging;
pub mod note;
pub mod posting;
pub mod scheduler;
pub mod store;
pub mod telemetry;
pub mod viewport;

/// Library version, from Cargo metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use geo::{distance_km, format_distance, Coordinate};
pub use note::{format_age, Note, NoteDraft, ScoredNote};
pub use scheduler::{RefreshScheduler, ResultSnapshot, SchedulerConfig, SchedulerHandle};
pub use viewport::{covering_radius_km, Viewport};
