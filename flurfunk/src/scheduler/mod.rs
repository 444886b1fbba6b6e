//! Refresh scheduler: keeps the visible note set in step with the map.
//!
//! One session per active viewport observer. The session owns its state and
//! runs as a single tokio task; callers talk to it through a cloneable
//! [`SchedulerHandle`] whose methods never block.
//!
//! # State Machine
//!
//! ```text
//! Idle --viewport changed--> Debouncing
//! Debouncing --viewport changed--> Debouncing (timer replaced)
//! Debouncing --500ms quiet--> InFlight (query N issued)
//! InFlight --viewport changed--> Debouncing (query N keeps running)
//! InFlight --response--> Idle | InFlight
//! any --force_refresh--> InFlight (timer cleared, query issued now)
//! Debouncing --flush--> InFlight (pending query issued now)
//! ```
//!
//! # Ordering
//!
//! Every query gets the next sequence number. A response is published only
//! if its sequence number is higher than the last accepted one; anything
//! older is dropped, logged and counted in [`crate::telemetry`]. Published
//! snapshots therefore never regress to an older viewport, whatever order the
//! store answers in. In-flight queries are never cancelled.
//!
//! # Failures
//!
//! Store failures and rejected requests are surfaced through
//! [`ResultSnapshot::last_error`]. The previously published notes stay in
//! place and nothing is retried; callers decide whether to force a refresh.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use flurfunk::scheduler::{RefreshScheduler, SchedulerConfig};
//! use flurfunk::store::InMemoryStore;
//!
//! let scheduler = RefreshScheduler::spawn(
//!     Arc::new(InMemoryStore::new()),
//!     SchedulerConfig::default(),
//!     user_location,
//! );
//!
//! scheduler.on_viewport_changed(viewport)?;
//! let mut updates = scheduler.subscribe();
//! updates.changed().await?;
//! println!("{} notes", updates.borrow().notes.len());
//! ```

mod config;
mod session;
mod state;
mod timer;

pub use config::{SchedulerConfig, DEFAULT_DEBOUNCE};
pub use session::{RefreshScheduler, SchedulerError, SchedulerHandle};
pub use state::{QueryRequest, RefreshError, ResultSnapshot, SessionState};
pub use timer::DebounceTimer;
