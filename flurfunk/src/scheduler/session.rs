//! Refresh session task and its handles.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{self, JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use super::config::SchedulerConfig;
use super::state::{QueryRequest, RefreshError, ResultSnapshot, SessionState};
use super::timer::DebounceTimer;
use crate::assembler::assemble;
use crate::geo::Coordinate;
use crate::note::Note;
use crate::store::{ProximityStore, StoreError};
use crate::telemetry::QueryMetrics;
use crate::viewport::Viewport;

/// Errors returned by [`SchedulerHandle`] methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The session has shut down.
    #[error("Refresh session is closed")]
    Closed,
}

#[derive(Debug)]
enum Command {
    ViewportChanged(Viewport),
    ForceRefresh {
        viewport: Viewport,
        show_loading: bool,
    },
    UserLocation(Coordinate),
    Flush(oneshot::Sender<()>),
}

/// Cloneable, non-blocking access to a refresh session.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<ResultSnapshot>,
    metrics: Arc<QueryMetrics>,
}

impl SchedulerHandle {
    /// Record a new viewport and (re)start the debounce timer.
    pub fn on_viewport_changed(&self, viewport: Viewport) -> Result<(), SchedulerError> {
        self.send(Command::ViewportChanged(viewport))
    }

    /// Query `viewport` now, skipping the debounce.
    ///
    /// Used after posting a note (`show_loading = false`) and for explicit
    /// pull-to-refresh.
    pub fn force_refresh(
        &self,
        viewport: Viewport,
        show_loading: bool,
    ) -> Result<(), SchedulerError> {
        self.send(Command::ForceRefresh {
            viewport,
            show_loading,
        })
    }

    /// Change where distances for display are measured from.
    ///
    /// Applies to responses assembled after the change.
    pub fn set_user_location(&self, location: Coordinate) -> Result<(), SchedulerError> {
        self.send(Command::UserLocation(location))
    }

    /// Issue a pending debounced query now.
    ///
    /// Returns once the session has handled every command sent before this
    /// one, so the next snapshot read reflects them.
    pub async fn flush(&self) -> Result<(), SchedulerError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(Command::Flush(done_tx))?;
        done_rx.await.map_err(|_| SchedulerError::Closed)
    }

    /// Current published snapshot.
    pub fn snapshot(&self) -> ResultSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that is notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<ResultSnapshot> {
        self.snapshots.clone()
    }

    pub fn metrics(&self) -> Arc<QueryMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn send(&self, command: Command) -> Result<(), SchedulerError> {
        self.commands
            .send(command)
            .map_err(|_| SchedulerError::Closed)
    }
}

/// A running refresh session.
///
/// Created per active viewport observer. Dropping it stops the session.
#[derive(Debug)]
pub struct RefreshScheduler {
    handle: SchedulerHandle,
    cancellation_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// Start a session on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(
        store: Arc<dyn ProximityStore>,
        config: SchedulerConfig,
        user_location: Coordinate,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(ResultSnapshot::default());
        let metrics = Arc::new(QueryMetrics::new());
        let cancellation_token = CancellationToken::new();

        let session = Session::new(
            store,
            config,
            user_location,
            snapshot_tx,
            Arc::clone(&metrics),
        );
        let task = tokio::spawn(session.run(command_rx, cancellation_token.clone()));

        Self {
            handle: SchedulerHandle {
                commands: command_tx,
                snapshots: snapshot_rx,
                metrics,
            },
            cancellation_token,
            task: Some(task),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn on_viewport_changed(&self, viewport: Viewport) -> Result<(), SchedulerError> {
        self.handle.on_viewport_changed(viewport)
    }

    pub fn force_refresh(
        &self,
        viewport: Viewport,
        show_loading: bool,
    ) -> Result<(), SchedulerError> {
        self.handle.force_refresh(viewport, show_loading)
    }

    pub fn set_user_location(&self, location: Coordinate) -> Result<(), SchedulerError> {
        self.handle.set_user_location(location)
    }

    pub async fn flush(&self) -> Result<(), SchedulerError> {
        self.handle.flush().await
    }

    pub fn snapshot(&self) -> ResultSnapshot {
        self.handle.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResultSnapshot> {
        self.handle.subscribe()
    }

    pub fn metrics(&self) -> Arc<QueryMetrics> {
        self.handle.metrics()
    }

    /// Stop the session and wait for its task to finish.
    ///
    /// Queries still running are aborted; their responses are never published.
    pub async fn shutdown(mut self) {
        self.cancellation_token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Refresh session task ended abnormally");
            }
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

/// Result of one store query, tagged with the request that produced it.
struct QueryOutcome {
    request: QueryRequest,
    result: Result<Vec<Note>, StoreError>,
}

/// Session state owned by the task. Only the task mutates it.
struct Session {
    store: Arc<dyn ProximityStore>,
    config: SchedulerConfig,
    metrics: Arc<QueryMetrics>,
    publisher: watch::Sender<ResultSnapshot>,

    user_location: Coordinate,
    latest_viewport: Option<Viewport>,
    timer: DebounceTimer,
    in_flight: JoinSet<QueryOutcome>,
    /// Request behind each running query task, so a task that panics can
    /// still be matched to its sequence number.
    requests: HashMap<task::Id, QueryRequest>,
    /// Running queries that asked for a loading indicator.
    loading: HashSet<u64>,

    /// Last sequence number handed out.
    issued_sequence: u64,
    /// Highest sequence number whose response was accepted.
    accepted_sequence: u64,
    /// Sequence number of the failure currently surfaced, if any.
    error_sequence: Option<u64>,
}

impl Session {
    fn new(
        store: Arc<dyn ProximityStore>,
        config: SchedulerConfig,
        user_location: Coordinate,
        publisher: watch::Sender<ResultSnapshot>,
        metrics: Arc<QueryMetrics>,
    ) -> Self {
        let timer = DebounceTimer::new(config.debounce);
        Self {
            store,
            config,
            metrics,
            publisher,
            user_location,
            latest_viewport: None,
            timer,
            in_flight: JoinSet::new(),
            requests: HashMap::new(),
            loading: HashSet::new(),
            issued_sequence: 0,
            accepted_sequence: 0,
            error_sequence: None,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        cancellation_token: CancellationToken,
    ) {
        tracing::info!(
            store = self.store.name(),
            debounce_ms = self.config.debounce.as_millis() as u64,
            "Refresh session started"
        );

        loop {
            tokio::select! {
                biased;

                _ = cancellation_token.cancelled() => break,

                command = commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command);
                }

                Some(joined) = self.in_flight.join_next_with_id(), if !self.in_flight.is_empty() => {
                    self.on_query_finished(joined);
                }

                _ = self.timer.expired(), if self.timer.is_armed() => {
                    self.on_debounce_expired();
                }
            }
        }

        self.in_flight.abort_all();
        self.requests.clear();
        tracing::info!(
            issued = self.issued_sequence,
            accepted = self.accepted_sequence,
            "Refresh session stopped"
        );
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::ViewportChanged(viewport) => {
                let restarted = self.timer.is_armed();
                self.latest_viewport = Some(viewport);
                self.timer.arm();
                tracing::trace!(center = %viewport.center, restarted, "Viewport changed");
                self.publish_status();
            }
            Command::ForceRefresh {
                viewport,
                show_loading,
            } => {
                self.latest_viewport = Some(viewport);
                self.timer.disarm();
                tracing::debug!(center = %viewport.center, show_loading, "Forced refresh");
                self.issue(viewport, true, show_loading);
            }
            Command::UserLocation(location) => {
                self.user_location = location;
            }
            Command::Flush(done) => {
                if self.timer.is_armed() {
                    self.on_debounce_expired();
                }
                // Caller may have given up waiting
                let _ = done.send(());
            }
        }
    }

    fn on_debounce_expired(&mut self) {
        self.timer.disarm();
        if let Some(viewport) = self.latest_viewport {
            self.issue(viewport, false, true);
        } else {
            self.publish_status();
        }
    }

    /// Allocate a sequence number and start a query for `viewport`.
    fn issue(&mut self, viewport: Viewport, forced: bool, show_loading: bool) {
        self.issued_sequence += 1;
        let sequence = self.issued_sequence;

        let request = QueryRequest {
            center: viewport.center,
            radius_km: self.config.radius.covering_radius_km(&viewport),
            sequence,
        };

        let wire = match self.config.wire.validate(request.center, request.radius_km) {
            Ok(wire) => wire,
            Err(e) => {
                self.metrics.validation_rejected();
                tracing::warn!(
                    sequence,
                    center = %request.center,
                    radius_km = request.radius_km,
                    error = %e,
                    "Refresh rejected before reaching the store"
                );
                self.surface_failure(sequence, RefreshError::Validation(e));
                return;
            }
        };

        self.metrics.query_issued();
        if show_loading {
            self.loading.insert(sequence);
        }

        tracing::debug!(
            sequence,
            center = %request.center,
            radius_km = request.radius_km,
            transmitted_radius_km = wire.transmitted_radius_km(),
            forced,
            "Issuing proximity query"
        );

        let store = Arc::clone(&self.store);
        let task = self.in_flight.spawn(async move {
            let result = store
                .find_within(wire.center, wire.transmitted_radius_km())
                .await;
            QueryOutcome { request, result }
        });
        self.requests.insert(task.id(), request);

        self.publish_status();
    }

    fn on_query_finished(&mut self, joined: Result<(task::Id, QueryOutcome), JoinError>) {
        let outcome = match joined {
            Ok((id, outcome)) => {
                self.requests.remove(&id);
                outcome
            }
            Err(e) => {
                let Some(request) = self.requests.remove(&e.id()) else {
                    tracing::warn!(error = %e, "Unknown proximity query task failed");
                    self.publish_status();
                    return;
                };
                tracing::warn!(
                    sequence = request.sequence,
                    error = %e,
                    "Proximity query task failed"
                );
                // A crashed query is a store failure like any other
                QueryOutcome {
                    request,
                    result: Err(StoreError::unavailable(format!("query task failed: {}", e))),
                }
            }
        };

        self.loading.remove(&outcome.request.sequence);
        self.on_outcome(outcome);
    }

    fn on_outcome(&mut self, outcome: QueryOutcome) {
        let QueryOutcome { request, result } = outcome;
        let sequence = request.sequence;

        if sequence <= self.accepted_sequence {
            self.metrics.stale_discarded();
            tracing::debug!(
                sequence,
                accepted = self.accepted_sequence,
                "Discarding stale response"
            );
            self.publish_status();
            return;
        }

        match result {
            Ok(raw) => self.accept(request, raw),
            Err(e) => {
                self.metrics.store_failed();
                if sequence == self.issued_sequence {
                    tracing::warn!(sequence, error = %e, "Refresh failed");
                    self.surface_failure(sequence, e.into());
                } else {
                    tracing::debug!(
                        sequence,
                        latest = self.issued_sequence,
                        error = %e,
                        "Ignoring failure of superseded query"
                    );
                    self.publish_status();
                }
            }
        }
    }

    /// Publish a response. Sequence and notes change in one step.
    fn accept(&mut self, request: QueryRequest, raw: Vec<Note>) {
        let assembled = assemble(
            &raw,
            request.center,
            request.radius_km,
            self.user_location,
        );
        self.metrics.notes_refiltered(assembled.rejected);
        self.metrics.response_published();

        self.accepted_sequence = request.sequence;
        if self.error_sequence.is_some_and(|s| s < request.sequence) {
            self.error_sequence = None;
        }

        tracing::debug!(
            sequence = request.sequence,
            received = raw.len(),
            published = assembled.notes.len(),
            rejected = assembled.rejected,
            "Published refresh"
        );

        let notes = Arc::new(assembled.notes);
        let (state, in_flight, loading) = self.status();
        let clear_error = self.error_sequence.is_none();

        self.publisher.send_modify(|snapshot| {
            snapshot.sequence = request.sequence;
            snapshot.query = Some(request);
            snapshot.notes = notes;
            snapshot.state = state;
            snapshot.in_flight = in_flight;
            snapshot.loading = loading;
            if clear_error {
                snapshot.last_error = None;
            }
        });
    }

    fn surface_failure(&mut self, sequence: u64, error: RefreshError) {
        self.error_sequence = Some(sequence);
        let (state, in_flight, loading) = self.status();
        self.publisher.send_modify(|snapshot| {
            snapshot.state = state;
            snapshot.in_flight = in_flight;
            snapshot.loading = loading;
            snapshot.last_error = Some(error);
        });
    }

    /// Publish state changes that do not touch the note set.
    fn publish_status(&self) {
        let (state, in_flight, loading) = self.status();
        self.publisher.send_if_modified(|snapshot| {
            let changed = snapshot.state != state
                || snapshot.in_flight != in_flight
                || snapshot.loading != loading;
            snapshot.state = state;
            snapshot.in_flight = in_flight;
            snapshot.loading = loading;
            changed
        });
    }

    fn status(&self) -> (SessionState, usize, bool) {
        let state = if self.timer.is_armed() {
            SessionState::Debouncing
        } else if !self.in_flight.is_empty() {
            SessionState::InFlight
        } else {
            SessionState::Idle
        };
        (state, self.in_flight.len(), !self.loading.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::time::Duration;

    const HERE: Coordinate = Coordinate::new(52.52, 13.405);

    fn scheduler() -> RefreshScheduler {
        RefreshScheduler::spawn(
            Arc::new(InMemoryStore::new()),
            SchedulerConfig::default(),
            HERE,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_viewport_change_enters_debouncing() {
        let scheduler = scheduler();
        scheduler
            .on_viewport_changed(Viewport::around(HERE, 0.01))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(scheduler.snapshot().state, SessionState::Debouncing);

        tokio::time::sleep(Duration::from_millis(600)).await;
        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.state, SessionState::Idle);
        assert_eq!(snapshot.sequence, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_viewport_is_rejected_without_query() {
        let scheduler = scheduler();
        scheduler
            .force_refresh(Viewport::around(HERE, 5.0), true)
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        let snapshot = scheduler.snapshot();
        assert!(matches!(
            snapshot.last_error,
            Some(RefreshError::Validation(_))
        ));
        assert!(!snapshot.has_published());

        let metrics = scheduler.metrics().snapshot();
        assert_eq!(metrics.queries_issued, 0);
        assert_eq!(metrics.validation_rejections, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_skips_remaining_debounce() {
        let scheduler = scheduler();
        let start = tokio::time::Instant::now();

        scheduler
            .on_viewport_changed(Viewport::around(HERE, 0.01))
            .unwrap();
        scheduler.flush().await.unwrap();

        assert_eq!(scheduler.metrics().snapshot().queries_issued, 1);
        assert_ne!(scheduler.snapshot().state, SessionState::Debouncing);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_without_pending_change_issues_nothing() {
        let scheduler = scheduler();
        scheduler.flush().await.unwrap();
        assert_eq!(scheduler.metrics().snapshot().queries_issued, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_reports_closed_after_shutdown() {
        let scheduler = scheduler();
        let handle = scheduler.handle();
        scheduler.shutdown().await;

        assert_eq!(
            handle.on_viewport_changed(Viewport::around(HERE, 0.01)),
            Err(SchedulerError::Closed)
        );
        assert!(handle.is_closed());
    }
}
