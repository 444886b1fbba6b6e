//! Integration tests for the refresh scheduler.
//!
//! These tests drive a full refresh session against scripted stores:
//! - Debouncing of viewport bursts
//! - Discarding of stale, out-of-order responses
//! - Failure reporting that preserves the published notes
//! - Posting followed by a silent refresh
//!
//! Time is paused, so every delay below is virtual and deterministic.
//!
//! Run with: `cargo test --test refresh_scheduler_integration`

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;

use flurfunk::geo::{distance_km, Coordinate, EARTH_RADIUS_KM};
use flurfunk::note::{sort_recent_first, Note, NoteDraft};
use flurfunk::posting::post_and_refresh;
use flurfunk::scheduler::{
    RefreshError, RefreshScheduler, ResultSnapshot, SchedulerConfig, SessionState,
};
use flurfunk::store::{BoxFuture, InMemoryStore, ProximityStore, StoreError};
use flurfunk::viewport::Viewport;

// ============================================================================
// Helper Functions
// ============================================================================

/// Central Park, New York.
const CENTRAL_PARK: Coordinate = Coordinate::new(40.7829, -73.9654);

/// Berlin Mitte.
const BERLIN: Coordinate = Coordinate::new(52.52, 13.405);

/// A note `km` kilometers due north of `origin`.
fn note_north_of(origin: Coordinate, id: &str, km: f64) -> Note {
    let d_lat = (km / EARTH_RADIUS_KM).to_degrees();
    Note::new(id, format!("note {}", id), origin.offset(d_lat, 0.0), Utc::now())
}

/// A city-block viewport around `center`.
fn small_viewport(center: Coordinate) -> Viewport {
    Viewport::around(center, 0.01)
}

/// One scripted store answer.
struct Step {
    delay: Duration,
    result: Result<Vec<Note>, StoreError>,
    /// Panic instead of answering.
    crash: bool,
}

impl Step {
    fn ok(delay_ms: u64, notes: Vec<Note>) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            result: Ok(notes),
            crash: false,
        }
    }

    fn fail(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            result: Err(StoreError::unavailable("connection reset")),
            crash: false,
        }
    }

    fn crash(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            result: Ok(Vec::new()),
            crash: true,
        }
    }
}

/// Store that answers calls in order from a script, each after its delay.
///
/// Calls beyond the script return an empty result immediately.
#[derive(Default)]
struct ScriptedStore {
    script: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(Coordinate, f64)>>,
}

impl ScriptedStore {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<(Coordinate, f64)> {
        self.requests.lock().clone()
    }
}

impl ProximityStore for ScriptedStore {
    fn find_within(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> BoxFuture<'_, Result<Vec<Note>, StoreError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push((center, radius_km));
        let step = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Step::ok(0, Vec::new()));

        Box::pin(async move {
            tokio::time::sleep(step.delay).await;
            if step.crash {
                panic!("scripted store crashed");
            }
            step.result
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn spawn(store: Arc<ScriptedStore>, user: Coordinate) -> RefreshScheduler {
    RefreshScheduler::spawn(store, SchedulerConfig::default(), user)
}

fn ids(snapshot: &ResultSnapshot) -> Vec<String> {
    snapshot.notes.iter().map(|n| n.note.id.clone()).collect()
}

async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// ============================================================================
// Debounce
// ============================================================================

/// Five viewport changes within 500 ms of each other produce one query,
/// for the last viewport, 500 ms after the last change.
#[tokio::test(start_paused = true)]
async fn test_burst_of_viewport_changes_issues_one_query() {
    let store = Arc::new(ScriptedStore::default());
    let scheduler = spawn(store.clone(), CENTRAL_PARK);

    for i in 0..5 {
        let center = CENTRAL_PARK.offset(0.001 * i as f64, 0.0);
        scheduler
            .on_viewport_changed(small_viewport(center))
            .expect("session should be running");
        settle(100).await;
    }

    // 400 ms after the last change: still waiting
    settle(300).await;
    assert_eq!(store.calls(), 0, "Query must wait for the burst to settle");
    assert_eq!(scheduler.snapshot().state, SessionState::Debouncing);

    settle(200).await;
    assert_eq!(store.calls(), 1, "Exactly one query for the whole burst");

    let (center, _) = store.requests()[0];
    assert_eq!(center, CENTRAL_PARK.offset(0.004, 0.0));

    settle(1000).await;
    assert_eq!(store.calls(), 1);
    assert_eq!(scheduler.metrics().snapshot().queries_issued, 1);
}

/// Changes separated by more than the debounce delay each get a query.
#[tokio::test(start_paused = true)]
async fn test_spaced_viewport_changes_each_query() {
    let store = Arc::new(ScriptedStore::default());
    let scheduler = spawn(store.clone(), BERLIN);

    scheduler.on_viewport_changed(small_viewport(BERLIN)).unwrap();
    settle(600).await;
    scheduler
        .on_viewport_changed(small_viewport(BERLIN.offset(0.01, 0.0)))
        .unwrap();
    settle(600).await;

    assert_eq!(store.calls(), 2);
    assert_eq!(scheduler.snapshot().sequence, 2);
}

/// A viewport change while a query runs does not cancel it; the new
/// viewport is queried after its own debounce.
#[tokio::test(start_paused = true)]
async fn test_change_during_flight_debounces_again() {
    let store = Arc::new(ScriptedStore::new(vec![
        Step::ok(800, vec![note_north_of(BERLIN, "first", 0.1)]),
        Step::ok(10, vec![note_north_of(BERLIN, "second", 0.2)]),
    ]));
    let scheduler = spawn(store.clone(), BERLIN);

    scheduler.on_viewport_changed(small_viewport(BERLIN)).unwrap();
    settle(550).await;
    assert_eq!(store.calls(), 1);
    assert_eq!(scheduler.snapshot().state, SessionState::InFlight);

    scheduler.on_viewport_changed(small_viewport(BERLIN)).unwrap();
    settle(10).await;
    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.state, SessionState::Debouncing);
    assert_eq!(snapshot.in_flight, 1, "First query keeps running");

    // Second query issued at ~1050 ms, answers at ~1060 ms
    settle(600).await;
    let snapshot = scheduler.snapshot();
    assert_eq!(store.calls(), 2);
    assert_eq!(snapshot.sequence, 2);
    assert_eq!(ids(&snapshot), ["second"]);

    // First query answers at ~1300 ms and is discarded
    settle(500).await;
    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.sequence, 2);
    assert_eq!(ids(&snapshot), ["second"]);
    assert_eq!(snapshot.state, SessionState::Idle);
    assert_eq!(scheduler.metrics().snapshot().stale_discarded, 1);
}

// ============================================================================
// Staleness
// ============================================================================

/// A late response for sequence N after N+1 was published changes nothing.
#[tokio::test(start_paused = true)]
async fn test_stale_response_is_discarded() {
    let store = Arc::new(ScriptedStore::new(vec![
        Step::ok(300, vec![note_north_of(BERLIN, "old", 0.1)]),
        Step::ok(10, vec![note_north_of(BERLIN, "new", 0.1)]),
    ]));
    let scheduler = spawn(store.clone(), BERLIN);

    // Sequence 1 answers at ~300 ms, sequence 2 at ~11 ms
    scheduler.force_refresh(small_viewport(BERLIN), true).unwrap();
    settle(1).await;
    scheduler.force_refresh(small_viewport(BERLIN), true).unwrap();

    settle(100).await;
    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.sequence, 2);
    assert_eq!(ids(&snapshot), ["new"]);
    assert!(snapshot.loading, "Sequence 1 still shows the indicator");

    settle(300).await;

    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.sequence, 2, "Published sequence never regresses");
    assert_eq!(ids(&snapshot), ["new"]);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.state, SessionState::Idle);

    let metrics = scheduler.metrics().snapshot();
    assert_eq!(metrics.queries_issued, 2);
    assert_eq!(metrics.responses_published, 1);
    assert_eq!(metrics.stale_discarded, 1);
}

/// Observers see sequence numbers only ever increase.
#[tokio::test(start_paused = true)]
async fn test_published_sequence_is_monotonic() {
    let store = Arc::new(ScriptedStore::new(vec![
        Step::ok(500, vec![]),
        Step::ok(50, vec![]),
        Step::ok(400, vec![]),
        Step::ok(20, vec![]),
    ]));
    let scheduler = spawn(store.clone(), BERLIN);
    let mut updates = scheduler.subscribe();

    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while updates.changed().await.is_ok() {
            let sequence = updates.borrow_and_update().sequence;
            if seen.last() != Some(&sequence) {
                seen.push(sequence);
            }
        }
        seen
    });

    for _ in 0..4 {
        scheduler.force_refresh(small_viewport(BERLIN), false).unwrap();
        settle(5).await;
    }
    settle(1000).await;
    assert_eq!(scheduler.snapshot().sequence, 4);

    scheduler.shutdown().await;
    let seen = observer.await.unwrap();
    assert!(
        seen.windows(2).all(|w| w[0] < w[1]),
        "Sequences regressed: {:?}",
        seen
    );
    assert_eq!(seen.last(), Some(&4));
}

// ============================================================================
// Assembly
// ============================================================================

/// Notes the store returns outside the radius are dropped, and distances
/// are measured from the user rather than the viewport center.
#[tokio::test(start_paused = true)]
async fn test_results_are_refiltered_and_scored() {
    // A 0.04° viewport at Central Park covers ~3.2 km
    let viewport = Viewport::around(CENTRAL_PARK, 0.04);
    assert!(viewport.covering_radius_km() > 3.0);
    assert!(viewport.covering_radius_km() < 5.0);

    let store = Arc::new(ScriptedStore::new(vec![Step::ok(
        0,
        vec![
            note_north_of(CENTRAL_PARK, "a", 0.03),
            note_north_of(CENTRAL_PARK, "b", 0.12),
            note_north_of(CENTRAL_PARK, "c", 6.0),
        ],
    )]));
    let user = CENTRAL_PARK.offset(-0.01, 0.0);
    let scheduler = spawn(store.clone(), user);

    scheduler.force_refresh(viewport, true).unwrap();
    settle(10).await;

    let snapshot = scheduler.snapshot();
    assert_eq!(ids(&snapshot), ["a", "b"]);
    for scored in snapshot.notes.iter() {
        let expected = distance_km(user, scored.note.location);
        assert!((scored.distance_from_user_km - expected).abs() < 1e-12);
    }
    assert_eq!(scheduler.metrics().snapshot().notes_refiltered, 1);
}

/// The store receives a floored radius; the assembler filters with the
/// exact one.
#[tokio::test(start_paused = true)]
async fn test_radius_is_truncated_on_the_wire() {
    let store = Arc::new(ScriptedStore::default());
    let scheduler = spawn(store.clone(), CENTRAL_PARK);
    let viewport = Viewport::around(CENTRAL_PARK, 0.04);

    scheduler.force_refresh(viewport, false).unwrap();
    settle(10).await;

    let (_, transmitted) = store.requests()[0];
    assert_eq!(transmitted, viewport.covering_radius_km().floor());

    let query = scheduler.snapshot().query.expect("query published");
    assert_eq!(query.radius_km, viewport.covering_radius_km());
}

/// Updating the user location changes distances in later refreshes.
#[tokio::test(start_paused = true)]
async fn test_user_location_update_applies_to_next_refresh() {
    let notes = vec![note_north_of(BERLIN, "x", 0.5)];
    let store = Arc::new(ScriptedStore::new(vec![
        Step::ok(0, notes.clone()),
        Step::ok(0, notes),
    ]));
    let scheduler = spawn(store.clone(), BERLIN);

    scheduler.force_refresh(small_viewport(BERLIN), false).unwrap();
    settle(10).await;
    let before = scheduler.snapshot().notes[0].distance_from_user_km;

    scheduler
        .set_user_location(BERLIN.offset(0.1, 0.0))
        .unwrap();
    scheduler.force_refresh(small_viewport(BERLIN), false).unwrap();
    settle(10).await;
    let after = scheduler.snapshot().notes[0].distance_from_user_km;

    assert!(before < 1.0);
    assert!(after > 10.0);
}

// ============================================================================
// Failures
// ============================================================================

/// A store failure keeps the previous notes and surfaces an error.
#[tokio::test(start_paused = true)]
async fn test_store_failure_preserves_published_notes() {
    let store = Arc::new(ScriptedStore::new(vec![
        Step::ok(10, vec![note_north_of(BERLIN, "kept", 0.1)]),
        Step::fail(10),
    ]));
    let scheduler = spawn(store.clone(), BERLIN);

    scheduler.force_refresh(small_viewport(BERLIN), true).unwrap();
    settle(50).await;
    let before = scheduler.snapshot();
    assert_eq!(ids(&before), ["kept"]);
    assert!(before.last_error.is_none());

    scheduler.force_refresh(small_viewport(BERLIN), true).unwrap();
    settle(50).await;
    let after = scheduler.snapshot();

    assert_eq!(after.sequence, before.sequence);
    assert_eq!(ids(&after), ids(&before));
    assert!(matches!(
        after.last_error,
        Some(RefreshError::StoreUnavailable(_))
    ));
    assert_eq!(after.state, SessionState::Idle);
    assert!(!after.loading);
    assert_eq!(store.calls(), 2, "Failures are not retried");
}

/// A later success clears the surfaced error.
#[tokio::test(start_paused = true)]
async fn test_success_after_failure_clears_error() {
    let store = Arc::new(ScriptedStore::new(vec![
        Step::fail(10),
        Step::ok(10, vec![note_north_of(BERLIN, "back", 0.1)]),
    ]));
    let scheduler = spawn(store.clone(), BERLIN);

    scheduler.force_refresh(small_viewport(BERLIN), true).unwrap();
    settle(50).await;
    assert!(scheduler.snapshot().failed());
    assert!(!scheduler.snapshot().has_published());

    scheduler.force_refresh(small_viewport(BERLIN), true).unwrap();
    settle(50).await;
    let snapshot = scheduler.snapshot();
    assert!(!snapshot.failed());
    assert_eq!(ids(&snapshot), ["back"]);
}

/// A failure of a query that has already been superseded is not surfaced.
#[tokio::test(start_paused = true)]
async fn test_superseded_failure_is_not_surfaced() {
    let store = Arc::new(ScriptedStore::new(vec![
        Step::fail(10),
        Step::ok(100, vec![note_north_of(BERLIN, "fresh", 0.1)]),
    ]));
    let scheduler = spawn(store.clone(), BERLIN);

    scheduler.force_refresh(small_viewport(BERLIN), true).unwrap();
    settle(1).await;
    scheduler.force_refresh(small_viewport(BERLIN), true).unwrap();

    settle(50).await;
    assert!(!scheduler.snapshot().failed());

    settle(100).await;
    let snapshot = scheduler.snapshot();
    assert_eq!(ids(&snapshot), ["fresh"]);
    assert_eq!(scheduler.metrics().snapshot().store_failures, 1);
}

/// A query task that panics counts as a store failure: the latest query's
/// crash is surfaced and its loading flag is released.
#[tokio::test(start_paused = true)]
async fn test_crashed_query_is_surfaced_as_failure() {
    let store = Arc::new(ScriptedStore::new(vec![
        Step::ok(200, vec![note_north_of(BERLIN, "slow", 0.1)]),
        Step::crash(10),
    ]));
    let scheduler = spawn(store.clone(), BERLIN);

    scheduler.force_refresh(small_viewport(BERLIN), true).unwrap();
    settle(1).await;
    scheduler.force_refresh(small_viewport(BERLIN), true).unwrap();

    settle(50).await;
    let snapshot = scheduler.snapshot();
    assert!(matches!(
        snapshot.last_error,
        Some(RefreshError::StoreUnavailable(_))
    ));
    assert_eq!(snapshot.in_flight, 1);
    assert!(snapshot.loading, "First query still running");

    settle(500).await;
    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.state, SessionState::Idle);
    assert_eq!(snapshot.in_flight, 0);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.sequence, 1);
    assert_eq!(ids(&snapshot), ["slow"]);
    assert!(snapshot.failed(), "Older answer does not clear the newer failure");
    assert_eq!(scheduler.metrics().snapshot().store_failures, 1);
}

/// A crash of a superseded query is counted but not surfaced.
#[tokio::test(start_paused = true)]
async fn test_crashed_superseded_query_is_not_surfaced() {
    let store = Arc::new(ScriptedStore::new(vec![
        Step::crash(10),
        Step::ok(100, vec![note_north_of(BERLIN, "fresh", 0.1)]),
    ]));
    let scheduler = spawn(store.clone(), BERLIN);

    scheduler.force_refresh(small_viewport(BERLIN), true).unwrap();
    settle(1).await;
    scheduler.force_refresh(small_viewport(BERLIN), true).unwrap();

    settle(50).await;
    let snapshot = scheduler.snapshot();
    assert!(!snapshot.failed());
    assert!(snapshot.loading, "Second query still running");

    settle(100).await;
    let snapshot = scheduler.snapshot();
    assert_eq!(ids(&snapshot), ["fresh"]);
    assert!(!snapshot.loading);
    assert_eq!(scheduler.metrics().snapshot().store_failures, 1);
}

// ============================================================================
// Posting
// ============================================================================

/// Posting a note refreshes without the loading indicator and the new note
/// is visible, newest first.
#[tokio::test(start_paused = true)]
async fn test_post_then_refresh_shows_new_note_first() {
    let mut older = note_north_of(BERLIN, "older", 0.2);
    older.created_at = Utc::now() - chrono::Duration::minutes(5);
    let store = Arc::new(InMemoryStore::with_notes(vec![older]));
    let scheduler =
        RefreshScheduler::spawn(store.clone(), SchedulerConfig::default(), BERLIN);
    let viewport = small_viewport(BERLIN);

    settle(1).await;
    let draft = NoteDraft::new("  Hello from Mitte  ", BERLIN).unwrap();
    let posted = post_and_refresh(&*store, &scheduler.handle(), draft, viewport)
        .await
        .unwrap();
    assert!(!scheduler.snapshot().loading, "Posting refreshes silently");

    settle(10).await;
    let mut notes = scheduler.snapshot().notes.to_vec();
    sort_recent_first(&mut notes);

    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].note.id, posted.id);
    assert_eq!(notes[0].note.text, "Hello from Mitte");
}
