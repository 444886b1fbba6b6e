//! In-process note store.
//!
//! Holds notes in a `Vec` behind a read-write lock and answers proximity
//! queries with an exact haversine scan. Used by the demo mode of the CLI
//! and by tests.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Duration, Utc};
use parking_lot::RwLock;

use super::{BoxFuture, NotePublisher, ProximityStore, StoreError};
use crate::geo::{distance_km, Coordinate};
use crate::note::{Note, NoteDraft};

/// Notes held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    notes: RwLock<Vec<Note>>,
    next_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `notes`.
    pub fn with_notes(notes: Vec<Note>) -> Self {
        let next_id = notes.len() as u64;
        Self {
            notes: RwLock::new(notes),
            next_id: AtomicU64::new(next_id),
        }
    }

    /// Insert an already-built note.
    pub fn insert(&self, note: Note) {
        self.notes.write().push(note);
    }

    pub fn len(&self) -> usize {
        self.notes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.read().is_empty()
    }

    /// Synchronous form of [`ProximityStore::find_within`].
    pub fn notes_within(&self, center: Coordinate, radius_km: f64) -> Vec<Note> {
        self.notes
            .read()
            .iter()
            .filter(|note| distance_km(center, note.location) <= radius_km)
            .cloned()
            .collect()
    }

    fn allocate_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("note-{}", n)
    }
}

impl ProximityStore for InMemoryStore {
    fn find_within(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> BoxFuture<'_, Result<Vec<Note>, StoreError>> {
        let notes = self.notes_within(center, radius_km);
        Box::pin(async move { Ok(notes) })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

impl NotePublisher for InMemoryStore {
    fn publish(&self, draft: NoteDraft) -> BoxFuture<'_, Result<Note, StoreError>> {
        let note = draft.into_note(self.allocate_id(), Utc::now());
        self.insert(note.clone());
        tracing::debug!(id = %note.id, location = %note.location, "Note stored in memory");
        Box::pin(async move { Ok(note) })
    }
}

/// Five demo notes scattered within a few hundred meters of `center`.
pub fn sample_notes(center: Coordinate) -> Vec<Note> {
    let now = Utc::now();
    let samples: [(&str, f64, f64, i64); 5] = [
        ("Great coffee shop here! ☕", 0.001, 0.001, 15),
        (
            "Anyone know why there are so many sirens around here?",
            -0.0015,
            0.0005,
            30,
        ),
        ("Beautiful sunset from this spot 🌅", 0.002, -0.001, 60),
        ("Free parking available on Main Street!", -0.001, -0.002, 90),
        ("Lost dog spotted - small brown terrier", 0.0025, 0.0015, 120),
    ];

    samples
        .iter()
        .enumerate()
        .map(|(i, (text, d_lat, d_lon, minutes_ago))| {
            Note::new(
                format!("sample-{}", i + 1),
                *text,
                center.offset(*d_lat, *d_lon),
                now - Duration::minutes(*minutes_ago),
            )
        })
        .collect()
}
