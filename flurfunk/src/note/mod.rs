//! Notes: the anonymous, location-tagged messages shown on the map.
//!
//! - [`Note`] is created by a store when a draft is published and never
//!   changes afterwards.
//! - [`ScoredNote`] is a note plus its distance from the user. It is derived
//!   on every assembly pass and never persisted.
//! - [`NoteDraft`] is the validated input of the posting flow.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Coordinate;

/// Maximum note length in UTF-16 code units, measured after trimming.
pub const MAX_NOTE_LENGTH: usize = 280;

/// A stored note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Opaque unique identifier assigned by the store.
    pub id: String,
    /// Trimmed note text.
    pub text: String,
    /// Where the note was posted.
    pub location: Coordinate,
    /// When the store accepted the note.
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        location: Coordinate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            location,
            created_at,
        }
    }
}

/// A note enriched with its distance from the user's location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredNote {
    pub note: Note,
    /// Great-circle distance from the user, in kilometers (>= 0).
    pub distance_from_user_km: f64,
}

impl ScoredNote {
    pub fn id(&self) -> &str {
        &self.note.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.note.created_at
    }
}

/// Sort notes newest first. Ties keep their incoming order.
pub fn sort_recent_first(notes: &mut [ScoredNote]) {
    notes.sort_by_key(|n| Reverse(n.note.created_at));
}

/// Format how long ago a note was posted, relative to `now`.
///
/// `"now"` under a minute (and for timestamps ahead of `now`), then
/// `"5m ago"`, `"3h ago"` and `"2d ago"`. From a week on the calendar date
/// is shown instead.
pub fn format_age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at);
    let minutes = elapsed.num_minutes();

    if minutes < 1 {
        "now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d ago", elapsed.num_days())
    } else {
        created_at.format("%Y-%m-%d").to_string()
    }
}

/// Rejected note input. Every violation found is listed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoteError {
    #[error("Invalid note: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl NoteError {
    /// The individual validation messages.
    pub fn messages(&self) -> &[String] {
        match self {
            NoteError::Invalid(messages) => messages,
        }
    }
}

/// Validated input for publishing a new note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteDraft {
    text: String,
    location: Coordinate,
}

impl NoteDraft {
    /// Validate and build a draft.
    ///
    /// The text is trimmed, must not be empty and must fit in
    /// [`MAX_NOTE_LENGTH`] UTF-16 code units. The location must be in range.
    pub fn new(text: &str, location: Coordinate) -> Result<Self, NoteError> {
        let mut errors = Vec::new();
        let trimmed = text.trim();

        if trimmed.is_empty() {
            errors.push("Message cannot be empty".to_string());
        } else if trimmed.encode_utf16().count() > MAX_NOTE_LENGTH {
            errors.push(format!(
                "Message cannot exceed {} characters",
                MAX_NOTE_LENGTH
            ));
        }

        if !(-90.0..=90.0).contains(&location.latitude) {
            errors.push("Latitude must be between -90 and 90".to_string());
        }
        if !(-180.0..=180.0).contains(&location.longitude) {
            errors.push("Longitude must be between -180 and 180".to_string());
        }

        if !errors.is_empty() {
            return Err(NoteError::Invalid(errors));
        }

        Ok(Self {
            text: trimmed.to_string(),
            location,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn location(&self) -> Coordinate {
        self.location
    }

    /// Turn the draft into a stored note with the given identity.
    pub fn into_note(self, id: impl Into<String>, created_at: DateTime<Utc>) -> Note {
        Note::new(id, self.text, self.location, created_at)
    }
}
