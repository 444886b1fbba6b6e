//! Posting flow: publish a note, then refresh the visible area.

use thiserror::Error;

use crate::note::{Note, NoteDraft};
use crate::scheduler::{SchedulerError, SchedulerHandle};
use crate::store::{NotePublisher, StoreError};
use crate::viewport::Viewport;

/// Errors from [`post_and_refresh`].
#[derive(Debug, Error)]
pub enum PostError {
    /// The store rejected or failed to save the note.
    #[error("Failed to post note: {0}")]
    Store(#[from] StoreError),

    /// The note was saved but the refresh could not be requested.
    #[error("Note posted but refresh failed: {0}")]
    Refresh(#[from] SchedulerError),
}

/// Publish `draft` and force a refresh of `viewport` without a loading indicator.
///
/// The refresh is only requested once the store has accepted the note, so
/// the new note is visible in the next published snapshot.
pub async fn post_and_refresh(
    publisher: &dyn NotePublisher,
    scheduler: &SchedulerHandle,
    draft: NoteDraft,
    viewport: Viewport,
) -> Result<Note, PostError> {
    let note = publisher.publish(draft).await?;
    tracing::info!(id = %note.id, location = %note.location, "Note posted");

    scheduler.force_refresh(viewport, false)?;
    Ok(note)
}
