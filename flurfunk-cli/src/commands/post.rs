//! Post command - publish a note at a location, then show the area.

use clap::Args;
use flurfunk::note::{sort_recent_first, MAX_NOTE_LENGTH};
use flurfunk::posting::post_and_refresh;
use flurfunk::NoteDraft;

use super::common::{print_notes, ViewArgs};
use crate::error::CliError;
use crate::runner::{wait_for_refresh, CliRunner, GlobalOptions};

/// Arguments for the post command.
#[derive(Debug, Args)]
pub struct PostArgs {
    /// Note text (1 to 280 characters)
    pub text: String,

    #[command(flatten)]
    pub view: ViewArgs,
}

/// Run the post command.
pub async fn run(options: &GlobalOptions, args: PostArgs) -> Result<(), CliError> {
    let viewport = args.view.viewport()?;
    let user = args.view.user_location()?;

    // Validate before touching the network
    let draft = NoteDraft::new(&args.text, user)?;

    let runner = CliRunner::new(options)?;
    runner.log_startup("post");

    let backend = runner.create_backend(viewport.center).await?;
    let scheduler = runner.spawn_scheduler(&backend, user);

    let note = post_and_refresh(
        &*backend.publisher,
        &scheduler.handle(),
        draft,
        viewport,
    )
    .await?;

    println!("Posted note {} at {}", note.id, note.location);
    println!(
        "  \"{}\" ({}/{} characters)",
        note.text,
        note.text.encode_utf16().count(),
        MAX_NOTE_LENGTH
    );
    println!();

    let snapshot = wait_for_refresh(&scheduler, 1, runner.refresh_timeout()).await?;
    scheduler.shutdown().await;

    match snapshot.last_error {
        Some(error) => {
            println!("Refresh after posting failed: {}", error);
        }
        None => {
            let mut notes = snapshot.notes.to_vec();
            sort_recent_first(&mut notes);
            println!("Nearby now:");
            print_notes(&notes);
        }
    }

    Ok(())
}
