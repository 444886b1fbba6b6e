//! Nearby command - one refresh for a viewport, newest notes first.

use clap::Args;
use flurfunk::format_distance;
use flurfunk::note::sort_recent_first;

use super::common::{print_notes, ViewArgs};
use crate::error::CliError;
use crate::runner::{wait_for_refresh, CliRunner, GlobalOptions};

/// Arguments for the nearby command.
#[derive(Debug, Args)]
pub struct NearbyArgs {
    #[command(flatten)]
    pub view: ViewArgs,
}

/// Run the nearby command.
pub async fn run(options: &GlobalOptions, args: NearbyArgs) -> Result<(), CliError> {
    let viewport = args.view.viewport()?;
    let user = args.view.user_location()?;

    let runner = CliRunner::new(options)?;
    runner.log_startup("nearby");

    let backend = runner.create_backend(viewport.center).await?;
    let scheduler = runner.spawn_scheduler(&backend, user);

    scheduler.force_refresh(viewport, true)?;
    let snapshot = wait_for_refresh(&scheduler, 1, runner.refresh_timeout()).await?;
    scheduler.shutdown().await;

    if let Some(error) = snapshot.last_error {
        return Err(error.into());
    }

    let radius = snapshot
        .query
        .map(|q| q.radius_km)
        .unwrap_or_else(|| runner.config().radius_config().covering_radius_km(&viewport));

    println!(
        "Notes within {} of {} ({})",
        format_distance(radius),
        viewport.center,
        backend.description
    );
    println!();

    let mut notes = snapshot.notes.to_vec();
    sort_recent_first(&mut notes);
    print_notes(&notes);

    Ok(())
}
