//! Watch command - drive a refresh session from viewport lines on stdin.
//!
//! Each input line is one of:
//!
//! ```text
//! <lat> <lon> [<span> [<lon_span>]]   viewport moved (debounced)
//! refresh                             query the last viewport now
//! user <lat> <lon>                    move the user
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. Every published
//! result is printed as it arrives.

use clap::Args;
use flurfunk::note::sort_recent_first;
use flurfunk::scheduler::{ResultSnapshot, SessionState};
use flurfunk::{format_distance, Coordinate, Viewport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use super::common::{parse_coordinate, print_notes, ViewArgs, DEFAULT_SPAN};
use crate::error::CliError;
use crate::runner::{CliRunner, GlobalOptions};

/// Arguments for the watch command.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Initial viewport
    #[command(flatten)]
    pub view: ViewArgs,
}

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchInput {
    Viewport(Viewport),
    Refresh,
    User(Coordinate),
}

/// Parse an input line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<WatchInput>, CliError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut words = line.split_whitespace();
    match words.next() {
        Some("refresh") => Ok(Some(WatchInput::Refresh)),
        Some("user") => {
            let numbers = parse_numbers(words)?;
            match numbers.as_slice() {
                [lat, lon] => Ok(Some(WatchInput::User(parse_coordinate(*lat, *lon)?))),
                _ => Err(CliError::InvalidInput(format!(
                    "expected 'user <lat> <lon>', got '{}'",
                    line
                ))),
            }
        }
        Some(_) => {
            let numbers = parse_numbers(line.split_whitespace())?;
            let (lat, lon, lat_span, lon_span) = match numbers.as_slice() {
                [lat, lon] => (*lat, *lon, DEFAULT_SPAN, DEFAULT_SPAN),
                [lat, lon, span] => (*lat, *lon, *span, *span),
                [lat, lon, lat_span, lon_span] => (*lat, *lon, *lat_span, *lon_span),
                _ => {
                    return Err(CliError::InvalidInput(format!(
                        "expected '<lat> <lon> [<span> [<lon_span>]]', got '{}'",
                        line
                    )))
                }
            };
            let viewport = Viewport::new(parse_coordinate(lat, lon)?, lat_span, lon_span);
            if !viewport.is_valid() {
                return Err(CliError::InvalidInput(format!(
                    "viewport spans must be positive, got '{}'",
                    line
                )));
            }
            Ok(Some(WatchInput::Viewport(viewport)))
        }
        None => Ok(None),
    }
}

fn parse_numbers<'a>(words: impl Iterator<Item = &'a str>) -> Result<Vec<f64>, CliError> {
    words
        .map(|w| {
            w.parse::<f64>()
                .map_err(|_| CliError::InvalidInput(format!("'{}' is not a number", w)))
        })
        .collect()
}

/// Run the watch command.
pub async fn run(options: &GlobalOptions, args: WatchArgs) -> Result<(), CliError> {
    let mut viewport = args.view.viewport()?;
    let user = args.view.user_location()?;

    let runner = CliRunner::new(options)?;
    runner.log_startup("watch");

    let backend = runner.create_backend(viewport.center).await?;
    let scheduler = runner.spawn_scheduler(&backend, user);

    println!("Watching {} ({})", viewport.center, backend.description);
    println!("Enter '<lat> <lon> [<span>]', 'refresh' or 'user <lat> <lon>'. Ctrl+D to stop.");
    println!();

    let printer = tokio::spawn(print_updates(scheduler.subscribe()));
    scheduler.force_refresh(viewport, true)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = match parse_line(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match input {
            WatchInput::Viewport(next) => {
                viewport = next;
                scheduler.on_viewport_changed(viewport)?;
            }
            WatchInput::Refresh => scheduler.force_refresh(viewport, true)?,
            WatchInput::User(location) => {
                scheduler.set_user_location(location)?;
                println!("User location set to {}", location);
            }
        }
    }

    // Query any debounced viewport now and let running queries finish
    scheduler.flush().await?;
    let mut updates = scheduler.subscribe();
    let idle = updates.wait_for(|s| s.state == SessionState::Idle);
    if tokio::time::timeout(runner.refresh_timeout(), idle).await.is_err() {
        tracing::warn!("Session still busy at end of input");
    }

    let metrics = scheduler.metrics().snapshot();
    scheduler.shutdown().await;
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "Printer task failed");
    }

    println!();
    println!("Session Summary");
    println!("───────────────");
    println!("  {}", metrics);

    Ok(())
}

/// Print each newly published result or failure until the session closes.
async fn print_updates(mut updates: watch::Receiver<ResultSnapshot>) {
    let mut printed_sequence = 0;
    let mut printed_error = None;

    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();

        if snapshot.sequence > printed_sequence {
            printed_sequence = snapshot.sequence;
            print_snapshot(&snapshot);
        }

        if snapshot.last_error != printed_error {
            if let Some(error) = &snapshot.last_error {
                println!("[refresh failed] {}", error);
            }
            printed_error = snapshot.last_error;
        }
    }
}

fn print_snapshot(snapshot: &ResultSnapshot) {
    match &snapshot.query {
        Some(query) => println!(
            "[#{}] {} notes within {} of {}",
            snapshot.sequence,
            snapshot.notes.len(),
            format_distance(query.radius_km),
            query.center
        ),
        None => println!("[#{}] {} notes", snapshot.sequence, snapshot.notes.len()),
    }

    let mut notes = snapshot.notes.to_vec();
    sort_recent_first(&mut notes);
    print_notes(&notes);
    println!();
}
