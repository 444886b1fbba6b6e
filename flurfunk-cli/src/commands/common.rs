//! Common types and utilities shared across CLI commands.

use chrono::{DateTime, Utc};
use clap::Args;
use flurfunk::{format_age, format_distance, Coordinate, ScoredNote, Viewport};

use crate::error::CliError;

/// Default viewport span in degrees (about a neighbourhood).
pub const DEFAULT_SPAN: f64 = 0.01;

/// Map position arguments.
#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    /// Latitude of the viewport center
    #[arg(allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude of the viewport center
    #[arg(allow_negative_numbers = true)]
    pub lon: f64,

    /// Viewport latitude span in degrees
    #[arg(long, default_value_t = DEFAULT_SPAN)]
    pub span: f64,

    /// Viewport longitude span in degrees (defaults to --span)
    #[arg(long)]
    pub lon_span: Option<f64>,

    /// Your latitude, for distances (defaults to the viewport center)
    #[arg(long, allow_negative_numbers = true, requires = "user_lon")]
    pub user_lat: Option<f64>,

    /// Your longitude, for distances (defaults to the viewport center)
    #[arg(long, allow_negative_numbers = true, requires = "user_lat")]
    pub user_lon: Option<f64>,
}

impl ViewArgs {
    pub fn center(&self) -> Result<Coordinate, CliError> {
        parse_coordinate(self.lat, self.lon)
    }

    pub fn viewport(&self) -> Result<Viewport, CliError> {
        let viewport = Viewport::new(
            self.center()?,
            self.span,
            self.lon_span.unwrap_or(self.span),
        );
        if !viewport.is_valid() {
            return Err(CliError::InvalidInput(format!(
                "viewport spans must be positive, got {} x {}",
                viewport.latitude_span, viewport.longitude_span
            )));
        }
        Ok(viewport)
    }

    /// User location: explicit `--user-lat/--user-lon`, else the center.
    pub fn user_location(&self) -> Result<Coordinate, CliError> {
        match (self.user_lat, self.user_lon) {
            (Some(lat), Some(lon)) => parse_coordinate(lat, lon),
            _ => self.center(),
        }
    }
}

/// Validate a latitude/longitude pair from user input.
pub fn parse_coordinate(lat: f64, lon: f64) -> Result<Coordinate, CliError> {
    Coordinate::validated(lat, lon).map_err(|e| CliError::InvalidInput(e.to_string()))
}

/// One line per note: age, distance and text.
pub fn format_note_line(scored: &ScoredNote, now: DateTime<Utc>) -> String {
    format!(
        "{:>10}  {:>7}  {}",
        format_age(scored.note.created_at, now),
        format_distance(scored.distance_from_user_km),
        scored.note.text
    )
}

/// Print notes, or a placeholder when there are none.
pub fn print_notes(notes: &[ScoredNote]) {
    if notes.is_empty() {
        println!("  (no notes nearby)");
        return;
    }
    let now = Utc::now();
    for scored in notes {
        println!("  {}", format_note_line(scored, now));
    }
}
