//! Radius command - show the search radius a viewport would use.

use clap::Args;
use flurfunk::config::ConfigFile;
use flurfunk::format_distance;

use super::common::ViewArgs;
use crate::error::CliError;

/// Arguments for the radius command.
#[derive(Debug, Args)]
pub struct RadiusArgs {
    #[command(flatten)]
    pub view: ViewArgs,
}

/// Run the radius command.
pub fn run(args: RadiusArgs) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let viewport = args.view.viewport()?;

    let radius_km = config.radius_config().covering_radius_km(&viewport);

    println!("Viewport");
    println!("  Center: {}", viewport.center);
    println!(
        "  Span:   {}° x {}°",
        viewport.latitude_span, viewport.longitude_span
    );
    println!();
    println!("Covering radius: {:.3} km ({})", radius_km, format_distance(radius_km));

    match config.wire_limits().validate(viewport.center, radius_km) {
        Ok(query) => {
            println!("Sent to store:   {} km", query.transmitted_radius_km());
        }
        Err(e) => {
            println!("Not queryable:   {}", e);
        }
    }

    Ok(())
}
