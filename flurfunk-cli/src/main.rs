//! Flurfunk CLI
//!
//! Browse and post anonymous notes near a map position.
//!
//! # Commands
//!
//! - `nearby`: show notes around a viewport, newest first
//! - `post`: publish a note and show the refreshed area
//! - `radius`: show the search radius for a viewport
//! - `watch`: follow viewport moves read from stdin
//! - `config`: view and edit `config.ini`
//!
//! `--demo` swaps the HTTP store for an in-memory one seeded with sample
//! notes, so every command works offline.

use clap::{Parser, Subcommand};

mod commands;
mod error;
mod runner;

use error::CliError;
use runner::GlobalOptions;

/// Anonymous, location-tagged notes near your map viewport
#[derive(Parser)]
#[command(name = "flurfunk")]
#[command(version)]
#[command(about = "Anonymous, location-tagged notes near your map viewport")]
#[command(propagate_version = true)]
struct Cli {
    /// Store base URL (overrides store.url from config.ini)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Log debug output to stderr as well as the log file
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use an in-memory store with sample notes instead of the server
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show notes around a position, newest first
    Nearby(commands::nearby::NearbyArgs),

    /// Post a note at a position
    Post(commands::post::PostArgs),

    /// Show the search radius a viewport maps to
    Radius(commands::radius::RadiusArgs),

    /// Refresh continuously from viewport lines on stdin
    ///
    /// Each line is '<lat> <lon> [<span> [<lon_span>]]', 'refresh' or
    /// 'user <lat> <lon>'. Moves are debounced like map drags.
    Watch(commands::watch::WatchArgs),

    /// View and edit configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let options = GlobalOptions {
        url: cli.url,
        verbose: cli.verbose,
        demo: cli.demo,
    };

    if let Err(e) = run(cli.command, &options).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, options: &GlobalOptions) -> Result<(), CliError> {
    match command {
        Commands::Nearby(args) => commands::nearby::run(options, args).await,
        Commands::Post(args) => commands::post::run(options, args).await,
        Commands::Radius(args) => commands::radius::run(args),
        Commands::Watch(args) => commands::watch::run(options, args).await,
        Commands::Config { action } => commands::config::run(action),
    }
}
