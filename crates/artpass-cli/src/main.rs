//! # Artpass CLI
//!
//! Command-line interface for the Artpass event index.
//!
//! ## Commands
//!
//! - `artpass random` - Sample events, one per venue by default
//! - `artpass recent` - Show the most recently starting events
//! - `artpass search` - Filter by category, ticket type and time window
//! - `artpass event <id>` - Show a single event
//! - `artpass user <uid> ...` - Inspect or edit passport and favourites
//!
//! ## Example Usage
//!
//! ```bash
//! # Three reproducible picks from distinct venues
//! artpass random --amount 3 --seed 42
//!
//! # Free music events from a given time on, as JSON
//! artpass -o json search --category music --ticket-type free --start 1700000000
//!
//! # Stamp an event into a passport
//! artpass user u-123 passport add d891f670-6735-4473-8f5d-8cc897a6e81d
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Artpass - Event index and query tool
#[derive(Parser)]
#[command(name = "artpass")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Events document to query (overrides configuration)
    #[arg(long, global = true)]
    events: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample random events
    Random {
        /// Number of events to return
        #[arg(short, long, allow_hyphen_values = true)]
        amount: Option<i64>,

        /// Seed for a reproducible sample
        #[arg(short, long)]
        seed: Option<u64>,

        /// Allow several events from the same venue
        #[arg(long)]
        any_venue: bool,
    },

    /// Show the events with the latest start time
    Recent {
        /// Number of events to return
        #[arg(short, long, allow_hyphen_values = true)]
        amount: Option<i64>,
    },

    /// Show the curated featured events
    Hot,

    /// List every venue with coordinates
    Venues,

    /// Filter events
    Search {
        /// Accepted category (can be used multiple times)
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Accepted ticket type (can be used multiple times)
        #[arg(short, long = "ticket-type")]
        ticket_types: Vec<String>,

        /// Only events with a session ending at or after this time
        #[arg(long, allow_hyphen_values = true)]
        start: Option<i64>,

        /// Only events with a session starting at or before this time
        #[arg(long, allow_hyphen_values = true)]
        end: Option<i64>,

        /// Maximum number of results (0 = unlimited)
        #[arg(short, long, allow_hyphen_values = true)]
        limit: Option<i64>,

        /// Number of results to skip
        #[arg(long, default_value_t = 0)]
        offset: u32,

        /// Result order
        #[arg(long, default_value = "start_desc", value_parser = ["start_desc", "start_asc"])]
        sort: String,
    },

    /// Show a single event
    Event {
        /// Event ID
        id: String,
    },

    /// Show events at a platform
    Platform {
        /// Platform name (case-insensitive)
        name: String,

        /// Only sessions ending at or after this time
        #[arg(long, allow_hyphen_values = true)]
        start: Option<i64>,

        /// Only sessions starting at or before this time
        #[arg(long, allow_hyphen_values = true)]
        end: Option<i64>,
    },

    /// Show index status and statistics
    Status,

    /// Inspect or edit a user's passport and favourites
    User {
        /// User ID
        uid: String,

        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Show both lists
    Show,

    /// Manage the passport list
    Passport {
        #[command(subcommand)]
        op: ListOp,
    },

    /// Manage the favourites list
    #[command(alias = "favorite")]
    Favourite {
        #[command(subcommand)]
        op: ListOp,
    },
}

#[derive(Subcommand)]
pub enum ListOp {
    /// Show the list
    List,

    /// Add an event to the list
    Add { event_id: String },

    /// Remove an event from the list
    Remove { event_id: String },
}

#[derive(Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => artpass_core::Config::load_from(path)?,
        None => artpass_core::Config::load()?,
    }
    .with_env_overrides();
    if let Some(events) = &cli.events {
        config.data.events_path = events.clone();
    }

    // Setup logging
    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.general.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    let output = cli.output;

    // Execute command
    match cli.command {
        Commands::Random {
            amount,
            seed,
            any_venue,
        } => commands::random::run(config, amount, seed, !any_venue, output),
        Commands::Recent { amount } => commands::recent::run(config, amount, output),
        Commands::Hot => commands::recent::run_hot(config, output),
        Commands::Venues => commands::venues::run(config, output),
        Commands::Search {
            categories,
            ticket_types,
            start,
            end,
            limit,
            offset,
            sort,
        } => commands::search::run(
            config,
            commands::search::SearchArgs {
                categories,
                ticket_types,
                start,
                end,
                limit,
                offset,
                sort,
            },
            output,
        ),
        Commands::Event { id } => commands::event::run(config, &id, output),
        Commands::Platform { name, start, end } => {
            commands::event::run_platform(config, &name, start, end, output)
        }
        Commands::Status => commands::status::run(config, output),
        Commands::User { uid, action } => commands::user::run(config, &uid, action, output),
    }
}
