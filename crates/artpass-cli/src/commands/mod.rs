//! Command implementations.

pub mod event;
pub mod random;
pub mod recent;
pub mod search;
pub mod status;
pub mod user;
pub mod venues;

use crate::OutputFormat;
use artpass_core::EventRecord;
use chrono::{DateTime, Utc};

/// Print a list of events in the requested format.
pub fn print_events(events: &[EventRecord], base_url: &str, output: OutputFormat) -> anyhow::Result<()> {
    match output {
        OutputFormat::Text => {
            for event in events {
                println!("{}", summary_line(event));
            }

            eprintln!();
            eprintln!("{} events", events.len());
        }
        OutputFormat::Json => {
            let rendered: Vec<serde_json::Value> =
                events.iter().map(|e| e.render(base_url)).collect();
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }
    }

    Ok(())
}

/// One-line description of an event for text output.
pub fn summary_line(event: &EventRecord) -> String {
    let title = title_of(event).unwrap_or("(untitled)");
    let mut line = format!("{}  {}  {}", format_timestamp(event.start_timestamp), event.event_id, title);

    if !event.category.is_empty() {
        line.push_str(&format!(" [{}]", event.category));
    }
    let venue = event.venue_key();
    if !venue.is_empty() {
        line.push_str(&format!(" @ {}", venue));
    }

    line
}

pub fn title_of(event: &EventRecord) -> Option<&str> {
    event
        .document()
        .get("title")
        .and_then(serde_json::Value::as_str)
        .filter(|t| !t.trim().is_empty())
}

/// Format epoch seconds as a UTC date and time.
pub fn format_timestamp(timestamp: i64) -> String {
    match DateTime::<Utc>::from_timestamp(timestamp, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => timestamp.to_string(),
    }
}
