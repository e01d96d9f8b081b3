//! Event and platform commands - single lookups.

use super::{format_timestamp, print_events, title_of};
use crate::app::App;
use crate::OutputFormat;
use artpass_core::{Config, TimeWindow};

/// Run the event command.
pub fn run(config: Config, id: &str, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config);

    let Some(event) = app.events.by_id(id)? else {
        anyhow::bail!("Event not found: {}", id);
    };

    match output {
        OutputFormat::Text => {
            println!("Event {}", event.event_id);
            println!("  Title:       {}", title_of(&event).unwrap_or("(untitled)"));
            println!("  Category:    {}", event.category);
            println!("  Ticket type: {}", event.ticket_type);
            println!(
                "  Runs:        {} .. {}",
                format_timestamp(event.start_timestamp),
                format_timestamp(event.end_timestamp)
            );
            if let Some(url) = event.image_url(app.base_url()) {
                println!("  Image:       {}", url);
            }

            if !event.sessions.is_empty() {
                println!();
                println!("Sessions:");
                for session in &event.sessions {
                    let location = match session.coordinates() {
                        Some((lat, lon)) => format!(" ({:.5}, {:.5})", lat, lon),
                        None => String::new(),
                    };
                    println!(
                        "  {} .. {}  {}{}",
                        format_timestamp(session.start_timestamp),
                        format_timestamp(session.end_timestamp),
                        session.platform,
                        location
                    );
                }
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&event.render(app.base_url()))?
            );
        }
    }

    Ok(())
}

/// Run the platform command.
pub fn run_platform(
    config: Config,
    name: &str,
    start: Option<i64>,
    end: Option<i64>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let app = App::new(config);

    let events = app
        .events
        .by_platform(name, TimeWindow::new(start, end))?;
    if events.is_empty() {
        anyhow::bail!("No events found at platform: {}", name);
    }

    print_events(&events, app.base_url(), output)
}
