//! Venues command - list every platform with coordinates.

use crate::app::App;
use crate::OutputFormat;
use artpass_core::Config;

/// Run the venues command.
pub fn run(config: Config, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config);
    let venues = app.events.venues()?;

    match output {
        OutputFormat::Text => {
            for venue in &venues {
                println!(
                    "{} ({:.5}, {:.5})",
                    venue.platform, venue.latitude, venue.longitude
                );
            }

            eprintln!();
            eprintln!("{} venues", venues.len());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&venues)?);
        }
    }

    Ok(())
}
