//! Status command - show index status and statistics.

use crate::app::App;
use crate::OutputFormat;
use artpass_core::Config;

/// Run the status command.
pub fn run(config: Config, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config);

    let stats = app.events.stats()?;

    if let OutputFormat::Json = output {
        let status = serde_json::json!({
            "source": app.events.source().display().to_string(),
            "userdata": app.config.data.userdata_path.display().to_string(),
            "images_dir": app.config.data.images_dir.display().to_string(),
            "events": stats.events,
            "categories": stats.categories,
            "ticket_types": stats.ticket_types,
            "venues": stats.venues,
            "generation": stats.generation,
            "loaded_at": stats.loaded_at.to_rfc3339(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Artpass Index Status");
    println!("====================");
    println!();

    if stats.events == 0 {
        println!("Index is empty. The events document contains no records.");
    } else {
        println!("Summary:");
        println!("  Total events:  {}", stats.events);
        println!("  Categories:    {}", stats.categories);
        println!("  Ticket types:  {}", stats.ticket_types);
        println!("  Venues:        {}", stats.venues);
    }
    println!("  Generation:    {}", stats.generation);
    println!(
        "  Loaded at:     {}",
        stats.loaded_at.format("%Y-%m-%d %H:%M:%S")
    );

    println!();
    println!("Events file:    {}", app.events.source().display());
    println!("User data file: {}", app.config.data.userdata_path.display());
    println!("Images:         {}", app.config.data.images_dir.display());

    Ok(())
}
