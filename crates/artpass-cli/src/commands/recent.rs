//! Recent and hot commands - latest-starting and curated events.

use super::print_events;
use crate::app::App;
use crate::OutputFormat;
use artpass_core::Config;

/// Run the recent command.
pub fn run(config: Config, amount: Option<i64>, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config);

    let amount = app
        .config
        .api
        .clamp_amount(amount, app.config.api.default_recent_amount)?;
    let events = app.events.recent(amount)?;

    print_events(&events, app.base_url(), output)
}

/// Run the hot command.
///
/// Configured IDs that are not in the index are skipped.
pub fn run_hot(config: Config, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config);

    let events = app.events.by_ids(&app.config.api.hot_event_ids)?;
    print_events(&events, app.base_url(), output)
}
