//! Random command - sample events, one per venue by default.

use super::print_events;
use crate::app::App;
use crate::OutputFormat;
use artpass_core::Config;
use tracing::debug;

/// Run the random command.
pub fn run(
    config: Config,
    amount: Option<i64>,
    seed: Option<u64>,
    distinct_venue: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let app = App::new(config);

    let api = &app.config.api;
    let amount = api.clamp_amount(amount, api.default_random_amount)?;
    let distinct_venue = distinct_venue && api.distinct_venue;
    debug!(amount, ?seed, distinct_venue, "Sampling events");

    let events = app.events.random(amount, seed, distinct_venue)?;
    print_events(&events, app.base_url(), output)
}
