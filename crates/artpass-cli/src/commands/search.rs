//! Search command - filter events by category, ticket type and time.

use super::print_events;
use crate::app::App;
use crate::OutputFormat;
use artpass_core::{Config, FilterQuery, SortOrder, TimeWindow};
use std::time::Instant;

/// Arguments of the search command.
pub struct SearchArgs {
    pub categories: Vec<String>,
    pub ticket_types: Vec<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub limit: Option<i64>,
    pub offset: u32,
    pub sort: String,
}

impl SearchArgs {
    /// Translate the arguments into a query, resolving the limit against
    /// the configured defaults and cap.
    pub fn to_query(&self, config: &Config) -> anyhow::Result<FilterQuery> {
        let mut query = FilterQuery::new()
            .with_categories(self.categories.iter().cloned())
            .with_ticket_types(self.ticket_types.iter().cloned())
            .with_window(TimeWindow::new(self.start, self.end))
            .with_offset(i64::from(self.offset))
            .with_sort(SortOrder::parse(&self.sort));

        if let Some(limit) = config.api.effective_limit(self.limit)? {
            query = query.with_limit(limit);
        }

        Ok(query)
    }
}

/// Run the search command.
pub fn run(config: Config, args: SearchArgs, output: OutputFormat) -> anyhow::Result<()> {
    let app = App::new(config);
    let query = args.to_query(&app.config)?;

    let start = Instant::now();
    let events = app.events.filter(&query)?;
    let elapsed = start.elapsed();

    print_events(&events, app.base_url(), output)?;
    if matches!(output, OutputFormat::Text) {
        eprintln!("Filtered in {:.3}ms", elapsed.as_secs_f64() * 1000.0);
    }

    Ok(())
}
