//! Application state management.

use artpass_core::{Config, EventStore, UserStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state.
pub struct App {
    /// Configuration
    pub config: Config,

    /// The event index
    pub events: Arc<EventStore>,
}

impl App {
    /// Create a new application instance.
    ///
    /// The first load is attempted eagerly; a failure here is logged and
    /// surfaces again on the first query.
    pub fn new(config: Config) -> Self {
        let events = Arc::new(
            EventStore::new(&config.data.events_path)
                .with_parallel_threshold(config.performance.parallel_threshold),
        );

        if events.warm_up() {
            info!(
                source = %events.source().display(),
                generation = events.generation(),
                "Application initialized"
            );
        } else {
            warn!(source = %events.source().display(), "Event index not loaded at startup");
        }

        App { config, events }
    }

    /// Open the user annotation store.
    pub fn users(&self) -> anyhow::Result<UserStore> {
        Ok(UserStore::open(&self.config.data.userdata_path)?)
    }

    /// Base URL used when rendering image links.
    pub fn base_url(&self) -> &str {
        &self.config.api.base_url
    }
}
