//! # Artpass Core Library
//!
//! This crate provides the in-memory event index, query engine and user
//! annotation store behind the Artpass event service. Events are read from a
//! single JSON document that other tooling rewrites in place; the index
//! notices the change on the next query and swaps in a fresh snapshot.
//!
//! ## Architecture
//!
//! - **Types** (`types`): Event records coerced from loosely-typed JSON
//! - **Index** (`index`): Recency ordering and inverted indices per snapshot
//! - **Store** (`store`): Snapshot ownership and modification-time reload
//! - **Search** (`search`): Sampling, lookup and filter queries
//! - **Users** (`users`): File-backed passport and favourite lists
//! - **Persistence** (`persistence`): Source parsing and atomic writes
//! - **Config** (`config`): Configuration management
//!
//! ## Example
//!
//! ```rust,ignore
//! use artpass_core::{EventStore, FilterQuery, SortOrder};
//!
//! let store = EventStore::new("output/events.json");
//! store.warm_up();
//!
//! let query = FilterQuery::new()
//!     .with_categories(["music"])
//!     .with_limit(10)
//!     .with_sort(SortOrder::StartAsc);
//! for event in store.filter(&query)? {
//!     println!("{}", event.event_id);
//! }
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod persistence;
pub mod search;
pub mod store;
pub mod types;
pub mod users;

// Re-export commonly used types
pub use config::Config;
pub use error::{ArtpassError, Result};
pub use index::EventIndex;
pub use search::{FilterQuery, SortOrder, TimeWindow};
pub use store::{EventStore, Snapshot, SnapshotStats};
pub use types::{EventRecord, Session, Venue};
pub use users::{AddOutcome, Collection, Entry, UserProfile, UserStore};
