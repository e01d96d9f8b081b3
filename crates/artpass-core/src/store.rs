//! Event store with modification-time driven reload.
//!
//! The `EventStore` owns the current [`Snapshot`] of the events source and
//! replaces it wholesale whenever the source file's modification time moves
//! past the one recorded for the snapshot. It is designed for concurrent
//! access:
//!
//! - The fresh path is lock-free: one `stat` and one atomic pointer load
//! - Reloads are serialized by a mutex and double-checked, so concurrent
//!   callers that all observe a stale file collapse into a single reparse
//! - Readers hold an `Arc<Snapshot>` for the duration of a query, so a swap
//!   that happens mid-query never mixes records from two versions
//!
//! A failed reload leaves the previous snapshot installed and reports the
//! error only to the caller that attempted it.

use crate::error::Result;
use crate::index::EventIndex;
use crate::persistence;
use crate::search::{FilterQuery, TimeWindow};
use crate::types::{EventRecord, Venue};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, instrument, warn};

/// Candidate count above which window filtering runs on the rayon pool
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10_000;

/// An immutable pairing of the record sequence and its derived index.
pub struct Snapshot {
    records: Vec<EventRecord>,
    index: EventIndex,
    source_modified: Option<SystemTime>,
    generation: u64,
    loaded_at: DateTime<Utc>,
    parallel_threshold: usize,
}

/// Summary of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStats {
    /// Number of events
    pub events: usize,

    /// Distinct non-blank categories
    pub categories: usize,

    /// Distinct non-blank ticket types
    pub ticket_types: usize,

    /// Distinct venue keys, including the empty key
    pub venues: usize,

    /// Reload counter of the store that produced the snapshot
    pub generation: u64,

    /// When the snapshot was built
    pub loaded_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot (and its index) from records in source order.
    pub fn from_records(records: Vec<EventRecord>) -> Self {
        let index = EventIndex::build(&records);
        Snapshot {
            records,
            index,
            source_modified: None,
            generation: 0,
            loaded_at: Utc::now(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    /// Set the candidate count above which filtering goes parallel.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    fn with_source(mut self, modified: Option<SystemTime>, generation: u64) -> Self {
        self.source_modified = modified;
        self.generation = generation;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in source order.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn index(&self) -> &EventIndex {
        &self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            events: self.records.len(),
            categories: self.index.categories().len(),
            ticket_types: self.index.ticket_types().len(),
            venues: self.index.venues().len(),
            generation: self.generation,
            loaded_at: self.loaded_at,
        }
    }

    /// Check whether this snapshot reflects a source observed at `observed`.
    ///
    /// An unreadable source (`None`) keeps the snapshot in service.
    fn is_fresh(&self, observed: Option<SystemTime>) -> bool {
        match (observed, self.source_modified) {
            (None, _) => true,
            (Some(observed), Some(loaded)) => observed <= loaded,
            (Some(_), None) => false,
        }
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("record_count", &self.records.len())
            .field("generation", &self.generation)
            .finish()
    }
}

/// Shared, reloadable view of the events source.
///
/// ## Example
///
/// ```rust,ignore
/// use artpass_core::{EventStore, FilterQuery};
///
/// let store = EventStore::new("output/events.json");
/// let latest = store.recent(5)?;
/// let music = store.filter(&FilterQuery::new().with_categories(["music"]))?;
/// ```
pub struct EventStore {
    /// Path of the events document
    source: PathBuf,

    /// Current snapshot, `None` until the first successful load
    current: ArcSwapOption<Snapshot>,

    /// Serializes reloads
    reload_lock: Mutex<()>,

    /// Number of snapshots installed so far
    generation: AtomicU64,

    parallel_threshold: usize,
}

impl EventStore {
    /// Create a store for the events document at `source`.
    ///
    /// Nothing is read until the first query or [`EventStore::warm_up`].
    pub fn new(source: impl AsRef<Path>) -> Self {
        EventStore {
            source: source.as_ref().to_path_buf(),
            current: ArcSwapOption::empty(),
            reload_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    /// Set the candidate count above which filtering goes parallel.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Path of the events document.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Number of snapshots installed so far (0 before the first load).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// The installed snapshot, without checking the source for changes.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    /// Return a snapshot at least as new as the source file at call entry.
    ///
    /// Reloads when the source modification time has advanced past the one
    /// recorded for the installed snapshot, or when nothing is installed.
    pub fn ensure_loaded(&self) -> Result<Arc<Snapshot>> {
        let observed = persistence::modified_time(&self.source);
        if let Some(current) = self.current.load_full() {
            if current.is_fresh(observed) {
                return Ok(current);
            }
        }

        self.reload()
    }

    #[instrument(skip(self), fields(source = %self.source.display()))]
    fn reload(&self) -> Result<Arc<Snapshot>> {
        let _guard = self.reload_lock.lock();

        // Another caller may have reloaded while we waited for the lock
        let observed = persistence::modified_time(&self.source);
        if let Some(current) = self.current.load_full() {
            if current.is_fresh(observed) {
                debug!(generation = current.generation(), "Snapshot already fresh");
                return Ok(current);
            }
        }

        let records = persistence::read_events(&self.source).map_err(|e| {
            warn!(error = %e, "Reload failed, keeping previous snapshot");
            e
        })?;

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let snapshot = Arc::new(
            Snapshot::from_records(records)
                .with_parallel_threshold(self.parallel_threshold)
                .with_source(observed, generation),
        );
        self.current.store(Some(Arc::clone(&snapshot)));

        let stats = snapshot.stats();
        info!(
            events = stats.events,
            categories = stats.categories,
            ticket_types = stats.ticket_types,
            venues = stats.venues,
            generation = generation,
            "Events snapshot installed"
        );

        Ok(snapshot)
    }

    /// Load the source ahead of the first query.
    ///
    /// Failures are logged, not returned: the next query retries the load.
    pub fn warm_up(&self) -> bool {
        match self.ensure_loaded() {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Events preload failed");
                false
            }
        }
    }

    /// Summary of the current snapshot.
    pub fn stats(&self) -> Result<SnapshotStats> {
        Ok(self.ensure_loaded()?.stats())
    }

    /// See [`Snapshot::random`].
    pub fn random(
        &self,
        amount: usize,
        seed: Option<u64>,
        distinct_venue: bool,
    ) -> Result<Vec<EventRecord>> {
        Ok(self.ensure_loaded()?.random(amount, seed, distinct_venue))
    }

    /// See [`Snapshot::recent`].
    pub fn recent(&self, amount: usize) -> Result<Vec<EventRecord>> {
        Ok(self.ensure_loaded()?.recent(amount))
    }

    /// See [`Snapshot::by_id`].
    pub fn by_id(&self, event_id: &str) -> Result<Option<EventRecord>> {
        Ok(self.ensure_loaded()?.by_id(event_id))
    }

    /// See [`Snapshot::by_ids`].
    pub fn by_ids<S: AsRef<str>>(&self, event_ids: &[S]) -> Result<Vec<EventRecord>> {
        Ok(self.ensure_loaded()?.by_ids(event_ids))
    }

    /// See [`Snapshot::contains`].
    pub fn contains(&self, event_id: &str) -> Result<bool> {
        Ok(self.ensure_loaded()?.contains(event_id))
    }

    /// See [`Snapshot::by_platform`].
    pub fn by_platform(&self, platform: &str, window: TimeWindow) -> Result<Vec<EventRecord>> {
        Ok(self.ensure_loaded()?.by_platform(platform, window))
    }

    /// See [`Snapshot::filter`].
    pub fn filter(&self, query: &FilterQuery) -> Result<Vec<EventRecord>> {
        Ok(self.ensure_loaded()?.filter(query))
    }

    /// See [`Snapshot::venues`].
    pub fn venues(&self) -> Result<Vec<Venue>> {
        Ok(self.ensure_loaded()?.venues())
    }
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore")
            .field("source", &self.source)
            .field("generation", &self.generation())
            .finish()
    }
}
