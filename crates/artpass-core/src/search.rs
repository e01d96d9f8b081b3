//! Query engine over an event snapshot.
//!
//! Every operation here reads a single immutable [`Snapshot`], so a query
//! never straddles two versions of the source document. The operations are:
//!
//! - Random sampling, optionally seeded and optionally one event per venue
//! - Most recent events by start time
//! - Lookup by id and by an ordered list of ids
//! - Events at a platform, optionally within a time window
//! - Multi-predicate filtering with sorting and pagination
//! - Distinct venue listing
//!
//! ## Filtering
//!
//! Values within one predicate family (categories, ticket types) are OR-ed
//! together; the families are AND-ed. Candidate sets are ordered by record
//! position so the result order is well defined before any sort is applied.

use crate::index::Buckets;
use crate::store::Snapshot;
use crate::types::{EventRecord, Session, Venue};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Optional time bounds matched against session spans.
///
/// A span `[start, end]` overlaps the window unless it ends before
/// `start_min` or starts after `end_max`. Omitted bounds are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Lower bound compared against session ends
    pub start_min: Option<i64>,

    /// Upper bound compared against session starts
    pub end_max: Option<i64>,
}

impl TimeWindow {
    pub fn new(start_min: Option<i64>, end_max: Option<i64>) -> Self {
        TimeWindow { start_min, end_max }
    }

    /// A window that matches everything.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start_min.is_none() && self.end_max.is_none()
    }

    /// Check whether the span `[start, end]` overlaps this window.
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        if self.start_min.is_some_and(|min| end < min) {
            return false;
        }
        if self.end_max.is_some_and(|max| start > max) {
            return false;
        }
        true
    }

    /// Check whether any session overlaps this window.
    ///
    /// An unbounded window matches even when there are no sessions.
    pub fn matches_any(&self, sessions: &[Session]) -> bool {
        self.is_unbounded()
            || sessions
                .iter()
                .any(|s| self.overlaps(s.start_timestamp, s.end_timestamp))
    }
}

/// Result ordering for [`FilterQuery`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Latest `start_timestamp` first
    #[default]
    StartDesc,

    /// Earliest `start_timestamp` first
    StartAsc,

    /// No ordering guarantee
    Unspecified,
}

impl SortOrder {
    /// Parse a sort name, mapping anything unrecognized to `Unspecified`.
    pub fn parse(value: &str) -> Self {
        match value {
            "start_desc" => SortOrder::StartDesc,
            "start_asc" => SortOrder::StartAsc,
            _ => SortOrder::Unspecified,
        }
    }
}

impl From<&str> for SortOrder {
    fn from(value: &str) -> Self {
        SortOrder::parse(value)
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::StartDesc => write!(f, "start_desc"),
            SortOrder::StartAsc => write!(f, "start_asc"),
            SortOrder::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// Parameters for [`Snapshot::filter`].
///
/// ## Example
///
/// ```rust
/// use artpass_core::{FilterQuery, SortOrder, TimeWindow};
///
/// let query = FilterQuery::new()
///     .with_categories(["music", "art"])
///     .with_window(TimeWindow::new(Some(1_700_000_000), None))
///     .with_limit(20)
///     .with_sort(SortOrder::StartAsc);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    /// Accepted categories (empty = no category predicate)
    pub categories: Vec<String>,

    /// Accepted ticket types (empty = no ticket type predicate)
    pub ticket_types: Vec<String>,

    /// Session time window
    pub window: TimeWindow,

    /// Maximum results, `None` or `Some(0)` for unlimited
    pub limit: Option<usize>,

    /// Results to skip, negative values count as zero
    pub offset: i64,

    pub sort: SortOrder,
}

impl FilterQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ticket_types<I, S>(mut self, ticket_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ticket_types = ticket_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}

impl Snapshot {
    /// Sample up to `amount` events.
    ///
    /// With `distinct_venue`, venues are shuffled and one event is drawn from
    /// each until `amount` is reached, so fewer results come back when there
    /// are fewer venues. Otherwise positions are sampled without replacement.
    /// A `seed` makes the result reproducible for an unchanged snapshot.
    pub fn random(&self, amount: usize, seed: Option<u64>, distinct_venue: bool) -> Vec<EventRecord> {
        if amount == 0 || self.is_empty() {
            return Vec::new();
        }

        let positions = match seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                if distinct_venue {
                    self.sample_venues(&mut rng, amount)
                } else {
                    let mut all: Vec<usize> = (0..self.len()).collect();
                    all.shuffle(&mut rng);
                    all.truncate(amount);
                    all
                }
            }
            None => {
                let mut rng = rand::rng();
                if distinct_venue {
                    self.sample_venues(&mut rng, amount)
                } else {
                    rand::seq::index::sample(&mut rng, self.len(), amount.min(self.len()))
                        .into_vec()
                }
            }
        };

        self.records_at(positions)
    }

    fn sample_venues<R: Rng + ?Sized>(&self, rng: &mut R, amount: usize) -> Vec<usize> {
        let mut groups: Vec<&[usize]> = self
            .index()
            .venues()
            .iter()
            .map(|(_, positions)| positions)
            .collect();
        groups.shuffle(rng);

        let mut selected = Vec::with_capacity(amount.min(groups.len()));
        for group in groups {
            if let Some(&position) = group.choose(rng) {
                selected.push(position);
                if selected.len() >= amount {
                    break;
                }
            }
        }
        selected
    }

    /// The `amount` events with the latest start time, latest first.
    pub fn recent(&self, amount: usize) -> Vec<EventRecord> {
        self.records_at(self.index().by_start_desc().iter().take(amount).copied())
    }

    /// The first event with `event_id`.
    pub fn by_id(&self, event_id: &str) -> Option<EventRecord> {
        self.index()
            .position_of(event_id)
            .map(|position| self.records()[position].clone())
    }

    /// Events for the requested ids, in request order, skipping unknown ids.
    pub fn by_ids<S: AsRef<str>>(&self, event_ids: &[S]) -> Vec<EventRecord> {
        self.records_at(
            event_ids
                .iter()
                .filter_map(|id| self.index().position_of(id.as_ref())),
        )
    }

    /// Check whether an event with `event_id` exists.
    pub fn contains(&self, event_id: &str) -> bool {
        self.index().position_of(event_id).is_some()
    }

    /// Events with a session at `platform` (case-insensitive, trimmed).
    ///
    /// With a bounded window the matching session itself must overlap it.
    /// Results are ordered by the event's start time, latest first.
    pub fn by_platform(&self, platform: &str, window: TimeWindow) -> Vec<EventRecord> {
        let target = platform.trim().to_lowercase();
        if target.is_empty() {
            return Vec::new();
        }

        let mut matched: Vec<usize> = self
            .records()
            .iter()
            .enumerate()
            .filter(|(_, record)| {
                record.sessions.iter().any(|s| {
                    s.platform.to_lowercase() == target
                        && window.overlaps(s.start_timestamp, s.end_timestamp)
                })
            })
            .map(|(position, _)| position)
            .collect();

        matched.sort_by_key(|&position| Reverse(self.records()[position].start_timestamp));
        self.records_at(matched)
    }

    /// Apply a [`FilterQuery`]: predicate intersection, time window, sort
    /// and pagination, in that order.
    pub fn filter(&self, query: &FilterQuery) -> Vec<EventRecord> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut candidates: Option<BTreeSet<usize>> = None;
        if !query.categories.is_empty() {
            let family = union_of(self.index().categories(), &query.categories);
            candidates = Some(intersect(candidates, family));
        }
        if !query.ticket_types.is_empty() {
            let family = union_of(self.index().ticket_types(), &query.ticket_types);
            candidates = Some(intersect(candidates, family));
        }

        let candidates: Vec<usize> = match candidates {
            Some(set) => set.into_iter().collect(),
            None => (0..self.len()).collect(),
        };

        let mut matched = self.within_window(candidates, query.window);

        match query.sort {
            SortOrder::StartDesc => {
                matched.sort_by_key(|&position| Reverse(self.records()[position].start_timestamp))
            }
            SortOrder::StartAsc => {
                matched.sort_by_key(|&position| self.records()[position].start_timestamp)
            }
            SortOrder::Unspecified => {}
        }

        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = match query.limit {
            None | Some(0) => usize::MAX,
            Some(limit) => limit,
        };

        debug!(
            matched = matched.len(),
            offset = offset,
            sort = %query.sort,
            "Filter evaluated"
        );

        self.records_at(matched.into_iter().skip(offset).take(limit))
    }

    fn within_window(&self, candidates: Vec<usize>, window: TimeWindow) -> Vec<usize> {
        if window.is_unbounded() {
            return candidates;
        }

        let records = self.records();
        if candidates.len() > self.parallel_threshold() {
            candidates
                .into_par_iter()
                .filter(|&position| window.matches_any(&records[position].sessions))
                .collect()
        } else {
            candidates
                .into_iter()
                .filter(|&position| window.matches_any(&records[position].sessions))
                .collect()
        }
    }

    /// One entry per distinct non-blank platform, sorted by name.
    ///
    /// Coordinates come from the first session at that platform that has
    /// both; platforms never seen with coordinates are left out.
    pub fn venues(&self) -> Vec<Venue> {
        let mut venues: BTreeMap<&str, Venue> = BTreeMap::new();

        for session in self.records().iter().flat_map(|r| r.sessions.iter()) {
            if session.platform.is_empty() || venues.contains_key(session.platform.as_str()) {
                continue;
            }
            if let Some((lat, lon)) = session.coordinates() {
                venues.insert(&session.platform, Venue::new(&session.platform, lat, lon));
            }
        }

        venues.into_values().collect()
    }

    fn records_at(&self, positions: impl IntoIterator<Item = usize>) -> Vec<EventRecord> {
        let records = self.records();
        positions
            .into_iter()
            .map(|position| records[position].clone())
            .collect()
    }
}

fn union_of(buckets: &Buckets, keys: &[String]) -> BTreeSet<usize> {
    keys.iter()
        .flat_map(|key| buckets.get(key).iter().copied())
        .collect()
}

fn intersect(current: Option<BTreeSet<usize>>, family: BTreeSet<usize>) -> BTreeSet<usize> {
    match current {
        None => family,
        Some(current) => current.intersection(&family).copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::HashSet;

    fn snapshot(documents: Vec<Value>) -> Snapshot {
        Snapshot::from_records(documents.into_iter().map(EventRecord::from_value).collect())
    }

    fn ids(records: &[EventRecord]) -> Vec<&str> {
        records.iter().map(|r| r.event_id.as_str()).collect()
    }

    fn session(platform: &str, start: i64, end: i64) -> Value {
        json!({"platform": platform, "start_timestamp": start, "end_timestamp": end})
    }

    fn make_catalog() -> Snapshot {
        snapshot(vec![
            json!({"event_id": "e0", "start_timestamp": 500, "category": "music", "ticket_type": "free",
                   "sessions": [session("Hall", 500, 600)]}),
            json!({"event_id": "e1", "start_timestamp": 100, "category": "art", "ticket_type": "paid",
                   "sessions": [session("Gallery", 100, 150)]}),
            json!({"event_id": "e2", "start_timestamp": 300, "category": "music", "ticket_type": "paid",
                   "sessions": [session("Park", 300, 400), session("hall", 900, 950)]}),
            json!({"event_id": "e3", "start_timestamp": 200, "category": "film", "ticket_type": "free",
                   "sessions": [session("Cinema", 200, 260)]}),
            json!({"event_id": "e4", "start_timestamp": 400, "category": "art"}),
            json!({"event_id": "e5", "start_timestamp": 300, "ticket_type": "free",
                   "sessions": [session("Gallery", 1000, 1100)]}),
        ])
    }

    #[test]
    fn test_basic_example() {
        let snap = snapshot(vec![
            json!({"event_id": "x", "start_timestamp": 100, "category": "music"}),
            json!({"event_id": "y", "start_timestamp": 200, "category": "art"}),
        ]);

        let filtered = snap.filter(&FilterQuery::new().with_categories(["music"]));
        assert_eq!(ids(&filtered), vec!["x"]);
        assert_eq!(ids(&snap.recent(1)), vec!["y"]);
        assert!(snap.by_id("z").is_none());
    }

    #[test]
    fn test_recent_is_sorted_prefix() {
        let snap = make_catalog();
        for n in 0..8 {
            let current = snap.recent(n);
            let next = snap.recent(n + 1);
            assert_eq!(current.len(), n.min(snap.len()));
            assert_eq!(&next[..current.len()], &current[..]);
            assert!(current
                .windows(2)
                .all(|w| w[0].start_timestamp >= w[1].start_timestamp));
        }
        // e2 and e5 share a start time and keep input order
        assert_eq!(ids(&snap.recent(6)), vec!["e0", "e4", "e2", "e5", "e3", "e1"]);
    }

    #[test]
    fn test_recent_zero() {
        assert!(make_catalog().recent(0).is_empty());
    }

    #[test]
    fn test_by_id_first_wins() {
        let snap = snapshot(vec![
            json!({"event_id": "dup", "category": "first"}),
            json!({"event_id": "dup", "category": "second"}),
        ]);
        assert_eq!(snap.by_id("dup").unwrap().category, "first");
        assert!(snap.contains("dup"));
        assert!(!snap.contains("missing"));
        assert!(!snap.contains(""));
    }

    #[test]
    fn test_by_ids_keeps_request_order() {
        let snap = make_catalog();
        let result = snap.by_ids(&["e3", "nope", "e0", "e3"]);
        assert_eq!(ids(&result), vec!["e3", "e0", "e3"]);

        let result = snap.by_ids(&["e1".to_string(), "missing".to_string(), "e2".to_string()]);
        assert_eq!(ids(&result), vec!["e1", "e2"]);

        let empty: [&str; 0] = [];
        assert!(snap.by_ids(&empty).is_empty());
    }

    #[test]
    fn test_filter_or_within_and_across_families() {
        let snap = make_catalog();

        let result = snap.filter(&FilterQuery::new().with_categories(["music", "film"]));
        assert_eq!(ids(&result), vec!["e0", "e2", "e3"]);

        let result = snap.filter(
            &FilterQuery::new()
                .with_categories(["music", "film"])
                .with_ticket_types(["free"]),
        );
        assert_eq!(ids(&result), vec!["e0", "e3"]);

        let result = snap.filter(&FilterQuery::new().with_categories(["unknown"]));
        assert!(result.is_empty());

        let result = snap.filter(&FilterQuery::new().with_categories(["unknown", "art"]));
        assert_eq!(ids(&result), vec!["e4", "e1"]);
    }

    #[test]
    fn test_filter_blank_category_never_matches() {
        let snap = make_catalog();
        let result = snap.filter(&FilterQuery::new().with_categories([""]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_filter_without_predicates_returns_all() {
        let snap = make_catalog();
        let result = snap.filter(&FilterQuery::new());
        assert_eq!(result.len(), 6);
    }

    #[test]
    fn test_filter_timeframe() {
        let snap = make_catalog();

        // e4 has no sessions, so any bound excludes it
        let result = snap.filter(&FilterQuery::new().with_window(TimeWindow::new(Some(0), None)));
        assert_eq!(ids(&result), vec!["e0", "e2", "e5", "e3", "e1"]);

        let result =
            snap.filter(&FilterQuery::new().with_window(TimeWindow::new(Some(450), Some(950))));
        assert_eq!(ids(&result), vec!["e0", "e2"]);

        let result = snap.filter(&FilterQuery::new().with_window(TimeWindow::new(None, Some(150))));
        assert_eq!(ids(&result), vec!["e1"]);
    }

    #[test]
    fn test_sort_changes_order_not_membership() {
        let snap = make_catalog();
        let base = FilterQuery::new().with_ticket_types(["free", "paid"]);

        let desc = snap.filter(&base.clone().with_sort(SortOrder::StartDesc));
        let asc = snap.filter(&base.clone().with_sort(SortOrder::StartAsc));
        let unspecified = snap.filter(&base.with_sort(SortOrder::parse("bogus")));

        assert_eq!(ids(&desc), vec!["e0", "e2", "e5", "e3", "e1"]);
        assert_eq!(ids(&asc), vec!["e1", "e3", "e2", "e5", "e0"]);

        let as_set = |r: &[EventRecord]| -> HashSet<String> {
            r.iter().map(|e| e.event_id.clone()).collect()
        };
        assert_eq!(as_set(&desc), as_set(&asc));
        assert_eq!(as_set(&desc), as_set(&unspecified));
    }

    #[test]
    fn test_pagination() {
        let snap = make_catalog();
        let base = FilterQuery::new().with_window(TimeWindow::new(Some(0), None));

        let all = snap.filter(&base);
        assert_eq!(all.len(), 5);

        let page = snap.filter(&base.clone().with_limit(2).with_offset(1));
        assert_eq!(ids(&page), ids(&all[1..3]));

        let page = snap.filter(&base.clone().with_offset(-3).with_limit(1));
        assert_eq!(ids(&page), ids(&all[..1]));

        let page = snap.filter(&base.clone().with_offset(2).with_limit(0));
        assert_eq!(ids(&page), ids(&all[2..]));

        assert!(snap.filter(&base.with_offset(10)).is_empty());
    }

    #[test]
    fn test_parallel_window_matches_sequential() {
        let documents: Vec<Value> = (0..200)
            .map(|i| {
                json!({"event_id": format!("e{i}"), "start_timestamp": i,
                       "sessions": [session("Hall", i, i + 10)]})
            })
            .collect();
        let records: Vec<EventRecord> = documents.into_iter().map(EventRecord::from_value).collect();
        let sequential = Snapshot::from_records(records.clone());
        let parallel = Snapshot::from_records(records).with_parallel_threshold(10);

        let query = FilterQuery::new()
            .with_window(TimeWindow::new(Some(50), Some(120)))
            .with_sort(SortOrder::Unspecified);
        assert_eq!(sequential.filter(&query), parallel.filter(&query));
        assert_eq!(sequential.filter(&query).len(), 81);
    }

    #[test]
    fn test_by_platform() {
        let snap = make_catalog();

        let result = snap.by_platform("  HALL ", TimeWindow::unbounded());
        assert_eq!(ids(&result), vec!["e0", "e2"]);

        // only the Hall session of e2 is checked against the window
        let result = snap.by_platform("hall", TimeWindow::new(Some(700), None));
        assert_eq!(ids(&result), vec!["e2"]);

        let result = snap.by_platform("gallery", TimeWindow::new(None, Some(500)));
        assert_eq!(ids(&result), vec!["e1"]);

        assert!(snap.by_platform("   ", TimeWindow::unbounded()).is_empty());
        assert!(snap.by_platform("nowhere", TimeWindow::unbounded()).is_empty());
    }

    #[test]
    fn test_venues() {
        let snap = snapshot(vec![
            json!({"sessions": [{"platform": "Zoo", "latitude": 1.5, "longitude": 2.5}]}),
            json!({"sessions": [{"platform": "Atrium"},
                                {"platform": "Atrium", "latitude": 3.0, "longitude": 4.0}]}),
            json!({"sessions": [{"platform": "Zoo", "latitude": 9.0, "longitude": 9.0},
                                {"platform": "", "latitude": 1.0, "longitude": 1.0},
                                {"platform": "Nowhere"}]}),
        ]);

        let venues = snap.venues();
        let names: Vec<&str> = venues.iter().map(|v| v.platform.as_str()).collect();
        assert_eq!(names, vec!["Atrium", "Zoo"]);
        assert_eq!((venues[0].latitude, venues[0].longitude), (3.0, 4.0));
        assert_eq!((venues[1].latitude, venues[1].longitude), (1.5, 2.5));
        assert!(venues[1].google_maps_url.ends_with("query=1.5,2.5"));
    }

    #[test]
    fn test_random_seeded_is_deterministic() {
        let snap = make_catalog();
        for distinct in [false, true] {
            let first = snap.random(3, Some(42), distinct);
            let second = snap.random(3, Some(42), distinct);
            assert_eq!(first, second);
            assert_eq!(first.len(), 3);
        }
    }

    #[test]
    fn test_random_without_venue_limit() {
        let snap = make_catalog();
        let result = snap.random(100, None, false);
        assert_eq!(result.len(), 6);
        let unique: HashSet<&str> = result.iter().map(|r| r.event_id.as_str()).collect();
        assert_eq!(unique.len(), 6);

        let result = snap.random(4, Some(7), false);
        let unique: HashSet<&str> = result.iter().map(|r| r.event_id.as_str()).collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_random_distinct_venue() {
        let snap = make_catalog();
        for seed in [None, Some(1), Some(2), Some(3)] {
            let result = snap.random(10, seed, true);
            // Hall, Gallery, Park, Cinema and the empty key
            assert_eq!(result.len(), 5);
            let keys: HashSet<String> = result.iter().map(|r| r.venue_key()).collect();
            assert_eq!(keys.len(), result.len());
        }
    }

    #[test]
    fn test_random_empty_cases() {
        let snap = make_catalog();
        assert!(snap.random(0, Some(1), true).is_empty());
        assert!(snap.random(0, None, false).is_empty());

        let empty = snapshot(Vec::new());
        assert!(empty.random(5, None, true).is_empty());
        assert!(empty.recent(5).is_empty());
        assert!(empty.filter(&FilterQuery::new()).is_empty());
        assert!(empty.venues().is_empty());
    }

    #[test]
    fn test_time_window() {
        let window = TimeWindow::new(Some(100), Some(200));
        assert!(window.overlaps(50, 100));
        assert!(window.overlaps(200, 300));
        assert!(!window.overlaps(50, 99));
        assert!(!window.overlaps(201, 300));

        assert!(TimeWindow::unbounded().matches_any(&[]));
        assert!(!TimeWindow::new(None, Some(5)).matches_any(&[]));
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("start_desc"), SortOrder::StartDesc);
        assert_eq!(SortOrder::from("start_asc"), SortOrder::StartAsc);
        assert_eq!(SortOrder::parse("START_ASC"), SortOrder::Unspecified);
        assert_eq!(SortOrder::default().to_string(), "start_desc");
    }
}
