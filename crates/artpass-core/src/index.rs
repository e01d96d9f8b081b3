//! Derived lookup structures for an event snapshot.
//!
//! The `EventIndex` is built from a complete, ordered record sequence in a
//! single linear pass and references records by their position in that
//! sequence. It is never updated in place: a new source document produces a
//! new record sequence and a new index, swapped together.
//!
//! ## Architecture
//!
//! - `by_start_desc`: every position, ordered by `start_timestamp` descending
//!   with ties kept in input order
//! - `categories` / `ticket_types`: key -> positions, blank keys are skipped
//! - `venues`: venue key -> positions, the empty key is a valid bucket
//! - `ids`: event id -> first position carrying it
//!
//! Buckets keep first-seen key order and first-to-last position order, so
//! anything that walks them (seeded sampling in particular) is reproducible.

use crate::types::EventRecord;
use std::collections::HashMap;

/// Inverted index from string key to record positions.
///
/// Keys iterate in the order they were first seen.
#[derive(Debug, Clone, Default)]
pub struct Buckets {
    slots: HashMap<String, usize>,
    buckets: Vec<(String, Vec<usize>)>,
}

impl Buckets {
    /// Create an empty set of buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a position to the bucket for `key`.
    pub fn insert(&mut self, key: &str, position: usize) {
        match self.slots.get(key) {
            Some(&slot) => self.buckets[slot].1.push(position),
            None => {
                self.slots.insert(key.to_string(), self.buckets.len());
                self.buckets.push((key.to_string(), vec![position]));
            }
        }
    }

    /// Positions indexed under `key`, empty if the key is unknown.
    pub fn get(&self, key: &str) -> &[usize] {
        self.slots
            .get(key)
            .map(|&slot| self.buckets[slot].1.as_slice())
            .unwrap_or(&[])
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// `(key, positions)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.buckets
            .iter()
            .map(|(key, positions)| (key.as_str(), positions.as_slice()))
    }
}

/// Lookup structures derived from one record sequence.
#[derive(Debug, Clone, Default)]
pub struct EventIndex {
    by_start_desc: Vec<usize>,
    categories: Buckets,
    ticket_types: Buckets,
    venues: Buckets,
    ids: HashMap<String, usize>,
}

impl EventIndex {
    /// Build every lookup structure for `records`.
    pub fn build(records: &[EventRecord]) -> Self {
        let mut by_start_desc: Vec<usize> = (0..records.len()).collect();
        // sort_by is stable, so equal timestamps keep input order
        by_start_desc.sort_by(|&a, &b| {
            records[b]
                .start_timestamp
                .cmp(&records[a].start_timestamp)
        });

        let mut categories = Buckets::new();
        let mut ticket_types = Buckets::new();
        let mut venues = Buckets::new();
        let mut ids = HashMap::with_capacity(records.len());

        for (position, record) in records.iter().enumerate() {
            if !record.category.is_empty() {
                categories.insert(&record.category, position);
            }
            if !record.ticket_type.is_empty() {
                ticket_types.insert(&record.ticket_type, position);
            }
            venues.insert(&record.venue_key(), position);
            if !record.event_id.is_empty() {
                ids.entry(record.event_id.clone()).or_insert(position);
            }
        }

        EventIndex {
            by_start_desc,
            categories,
            ticket_types,
            venues,
            ids,
        }
    }

    /// All positions, most recent start first.
    pub fn by_start_desc(&self) -> &[usize] {
        &self.by_start_desc
    }

    pub fn categories(&self) -> &Buckets {
        &self.categories
    }

    pub fn ticket_types(&self) -> &Buckets {
        &self.ticket_types
    }

    pub fn venues(&self) -> &Buckets {
        &self.venues
    }

    /// Position of the first record with `event_id`.
    pub fn position_of(&self, event_id: &str) -> Option<usize> {
        self.ids.get(event_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_test_records() -> Vec<EventRecord> {
        vec![
            json!({"event_id": "a", "start_timestamp": 100, "category": "music",
                   "ticket_type": "free", "sessions": [{"platform": "Hall"}]}),
            json!({"event_id": "b", "start_timestamp": 300, "category": " ",
                   "sessions": [{"latitude": 1.0, "longitude": 2.0}]}),
            json!({"event_id": "c", "start_timestamp": 200, "category": "art",
                   "ticket_type": "paid", "sessions": [{"platform": "Hall"}]}),
            json!({"event_id": "a", "start_timestamp": 300, "category": "music"}),
            json!({"start_timestamp": 50}),
        ]
        .into_iter()
        .map(EventRecord::from_value)
        .collect()
    }

    #[test]
    fn test_start_desc_order_is_stable() {
        let index = EventIndex::build(&make_test_records());
        assert_eq!(index.by_start_desc(), &[1, 3, 2, 0, 4]);
    }

    #[test]
    fn test_blank_categories_are_skipped() {
        let index = EventIndex::build(&make_test_records());
        assert_eq!(index.categories().get("music"), &[0, 3]);
        assert_eq!(index.categories().get("art"), &[2]);
        assert!(index.categories().get("").is_empty());
        assert_eq!(index.categories().len(), 2);

        assert_eq!(index.ticket_types().get("free"), &[0]);
        assert!(index.ticket_types().get("").is_empty());
    }

    #[test]
    fn test_venue_buckets_include_empty_key() {
        let index = EventIndex::build(&make_test_records());
        let venues: Vec<_> = index.venues().iter().collect();
        assert_eq!(
            venues,
            vec![
                ("Hall", &[0usize, 2][..]),
                ("1.00000,2.00000", &[1][..]),
                ("", &[3, 4][..]),
            ]
        );
    }

    #[test]
    fn test_first_id_wins() {
        let index = EventIndex::build(&make_test_records());
        assert_eq!(index.position_of("a"), Some(0));
        assert_eq!(index.position_of("c"), Some(2));
        assert_eq!(index.position_of("z"), None);
        assert_eq!(index.position_of(""), None);
    }

    #[test]
    fn test_empty_records() {
        let index = EventIndex::build(&[]);
        assert!(index.by_start_desc().is_empty());
        assert!(index.venues().is_empty());
    }
}
