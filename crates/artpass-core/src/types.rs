//! Core data types for Artpass.
//!
//! Event documents arrive as loosely-typed JSON. Each one is coerced once at
//! load time into an [`EventRecord`], which keeps the original document for
//! output alongside typed copies of the fields the index and query engine
//! read. Coercion is best-effort and never fails:
//!
//! - Integers accept JSON integers, floats (truncated), booleans and numeric
//!   strings. Anything else, including an absent field, becomes `0`.
//! - Strings accept strings, numbers and booleans. Anything else becomes `""`.
//!   Strings used as index keys are trimmed.
//! - Coordinates accept numbers and numeric strings, otherwise they are absent.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// A single session (occurrence) of an event at a venue.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Venue identifier, trimmed (may be empty)
    pub platform: String,

    /// Latitude of the venue, if known
    pub latitude: Option<f64>,

    /// Longitude of the venue, if known
    pub longitude: Option<f64>,

    /// Session start in epoch seconds (absent = 0)
    pub start_timestamp: i64,

    /// Session end in epoch seconds (absent = 0)
    pub end_timestamp: i64,
}

impl Session {
    fn from_value(value: &Value) -> Self {
        let fields = value.as_object();
        Session {
            platform: coerce_string(field(fields, "platform")).trim().to_string(),
            latitude: coerce_f64(field(fields, "latitude")),
            longitude: coerce_f64(field(fields, "longitude")),
            start_timestamp: coerce_i64(field(fields, "start_timestamp")),
            end_timestamp: coerce_i64(field(fields, "end_timestamp")),
        }
    }

    /// Both coordinates, when the session carries them.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// An event as stored in the index.
///
/// Serializes back to the exact document it was parsed from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct EventRecord {
    /// Primary key (empty when the document has none)
    pub event_id: String,

    /// Event start in epoch seconds
    pub start_timestamp: i64,

    /// Event end in epoch seconds
    pub end_timestamp: i64,

    /// Trimmed category, empty when absent
    pub category: String,

    /// Trimmed ticket type, empty when absent
    pub ticket_type: String,

    /// Sessions in document order
    pub sessions: Vec<Session>,

    /// Path of the cached image on the image host, empty when absent
    pub local_image_path: String,

    /// The original document
    document: Value,
}

impl EventRecord {
    /// Coerce a JSON document into a record.
    ///
    /// Non-object values are accepted and carry default fields.
    pub fn from_value(document: Value) -> Self {
        let fields = document.as_object();
        let sessions = match field(fields, "sessions") {
            Some(Value::Array(items)) => items.iter().map(Session::from_value).collect(),
            _ => Vec::new(),
        };

        EventRecord {
            event_id: coerce_string(field(fields, "event_id")),
            start_timestamp: coerce_i64(field(fields, "start_timestamp")),
            end_timestamp: coerce_i64(field(fields, "end_timestamp")),
            category: coerce_string(field(fields, "category")).trim().to_string(),
            ticket_type: coerce_string(field(fields, "ticket_type"))
                .trim()
                .to_string(),
            sessions,
            local_image_path: coerce_string(field(fields, "local_image_path")),
            document,
        }
    }

    /// The original JSON document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Grouping key for the event's primary location.
    ///
    /// The first session's platform when non-blank, otherwise its coordinates
    /// rounded to five decimals as `"lat,lon"`, otherwise the empty string.
    pub fn venue_key(&self) -> String {
        let Some(first) = self.sessions.first() else {
            return String::new();
        };
        if !first.platform.is_empty() {
            return first.platform.clone();
        }
        match first.coordinates() {
            Some((lat, lon)) => format!("{:.5},{:.5}", lat, lon),
            None => String::new(),
        }
    }

    /// Public URL of the event image under `base_url`, if the event has one.
    ///
    /// Only the file name of `local_image_path` is used; both `/` and `\`
    /// separators are understood.
    pub fn image_url(&self, base_url: &str) -> Option<String> {
        if self.local_image_path.is_empty() {
            return None;
        }
        let normalized = self.local_image_path.replace('\\', "/");
        let file_name = normalized.rsplit('/').next().unwrap_or_default();
        Some(format!(
            "{}/images/{}",
            base_url.trim_end_matches('/'),
            file_name
        ))
    }

    /// The document with `image_url` filled in for `base_url`.
    pub fn render(&self, base_url: &str) -> Value {
        let mut rendered = self.document.clone();
        if let (Some(url), Value::Object(fields)) = (self.image_url(base_url), &mut rendered) {
            fields.insert("image_url".to_string(), Value::String(url));
        }
        rendered
    }
}

impl From<Value> for EventRecord {
    fn from(document: Value) -> Self {
        EventRecord::from_value(document)
    }
}

impl Serialize for EventRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.document.serialize(serializer)
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event_id)
    }
}

/// A distinct venue with its coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    /// Platform name as written in the source
    pub platform: String,

    pub latitude: f64,

    pub longitude: f64,

    /// Map search link for the coordinates
    pub google_maps_url: String,
}

impl Venue {
    /// Create a venue entry, deriving the map search URL.
    pub fn new(platform: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Venue {
            platform: platform.into(),
            latitude,
            longitude,
            google_maps_url: format!(
                "https://www.google.com/maps/search/?api=1&query={:?},{:?}",
                latitude, longitude
            ),
        }
    }
}

fn field<'a>(fields: Option<&'a Map<String, Value>>, name: &str) -> Option<&'a Value> {
    fields.and_then(|f| f.get(name))
}

fn coerce_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().map(|v| v as i64))
            .unwrap_or(0),
        Some(Value::Bool(b)) => i64::from(*b),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
