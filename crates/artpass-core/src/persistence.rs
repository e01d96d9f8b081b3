//! File access for the events source and the annotation document.
//!
//! The events source is a single JSON document whose top-level value must be
//! an array of event objects. It is only ever read. The annotation document
//! is written with an atomic replace (write to a temp file, then rename) so a
//! crash mid-write never leaves a truncated document behind.

use crate::error::{ArtpassError, Result};
use crate::types::EventRecord;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Modification time of `path`, or `None` if it cannot be read.
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Read and coerce every event in the source document at `path`.
///
/// Fails with [`ArtpassError::Load`] when the file cannot be read, is not
/// valid JSON, or its top-level value is not an array.
pub fn read_events(path: &Path) -> Result<Vec<EventRecord>> {
    let bytes = fs::read(path).map_err(|e| ArtpassError::load(path, e.to_string()))?;
    parse_events(&bytes).map_err(|reason| ArtpassError::load(path, reason))
}

/// Parse an in-memory events document.
fn parse_events(bytes: &[u8]) -> std::result::Result<Vec<EventRecord>, String> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| format!("invalid JSON: {}", e))?;

    match document {
        Value::Array(items) => {
            debug!(events = items.len(), "Parsed events document");
            Ok(items.into_iter().map(EventRecord::from_value).collect())
        }
        other => Err(format!(
            "top-level value must be an array, found {}",
            json_kind(&other)
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path(path);
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }

    fs::rename(&temp_path, path)?;
    debug!(path = %path.display(), "Document written");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_read_events() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.json");
        fs::write(
            &path,
            r#"[{"event_id": "x", "start_timestamp": 100}, {"event_id": "y"}]"#,
        )
        .unwrap();

        let events = read_events(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_id, "x");
        assert_eq!(events[1].start_timestamp, 0);
    }

    #[test]
    fn test_read_events_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_events(&temp_dir.path().join("missing.json"));
        assert!(matches!(result, Err(ArtpassError::Load { .. })));
    }

    #[test]
    fn test_read_events_rejects_non_array() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.json");
        fs::write(&path, r#"{"events": []}"#).unwrap();

        let err = read_events(&path).unwrap_err();
        assert!(err.is_load_error());
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn test_read_events_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.json");
        fs::write(&path, b"not json at all").unwrap();

        assert!(read_events(&path).unwrap_err().is_load_error());
    }

    #[test]
    fn test_modified_time() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.json");
        assert!(modified_time(&path).is_none());

        fs::write(&path, b"[]").unwrap();
        assert!(modified_time(&path).is_some());
    }

    #[test]
    fn test_write_json_atomic() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("doc.json");

        write_json_atomic(&path, &json!({"users": {}})).unwrap();
        write_json_atomic(&path, &json!({"users": {"u1": {}}})).unwrap();

        let written: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"users": {"u1": {}}}));
        assert!(!temp_dir.path().join("nested").join("doc.json.tmp").exists());
    }
}
