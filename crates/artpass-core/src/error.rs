//! Error types for Artpass core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while higher-level code can use `anyhow` for
//! convenient error handling.
//!
//! Lookups that find nothing are not errors: they are reported as `None`
//! or an empty result by the query engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ArtpassError
pub type Result<T> = std::result::Result<T, ArtpassError>;

/// Core error types for Artpass operations.
#[derive(Error, Debug)]
pub enum ArtpassError {
    // === Event Source Errors ===
    /// The events document is missing, unreadable, or malformed
    #[error("failed to load events from {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    // === Caller Errors ===
    /// A request parameter was rejected before reaching the index
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // === Annotation Store Errors ===
    /// The user annotation document could not be read or written
    #[error("user data error at {path}: {reason}")]
    UserData { path: PathBuf, reason: String },

    // === Configuration Errors ===
    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// Serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ArtpassError {
    /// Returns true if the events source could not be loaded.
    ///
    /// Front ends map this to a "service unavailable" outcome.
    pub fn is_load_error(&self) -> bool {
        matches!(self, ArtpassError::Load { .. })
    }

    /// Returns true if the caller supplied a rejected parameter
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, ArtpassError::InvalidArgument { .. })
    }

    /// Create a load error
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ArtpassError::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        ArtpassError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a user data error
    pub fn user_data(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ArtpassError::UserData {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ArtpassError {
    fn from(err: serde_json::Error) -> Self {
        ArtpassError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = ArtpassError::load("/srv/events.json", "not an array");
        assert!(err.is_load_error());
        assert!(!err.is_invalid_argument());

        let err = ArtpassError::invalid_argument("amount must be > 0");
        assert!(err.is_invalid_argument());
        assert!(!err.is_load_error());

        let err = ArtpassError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(!err.is_load_error());
    }

    #[test]
    fn test_load_error_message() {
        let err = ArtpassError::load("events.json", "top-level value must be an array");
        assert_eq!(
            err.to_string(),
            "failed to load events from events.json: top-level value must be an array"
        );
    }
}
