//! Per-user passport and favourite lists.
//!
//! Every user has two ordered lists of event ids, each entry stamped with the
//! time it was added. The whole document lives in memory behind a mutex and
//! is written back to disk before any mutation returns.
//!
//! ## Document Format
//!
//! ```json
//! {
//!   "users": {
//!     "u-123": {
//!       "passport": [{"event_id": "e1", "added_at": 1700000000}],
//!       "favourite": []
//!     }
//!   }
//! }
//! ```
//!
//! This store does not know which events exist; callers check that with
//! [`crate::EventStore::contains`] before adding.

use crate::error::{ArtpassError, Result};
use crate::persistence;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, instrument, warn};

/// Which of a user's lists an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Passport,
    Favourite,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Passport => "passport",
            Collection::Favourite => "favourite",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = ArtpassError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "passport" => Ok(Collection::Passport),
            "favourite" | "favorite" => Ok(Collection::Favourite),
            _ => Err(ArtpassError::invalid_argument(format!(
                "unknown collection: {}",
                s
            ))),
        }
    }
}

/// One event in a user's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub event_id: String,

    /// Epoch seconds
    pub added_at: i64,
}

/// Both lists of one user, as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLists {
    #[serde(default)]
    pub passport: Vec<Entry>,

    #[serde(default)]
    pub favourite: Vec<Entry>,
}

impl UserLists {
    fn list(&self, collection: Collection) -> &Vec<Entry> {
        match collection {
            Collection::Passport => &self.passport,
            Collection::Favourite => &self.favourite,
        }
    }

    fn list_mut(&mut self, collection: Collection) -> &mut Vec<Entry> {
        match collection {
            Collection::Passport => &mut self.passport,
            Collection::Favourite => &mut self.favourite,
        }
    }
}

/// A user's profile as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    pub passport: Vec<Entry>,
    pub favourite: Vec<Entry>,
}

/// Result of [`UserStore::add`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOutcome {
    /// False when the event was already in the list
    pub added: bool,

    /// The new entry, or the existing one
    pub entry: Entry,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserDocument {
    users: BTreeMap<String, UserLists>,
}

/// File-backed store of user lists.
pub struct UserStore {
    path: PathBuf,
    document: Mutex<UserDocument>,
}

impl UserStore {
    /// Open the document at `path`, creating it when missing.
    ///
    /// A document that cannot be parsed is replaced by an empty one.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let document = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<UserDocument>(&bytes) {
                Ok(document) => Some(document),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid user data, starting empty");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(ArtpassError::user_data(&path, e.to_string())),
        };

        let document = match document {
            Some(document) => document,
            None => {
                let empty = UserDocument::default();
                persistence::write_json_atomic(&path, &empty)
                    .map_err(|e| ArtpassError::user_data(&path, e.to_string()))?;
                empty
            }
        };

        info!(path = %path.display(), users = document.users.len(), "User data loaded");

        Ok(UserStore {
            path,
            document: Mutex::new(document),
        })
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Both lists for `uid` (empty for unknown users).
    pub fn profile(&self, uid: &str) -> UserProfile {
        let document = self.document.lock();
        let lists = document.users.get(uid).cloned().unwrap_or_default();
        UserProfile {
            uid: uid.to_string(),
            passport: lists.passport,
            favourite: lists.favourite,
        }
    }

    /// One list for `uid` (empty for unknown users).
    pub fn entries(&self, uid: &str, collection: Collection) -> Vec<Entry> {
        let document = self.document.lock();
        document
            .users
            .get(uid)
            .map(|lists| lists.list(collection).clone())
            .unwrap_or_default()
    }

    /// Add `event_id` to a list, doing nothing if it is already there.
    #[instrument(skip(self))]
    pub fn add(&self, uid: &str, collection: Collection, event_id: &str) -> Result<AddOutcome> {
        let mut document = self.document.lock();

        if let Some(existing) = document
            .users
            .get(uid)
            .and_then(|lists| lists.list(collection).iter().find(|e| e.event_id == event_id))
        {
            return Ok(AddOutcome {
                added: false,
                entry: existing.clone(),
            });
        }

        let entry = Entry {
            event_id: event_id.to_string(),
            added_at: Utc::now().timestamp(),
        };
        let is_new_user = !document.users.contains_key(uid);
        document
            .users
            .entry(uid.to_string())
            .or_default()
            .list_mut(collection)
            .push(entry.clone());

        if let Err(e) = self.save(&document) {
            // Undo so memory matches what is on disk
            if is_new_user {
                document.users.remove(uid);
            } else if let Some(lists) = document.users.get_mut(uid) {
                lists.list_mut(collection).pop();
            }
            return Err(e);
        }

        info!(uid = %uid, collection = %collection, event_id = %event_id, "Entry added");
        Ok(AddOutcome { added: true, entry })
    }

    /// Remove `event_id` from a list, returning whether anything was removed.
    #[instrument(skip(self))]
    pub fn remove(&self, uid: &str, collection: Collection, event_id: &str) -> Result<bool> {
        let mut document = self.document.lock();

        let Some(lists) = document.users.get_mut(uid) else {
            return Ok(false);
        };
        let list = lists.list_mut(collection);
        let previous = list.clone();
        list.retain(|e| e.event_id != event_id);
        if list.len() == previous.len() {
            return Ok(false);
        }

        if let Err(e) = self.save(&document) {
            if let Some(lists) = document.users.get_mut(uid) {
                *lists.list_mut(collection) = previous;
            }
            return Err(e);
        }

        info!(uid = %uid, collection = %collection, event_id = %event_id, "Entry removed");
        Ok(true)
    }

    fn save(&self, document: &UserDocument) -> Result<()> {
        persistence::write_json_atomic(&self.path, document)
            .map_err(|e| ArtpassError::user_data(&self.path, e.to_string()))
    }
}

impl fmt::Debug for UserStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStore")
            .field("path", &self.path)
            .field("users", &self.document.lock().users.len())
            .finish()
    }
}
