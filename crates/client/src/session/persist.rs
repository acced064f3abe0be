//! Durable session persistence.
//!
//! One abstraction (`save`, `load`, `clear`) behind which exactly one
//! mechanism lives: a single JSON file in the configured state directory.
//! An in-memory implementation exists for tests and embedders that manage
//! durability themselves.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors from the persistence layer.
///
/// Restoration treats any of these as "no usable session" and fails open to
/// logged-out; they are never raised past the session store.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session record is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The durable form of a session: token plus profile.
///
/// The role is kept as a plain string so an unrecognized value surfaces as a
/// validation failure during restoration instead of a hard decode error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub user_id: String,
    pub username: String,
    pub role: String,
    pub email: String,
    pub mobile: String,
    pub token: String,
}

/// Durable storage for the session record.
pub trait SessionPersistence: Send + Sync {
    /// Write the record, replacing any previous one.
    fn save(&self, record: &PersistedSession) -> Result<(), PersistError>;

    /// Read the record, or `None` if nothing is stored.
    fn load(&self) -> Result<Option<PersistedSession>, PersistError>;

    /// Remove any stored record. Removing nothing is not an error.
    fn clear(&self) -> Result<(), PersistError>;
}

/// File-backed session store: one JSON file under the state directory.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// File name used under the state directory.
    pub const FILE_NAME: &'static str = "session.json";

    /// Create a store writing to `state_dir/session.json`.
    #[must_use]
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: state_dir.into().join(Self::FILE_NAME),
        }
    }
}

impl SessionPersistence for FileSessionStore {
    fn save(&self, record: &PersistedSession) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(record)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "session persisted");
        Ok(())
    }

    fn load(&self) -> Result<Option<PersistedSession>, PersistError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    fn clear(&self) -> Result<(), PersistError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory session store for tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionPersistence for MemorySessionStore {
    fn save(&self, record: &PersistedSession) -> Result<(), PersistError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(record.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<PersistedSession>, PersistError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn clear(&self) -> Result<(), PersistError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PersistedSession {
        PersistedSession {
            user_id: "u1".to_owned(),
            username: "jo".to_owned(),
            role: "user".to_owned(),
            email: "jo@example.com".to_owned(),
            mobile: "5551234".to_owned(),
            token: "tok-1".to_owned(),
        }
    }

    fn temp_state_dir() -> PathBuf {
        std::env::temp_dir().join(format!("clementine-test-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = temp_state_dir();
        let store = FileSessionStore::new(&dir);

        assert!(store.load().expect("load empty").is_none());

        store.save(&sample_record()).expect("save");
        let loaded = store.load().expect("load").expect("record present");
        assert_eq!(loaded.username, "jo");
        assert_eq!(loaded.token, "tok-1");

        store.clear().expect("clear");
        assert!(store.load().expect("load after clear").is_none());
        // Clearing twice is fine
        store.clear().expect("clear again");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_store_reports_malformed_json() {
        let dir = temp_state_dir();
        let store = FileSessionStore::new(&dir);

        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join(FileSessionStore::FILE_NAME), b"not-json").expect("write garbage");

        assert!(matches!(store.load(), Err(PersistError::Malformed(_))));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemorySessionStore::new();
        store.save(&sample_record()).expect("save");
        assert!(store.load().expect("load").is_some());
        store.clear().expect("clear");
        assert!(store.load().expect("load").is_none());
    }
}
