//! Session Storage - Persistence layer for the login record
//!
//! The store holds exactly three keys (`token`, `user`, `loginTime`) and
//! must drop all of them together.

use super::PersistedSession;
use crate::{AccessError, AccessResult};
use parcelgate_core::storage_error;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Persistent client storage for the current login
pub trait SessionStore: Send + Sync {
    /// Load the stored login, `None` if nothing is stored
    fn load(&self) -> AccessResult<Option<PersistedSession>>;

    fn save(&self, session: &PersistedSession) -> AccessResult<()>;

    /// Remove every stored key at once
    fn clear(&self) -> AccessResult<()>;
}

/// In-process store, for tests and embedders without persistence
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing login
    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }

    fn lock(&self) -> AccessResult<std::sync::MutexGuard<'_, Option<PersistedSession>>> {
        self.slot
            .lock()
            .map_err(|_| storage_error!("Session store lock poisoned", "lock").into())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> AccessResult<Option<PersistedSession>> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, session: &PersistedSession) -> AccessResult<()> {
        *self.lock()? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> AccessResult<()> {
        *self.lock()? = None;
        Ok(())
    }
}

/// JSON file store. One file holds all three keys, so removing it clears
/// them atomically; saves go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> AccessResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| file_error("create directory", parent, e))?;
        }

        info!("Session storage initialized at: {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> AccessResult<Option<PersistedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json_data =
            std::fs::read_to_string(&self.path).map_err(|e| file_error("read", &self.path, e))?;
        let session: PersistedSession =
            serde_json::from_str(&json_data).map_err(|e| file_error("parse", &self.path, e))?;

        debug!("Loaded session from {}", self.path.display());
        Ok(Some(session))
    }

    fn save(&self, session: &PersistedSession) -> AccessResult<()> {
        let json_data = serde_json::to_string_pretty(session)
            .map_err(|e| file_error("serialize", &self.path, e))?;

        let temp = self.temp_path();
        std::fs::write(&temp, json_data).map_err(|e| file_error("write", &temp, e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| file_error("replace", &self.path, e))?;

        debug!("Saved session to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> AccessResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Deleted session file: {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to delete session file {}: {}", self.path.display(), e);
                Err(file_error("delete", &self.path, e))
            }
        }
    }
}

fn file_error<E>(operation: &str, path: &Path, source: E) -> AccessError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = format!("Failed to {} {}: {}", operation, path.display(), source);
    storage_error!(message, operation, source).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::session::UserRecord;
    use chrono::{TimeZone, Utc};
    use parcelgate_core::ParcelError;

    fn sample() -> PersistedSession {
        PersistedSession {
            token: "abc".to_string(),
            user: UserRecord {
                id: "42".to_string(),
                name: "Front Desk One".to_string(),
                email: Some("desk@example.com".to_string()),
                role: Some(Role::FrontDesk),
            },
            login_time: Utc.timestamp_millis_opt(1_767_225_600_000).unwrap(),
        }
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySessionStore::new();
        assert_eq!(store.load().unwrap(), None);

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileSessionStore::new(&path).unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.save(&sample()).unwrap();

        let reopened = FileSessionStore::new(&path).unwrap();
        assert_eq!(reopened.load().unwrap(), Some(sample()));
        assert!(!store.temp_path().exists());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let mut keys: Vec<_> = raw.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["loginTime", "token", "user"]);
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json")).unwrap();

        store.save(&sample()).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileSessionStore::new(&path).unwrap();
        match store.load() {
            Err(AccessError::Core(ParcelError::Storage { context, .. })) => {
                assert_eq!(context.operation.as_deref(), Some("parse"));
            }
            other => panic!("expected a storage error, got {other:?}"),
        }
    }
}
