//! Durable credential storage.
//!
//! Two keyed entries, `auth_token` and `user`, are written and cleared
//! together. A record holding only one of them is never read as valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::models::{Credential, UserProfile};

/// Persistent home of the session credential.
pub trait CredentialStore: Send + Sync {
    /// Load the stored credential, if a complete one exists
    fn load(&self) -> Result<Option<Credential>, StorageError>;

    /// Persist both keys
    fn save(&self, credential: &Credential) -> Result<(), StorageError>;

    /// Remove both keys
    fn clear(&self) -> Result<(), StorageError>;
}

/// On-disk record layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default)]
    auth_token: Option<String>,
    #[serde(default)]
    user: Option<UserProfile>,
}

impl StoredSession {
    fn from_credential(credential: &Credential) -> Self {
        Self {
            auth_token: Some(credential.token.clone()),
            user: Some(credential.user.clone()),
        }
    }

    /// `None` when either key is missing
    fn into_credential(self) -> Option<Credential> {
        match (self.auth_token, self.user) {
            (Some(token), Some(user)) if !token.is_empty() => Some(Credential { token, user }),
            _ => None,
        }
    }

    fn is_empty(&self) -> bool {
        self.auth_token.is_none() && self.user.is_none()
    }
}

/// JSON file store. Writes go to a sibling temp file renamed into place.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
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

impl CredentialStore for FileStore {
    fn load(&self) -> Result<Option<Credential>, StorageError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredSession = serde_json::from_slice(&bytes)?;
        if stored.is_empty() {
            return Ok(None);
        }
        match stored.into_credential() {
            Some(credential) => Ok(Some(credential)),
            None => {
                tracing::warn!(path = %self.path.display(), "Discarding incomplete stored session");
                self.clear()?;
                Ok(None)
            }
        }
    }

    fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(&StoredSession::from_credential(credential))?;
        let temp = self.temp_path();
        std::fs::write(&temp, bytes)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<StoredSession>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding arbitrary keys, including incomplete pairs
    pub fn with_entries(auth_token: Option<&str>, user: Option<UserProfile>) -> Self {
        Self {
            entries: Mutex::new(StoredSession {
                auth_token: auth_token.map(str::to_string),
                user,
            }),
        }
    }

    /// Raw `auth_token` key
    pub fn auth_token(&self) -> Option<String> {
        self.lock().auth_token.clone()
    }

    /// Raw `user` key
    pub fn user(&self) -> Option<UserProfile> {
        self.lock().user.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoredSession> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<Credential>, StorageError> {
        let mut entries = self.lock();
        let credential = entries.clone().into_credential();
        if credential.is_none() {
            *entries = StoredSession::default();
        }
        Ok(credential)
    }

    fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        *self.lock() = StoredSession::from_credential(credential);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.lock() = StoredSession::default();
        Ok(())
    }
}
