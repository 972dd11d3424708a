//! Where the bearer token lives between requests.
//!
//! A remembered login goes to durable storage (a file); otherwise the token is
//! kept for the lifetime of the process only.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::ClientError;

pub trait TokenStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>, ClientError>;

    fn save(&self, token: &str) -> Result<(), ClientError>;

    fn clear(&self) -> Result<(), ClientError>;
}

/// Token kept in a file, surviving restarts.
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<String>, ClientError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, token)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Token held in memory for the current session.
#[derive(Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>, ClientError> {
        self.token
            .lock()
            .map_err(|_| ClientError::Storage("session token lock poisoned".to_string()))
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<String>, ClientError> {
        Ok(self.slot()?.clone())
    }

    fn save(&self, token: &str) -> Result<(), ClientError> {
        *self.slot()? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.slot()? = None;
        Ok(())
    }
}

/// The pair of durable and session storages. At most one holds a token.
pub struct TokenVault {
    durable: Box<dyn TokenStorage>,
    session: Box<dyn TokenStorage>,
}

impl TokenVault {
    pub fn new(durable: Box<dyn TokenStorage>, session: Box<dyn TokenStorage>) -> Self {
        Self { durable, session }
    }

    /// File-backed durable storage at `path` plus in-memory session storage.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self::new(
            Box::new(FileTokenStorage::new(path)),
            Box::new(MemoryTokenStorage::new()),
        )
    }

    /// Session token first, then the remembered one.
    pub fn current(&self) -> Result<Option<String>, ClientError> {
        match self.session.load()? {
            Some(token) => Ok(Some(token)),
            None => self.durable.load(),
        }
    }

    pub fn store(&self, token: &str, remember: bool) -> Result<(), ClientError> {
        if remember {
            self.session.clear()?;
            self.durable.save(token)
        } else {
            self.durable.clear()?;
            self.session.save(token)
        }
    }

    pub fn clear_all(&self) -> Result<(), ClientError> {
        let session = self.session.clear();
        let durable = self.durable.clear();
        session.and(durable)
    }

    pub fn is_remembered(&self) -> Result<bool, ClientError> {
        Ok(self.durable.load()?.is_some())
    }
}
