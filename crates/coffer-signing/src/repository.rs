// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`KeyStoreRepository`] implementations.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use coffer_core::{CofferError, JwtKeyStore, KeyStoreRepository};
use tracing::debug;

/// Rotation store kept as a JSON document on disk.
///
/// Saves go to a temporary file in the same directory which is then renamed
/// over the target, so a crash never leaves a half-written store. The
/// temporary file is created owner-only on Unix.
#[derive(Debug, Clone)]
pub struct FileKeyStoreRepository {
    path: PathBuf,
}

impl FileKeyStoreRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyStoreRepository for FileKeyStoreRepository {
    fn load(&self) -> Result<JwtKeyStore, CofferError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no signing key store yet");
                return Ok(JwtKeyStore::default());
            }
            Err(e) => return Err(CofferError::persistence("failed to read signing key store", e)),
        };
        serde_json::from_str(&content)
            .map_err(|e| CofferError::persistence("signing key store is not valid JSON", e))
    }

    fn save(&self, store: &JwtKeyStore) -> Result<(), CofferError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|e| CofferError::persistence("failed to create signing key directory", e))?;

        let json = serde_json::to_vec_pretty(store)
            .map_err(|e| CofferError::persistence("failed to serialize signing key store", e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| CofferError::persistence("failed to create temporary key store", e))?;
        tmp.write_all(&json)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| CofferError::persistence("failed to write signing key store", e))?;
        tmp.persist(&self.path)
            .map_err(|e| CofferError::persistence("failed to replace signing key store", e.error))?;

        debug!(path = %self.path.display(), keys = store.keys.len(), "signing key store saved");
        Ok(())
    }
}

/// Process-local rotation store.
#[derive(Debug, Default)]
pub struct InMemoryKeyStoreRepository {
    store: Mutex<JwtKeyStore>,
}

impl InMemoryKeyStoreRepository {
    /// Start from an existing store.
    pub fn with_store(store: JwtKeyStore) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// Copy of what is currently persisted.
    pub fn snapshot(&self) -> Result<JwtKeyStore, CofferError> {
        self.load()
    }
}

impl KeyStoreRepository for InMemoryKeyStoreRepository {
    fn load(&self) -> Result<JwtKeyStore, CofferError> {
        self.store
            .lock()
            .map(|store| store.clone())
            .map_err(|_| CofferError::Internal("key store lock poisoned".to_string()))
    }

    fn save(&self, store: &JwtKeyStore) -> Result<(), CofferError> {
        let mut guard = self
            .store
            .lock()
            .map_err(|_| CofferError::Internal("key store lock poisoned".to_string()))?;
        *guard = store.clone();
        Ok(())
    }
}
