//! Fallback key-value backend.
//!
//! Used when the host has no file-picker capability. A single JSON
//! file in the application data directory holds string entries under
//! fixed keys: [`DOCUMENT_KEY`] for the vault document and
//! [`STAGED_KEY`] for a loaded-but-not-yet-verified document between
//! selection and password submission.
//!
//! From the vault's point of view this backend is indistinguishable
//! from the file backend; there is just no handle to manage, so
//! user-gesture pickers are ignored.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{BackendKind, HandlePicker, StorageError, VaultStorage, WriteOutcome};

/// Fixed key for the encrypted vault document.
pub const DOCUMENT_KEY: &str = "vaultData";

/// Fixed key for the staged, not-yet-verified document.
pub const STAGED_KEY: &str = "tempVaultData";

const STORE_FILE: &str = "fallback-store.json";

/// Flat persistent key-value store.
pub struct FallbackStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FallbackStore {
    /// Open the store, creating an empty one when none exists.
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(STORE_FILE);

        let entries = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StorageError::Io(e)),
        };

        Ok(Self { path, entries })
    }

    /// Look up a value under `key`.
    pub fn load(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Store `value` under `key` and flush.
    pub fn store(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_owned(), value);
        self.flush()
    }

    /// Remove the entry under `key` and flush.
    pub fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn utf8(bytes: &[u8]) -> Result<String, StorageError> {
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "vault document is not valid UTF-8",
            ))
        })
    }
}

impl VaultStorage for FallbackStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Fallback
    }

    fn load_document(&mut self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.load(DOCUMENT_KEY).map(|s| s.as_bytes().to_vec()))
    }

    fn select_existing(
        &mut self,
        _picker: &mut dyn HandlePicker,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        // No picker on this backend; selection degrades to a plain load.
        self.load_document()
    }

    fn write_document(
        &mut self,
        bytes: &[u8],
        _picker: &mut dyn HandlePicker,
    ) -> Result<WriteOutcome, StorageError> {
        let value = Self::utf8(bytes)?;
        self.store(DOCUMENT_KEY, value)?;
        tracing::info!(len = bytes.len(), "wrote vault document to fallback store");
        Ok(WriteOutcome::Written)
    }

    fn stage_document(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let value = Self::utf8(bytes)?;
        self.store(STAGED_KEY, value)
    }

    fn take_staged(&mut self) -> Result<Option<Vec<u8>>, StorageError> {
        let staged = self.load(STAGED_KEY).map(|s| s.as_bytes().to_vec());
        if staged.is_some() {
            self.remove(STAGED_KEY)?;
        }
        Ok(staged)
    }

    fn clear_session_state(&mut self) -> Result<(), StorageError> {
        // No handle to forget; just purge the staged cache.
        self.remove(STAGED_KEY)
    }
}
