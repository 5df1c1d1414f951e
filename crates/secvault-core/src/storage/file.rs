//! Capability-file backend.
//!
//! The vault document lives in a single file the user pointed the
//! application at once. The backend retains that grant as a
//! [`RetainedHandle`] and persists it across restarts in a small JSON
//! handle record under the application data directory, so a returning
//! user whose permission is still intact gets their vault loaded
//! without a prompt.
//!
//! Permission is re-checked on every load. Anything other than
//! `Granted` discards the handle on the spot - a stale, unauthorized
//! handle is worse than none, because it would keep the UI claiming a
//! vault exists that can no longer be read.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{BackendKind, HandlePicker, StorageError, VaultStorage, WriteOutcome};

const HANDLE_RECORD_FILE: &str = "handle.json";

/// Authorization state of a retained handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// Read/write access is currently granted.
    Granted,
    /// Access is actively refused (e.g. the file went read-only).
    Denied,
    /// Access would need a fresh user gesture (e.g. the file moved).
    Prompt,
}

/// A user-granted authorization to one vault file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RetainedHandle {
    path: PathBuf,
}

impl RetainedHandle {
    /// Check current authorization without prompting.
    fn query_permission(&self) -> PermissionState {
        match fs::metadata(&self.path) {
            Ok(meta) => {
                if meta.permissions().readonly() {
                    return PermissionState::Denied;
                }
                // Probe that the grant actually still opens read-write.
                match fs::OpenOptions::new().read(true).write(true).open(&self.path) {
                    Ok(_) => PermissionState::Granted,
                    Err(e) if e.kind() == io::ErrorKind::PermissionDenied => PermissionState::Denied,
                    Err(_) => PermissionState::Prompt,
                }
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => PermissionState::Denied,
            Err(_) => PermissionState::Prompt,
        }
    }
}

/// Storage backend backed by a capability-scoped file handle.
pub struct CapabilityFileBackend {
    data_dir: PathBuf,
    handle: Option<RetainedHandle>,
    staged: Option<Vec<u8>>,
}

impl CapabilityFileBackend {
    /// Whether the capability-file mechanism is usable on this host.
    pub fn probe_support(data_dir: &Path) -> bool {
        fs::create_dir_all(data_dir).is_ok()
    }

    /// Open the backend, restoring a previously persisted handle.
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(data_dir)?;
        let mut backend = Self {
            data_dir: data_dir.to_path_buf(),
            handle: None,
            staged: None,
        };
        backend.restore_handle();
        Ok(backend)
    }

    /// The file currently backing the vault, if a handle is retained.
    pub fn vault_path(&self) -> Option<&Path> {
        self.handle.as_ref().map(|h| h.path.as_path())
    }

    /// Re-check authorization, modelling a permission request.
    ///
    /// There is no interactive grant on a plain filesystem, so this
    /// resolves to whatever a fresh probe reports; `Prompt` degrades
    /// to `Denied` because no gesture can settle it here.
    pub fn request_permission(&self) -> PermissionState {
        match self.handle.as_ref().map(RetainedHandle::query_permission) {
            Some(PermissionState::Granted) => PermissionState::Granted,
            _ => PermissionState::Denied,
        }
    }

    fn record_path(&self) -> PathBuf {
        self.data_dir.join(HANDLE_RECORD_FILE)
    }

    /// Restore the handle record written by a previous session.
    ///
    /// A missing or corrupt record is not an error; it just means no
    /// vault is known yet.
    fn restore_handle(&mut self) {
        let record = self.record_path();
        match fs::read_to_string(&record) {
            Ok(json) => match serde_json::from_str::<RetainedHandle>(&json) {
                Ok(handle) => {
                    tracing::debug!(path = %handle.path.display(), "restored vault file handle");
                    self.handle = Some(handle);
                }
                Err(e) => {
                    tracing::warn!("discarding corrupt handle record: {e}");
                    let _ = fs::remove_file(&record);
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("could not read handle record: {e}"),
        }
    }

    /// Persist the retained handle across restarts.
    fn persist_handle(&self) -> Result<(), StorageError> {
        if let Some(handle) = &self.handle {
            let json = serde_json::to_string_pretty(handle)?;
            fs::write(self.record_path(), json)?;
        }
        Ok(())
    }

    /// Drop the retained handle and its durable record.
    fn forget_handle(&mut self) {
        if self.handle.take().is_some() {
            tracing::debug!("cleared retained vault file handle");
        }
        match fs::remove_file(self.record_path()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("could not remove handle record: {e}"),
        }
    }

    fn read_all(path: &Path) -> Result<Vec<u8>, StorageError> {
        match fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Err(StorageError::PermissionDenied)
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn write_all(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        match fs::write(path, bytes) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Err(StorageError::PermissionDenied)
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn adopt_handle(&mut self, path: PathBuf) -> Result<(), StorageError> {
        self.handle = Some(RetainedHandle { path });
        self.persist_handle()
    }
}

impl VaultStorage for CapabilityFileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    fn load_document(&mut self) -> Result<Option<Vec<u8>>, StorageError> {
        let Some(handle) = &self.handle else {
            return Ok(None);
        };

        match handle.query_permission() {
            PermissionState::Granted => {
                let path = handle.path.clone();
                let bytes = Self::read_all(&path)?;
                tracing::info!(path = %path.display(), "loaded vault document");
                Ok(Some(bytes))
            }
            PermissionState::Prompt => {
                // Prompting needs a user gesture; report "no vault yet"
                // and force explicit re-selection.
                tracing::info!("handle permission needs a prompt, discarding handle");
                self.forget_handle();
                Ok(None)
            }
            PermissionState::Denied => {
                tracing::warn!("handle permission revoked, discarding handle");
                self.forget_handle();
                Err(StorageError::PermissionDenied)
            }
        }
    }

    fn select_existing(
        &mut self,
        picker: &mut dyn HandlePicker,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        let Some(path) = picker.pick_existing()? else {
            tracing::debug!("vault selection cancelled");
            return Ok(None);
        };

        let bytes = Self::read_all(&path)?;
        self.adopt_handle(path)?;
        Ok(Some(bytes))
    }

    fn write_document(
        &mut self,
        bytes: &[u8],
        picker: &mut dyn HandlePicker,
    ) -> Result<WriteOutcome, StorageError> {
        if self.handle.is_none() {
            let Some(path) = picker.pick_save_target()? else {
                tracing::debug!("save-target selection cancelled");
                return Ok(WriteOutcome::Cancelled);
            };
            self.adopt_handle(path)?;
        }

        // Invariant: handle set above or already present.
        let path = self.handle.as_ref().map(|h| h.path.clone()).ok_or_else(|| {
            StorageError::Io(io::Error::other("retained handle vanished during write"))
        })?;

        match Self::write_all(&path, bytes) {
            Ok(()) => {
                tracing::info!(path = %path.display(), len = bytes.len(), "wrote vault document");
                Ok(WriteOutcome::Written)
            }
            Err(StorageError::PermissionDenied) => {
                self.forget_handle();
                Err(StorageError::PermissionDenied)
            }
            Err(e) => Err(e),
        }
    }

    fn stage_document(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        self.staged = Some(bytes.to_vec());
        Ok(())
    }

    fn take_staged(&mut self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.staged.take())
    }

    fn clear_session_state(&mut self) -> Result<(), StorageError> {
        self.staged = None;
        self.forget_handle();
        Ok(())
    }
}
