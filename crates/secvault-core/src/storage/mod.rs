//! Durable storage for the encrypted vault document.
//!
//! Two backends implement [`VaultStorage`]:
//!
//! - [`CapabilityFileBackend`]: the vault lives in a single file the
//!   user granted access to. The backend retains an authorized handle
//!   for the session and can persist it across restarts via a small
//!   handle record.
//! - [`FallbackStore`]: a flat key-value store under fixed keys, used
//!   when the host offers no file-picker capability.
//!
//! Backend selection happens once at startup ([`select_backend`]);
//! after that the rest of the engine only sees the trait.
//!
//! User-gesture file selection is injected through [`HandlePicker`] so
//! the UI layer decides how a "gesture" looks (a CLI argument, a
//! dialog) and tests inject fakes. A picker returning `None` is a
//! cancellation, never an error.

pub mod fallback;
pub mod file;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use fallback::{DOCUMENT_KEY, FallbackStore, STAGED_KEY};
pub use file::{CapabilityFileBackend, PermissionState};

/// Which backend variant is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Capability-scoped file handle.
    File,
    /// Key-value fallback store.
    Fallback,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::File => f.write_str("capability file"),
            BackendKind::Fallback => f.write_str("fallback store"),
        }
    }
}

/// Errors surfaced by the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The retained handle lacks current authorization. The handle has
    /// already been discarded by the time this is returned.
    #[error("Permission denied for the vault file")]
    PermissionDenied,

    /// Neither the capability-file mechanism nor the fallback store is
    /// usable on this host.
    #[error("No usable storage backend available")]
    BackendUnavailable,

    /// Underlying read or write failed for a reason other than
    /// permission.
    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// The handle record or fallback store file is corrupt.
    #[error("Corrupt storage record: {0}")]
    Record(#[from] serde_json::Error),
}

/// Result of a write that may require a user gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The document reached durable storage.
    Written,
    /// The user dismissed the save-target picker; nothing was written
    /// and any existing handle is untouched.
    Cancelled,
}

/// User-gesture file selection, supplied by the UI layer.
pub trait HandlePicker {
    /// Present an open-file gesture. `Ok(None)` when dismissed.
    fn pick_existing(&mut self) -> io::Result<Option<PathBuf>>;

    /// Present a save-file gesture for a new vault file. `Ok(None)`
    /// when dismissed.
    fn pick_save_target(&mut self) -> io::Result<Option<PathBuf>>;
}

/// A picker that always cancels. Useful where no gesture is possible.
pub struct NoPicker;

impl HandlePicker for NoPicker {
    fn pick_existing(&mut self) -> io::Result<Option<PathBuf>> {
        Ok(None)
    }

    fn pick_save_target(&mut self) -> io::Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Capability interface over the two storage variants.
///
/// Only the persistence layer mutates the retained handle; the rest of
/// the engine goes through these operations.
pub trait VaultStorage {
    fn kind(&self) -> BackendKind;

    /// Load the document without prompting.
    ///
    /// Returns `Ok(None)` when no vault is available yet - no handle,
    /// or a handle whose permission would require a prompt. A handle
    /// with revoked permission is discarded before this returns.
    fn load_document(&mut self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Explicit user-gesture selection of an existing vault file.
    ///
    /// On success the new handle replaces any retained one and is
    /// persisted across restarts. `Ok(None)` on cancellation.
    fn select_existing(
        &mut self,
        picker: &mut dyn HandlePicker,
    ) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write the full document.
    ///
    /// When no handle is held, a save-target gesture is requested
    /// first; cancelling it yields [`WriteOutcome::Cancelled`].
    fn write_document(
        &mut self,
        bytes: &[u8],
        picker: &mut dyn HandlePicker,
    ) -> Result<WriteOutcome, StorageError>;

    /// Stage a loaded-but-not-yet-verified document.
    fn stage_document(&mut self, bytes: &[u8]) -> Result<(), StorageError>;

    /// Take the staged document, clearing the stage.
    fn take_staged(&mut self) -> Result<Option<Vec<u8>>, StorageError>;

    /// Forget the retained handle and purge the staged cache.
    ///
    /// Called on lock and on permission loss. The durable document
    /// itself is left alone.
    fn clear_session_state(&mut self) -> Result<(), StorageError>;
}

/// Probe host support and pick the preferred backend.
///
/// The capability-file mechanism is probed once; when available it is
/// preferred, otherwise persistence degrades to the fallback store
/// with no difference in vault operations. `force_fallback` models a
/// host without the picker capability.
pub fn select_backend(
    data_dir: &Path,
    force_fallback: bool,
) -> Result<Box<dyn VaultStorage>, StorageError> {
    if !force_fallback && CapabilityFileBackend::probe_support(data_dir) {
        tracing::debug!(data_dir = %data_dir.display(), "using capability-file backend");
        return Ok(Box::new(CapabilityFileBackend::open(data_dir)?));
    }

    match FallbackStore::open(data_dir) {
        Ok(store) => {
            tracing::debug!(data_dir = %data_dir.display(), "using fallback key-value backend");
            Ok(Box::new(store))
        }
        Err(e) => {
            tracing::warn!("no storage backend available: {e}");
            Err(StorageError::BackendUnavailable)
        }
    }
}
