//! The vault repository: CRUD over the plaintext collections,
//! orchestrating encryption and persistence.
//!
//! Every mutation is a full read-modify-persist cycle: the in-memory
//! collections change, then the whole model is re-encrypted and the
//! resulting document replaces the stored one. No deltas - write
//! amplification is irrelevant at personal-vault sizes and full
//! rewrites keep the durable state trivially consistent.
//!
//! Saves go through a single-slot queue: at most one write is in
//! flight, and requests arriving meanwhile coalesce into one trailing
//! save of the then-current state. The last save to complete
//! determines durable state.

use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::{HandlePicker, VaultStorage, WriteOutcome};

use super::VaultError;
use super::document::{Credential, InformationItem, VaultDocument};
use super::session::{SessionState, VaultSession};

/// Outcome of a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// The document reached durable storage.
    Saved,
    /// The user cancelled the save-target gesture; the edits remain
    /// in memory and a later save will retry.
    Cancelled,
    /// Coalesced behind an in-flight save; the trailing write will
    /// capture this state.
    Coalesced,
}

/// Outcome of an export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Primary save and dated backup copy both completed.
    Exported(PathBuf),
    /// The save-target gesture was dismissed; neither the primary
    /// document nor the backup was written.
    Cancelled,
}

/// Single-slot save queue.
///
/// `request` marks work pending; `begin` claims the slot. A request
/// made while the slot is claimed stays pending and is drained by the
/// claim holder, so concurrent requests coalesce instead of
/// interleaving partial writes.
#[derive(Default)]
struct SaveSlot {
    in_flight: bool,
    pending: bool,
}

impl SaveSlot {
    fn request(&mut self) {
        self.pending = true;
    }

    /// Claim the slot; `false` when another save holds it.
    fn begin(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    fn take_pending(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    fn finish(&mut self) {
        self.in_flight = false;
    }
}

/// Orchestrates the session, the crypto service and the persistence
/// backend behind the command surface the UI consumes.
///
/// Nothing returned from here is ciphertext; callers only ever see
/// plaintext collections and error kinds.
pub struct VaultRepository {
    session: VaultSession,
    storage: Box<dyn VaultStorage>,
    picker: Box<dyn HandlePicker>,
    save_slot: SaveSlot,
}

impl VaultRepository {
    pub fn new(storage: Box<dyn VaultStorage>, picker: Box<dyn HandlePicker>) -> Self {
        Self {
            session: VaultSession::new(),
            storage,
            picker,
            save_slot: SaveSlot::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn backend_kind(&self) -> crate::storage::BackendKind {
        self.storage.kind()
    }

    /// Plaintext information items; fails while locked.
    pub fn information(&self) -> Result<&[InformationItem], VaultError> {
        self.session.information()
    }

    /// Plaintext credentials; fails while locked.
    pub fn credentials(&self) -> Result<&[Credential], VaultError> {
        self.session.credentials()
    }

    // ==================== Startup and selection ====================

    /// Probe for an existing vault without prompting.
    ///
    /// When the backend yields a document it is staged for unlock and
    /// `true` is returned ("vault found"). A retained handle whose
    /// permission would need a prompt reports `false` - prompting
    /// requires an explicit user gesture via
    /// [`Self::select_existing_vault`].
    pub fn startup_probe(&mut self) -> Result<bool, VaultError> {
        let Some(bytes) = self.storage.load_document()? else {
            return Ok(false);
        };
        self.stage_bytes(&bytes)?;
        tracing::info!("existing vault staged for unlock");
        Ok(true)
    }

    /// Explicit user-gesture vault selection.
    ///
    /// Returns `false` on cancellation, which is not an error.
    pub fn select_existing_vault(&mut self) -> Result<bool, VaultError> {
        let Some(bytes) = self.storage.select_existing(self.picker.as_mut())? else {
            return Ok(false);
        };
        self.stage_bytes(&bytes)?;
        tracing::info!("selected vault staged for unlock");
        Ok(true)
    }

    fn stage_bytes(&mut self, bytes: &[u8]) -> Result<(), VaultError> {
        let document = VaultDocument::from_bytes(bytes)?;
        self.session.stage(document)?;
        // Mirror into the backend's staged slot so the document
        // survives until the password arrives even if this process
        // restarts in between.
        self.storage.stage_document(bytes)?;
        Ok(())
    }

    // ==================== Session lifecycle ====================

    /// Submit the master password.
    ///
    /// Re-stages from the backend's staged cache when the session lost
    /// its staged document (e.g. after a wrong-password attempt). On
    /// success the staged cache is purged.
    pub fn unlock(&mut self, password: &str) -> Result<(), VaultError> {
        let restaged = if !self.session.has_staged() && self.session.state() == SessionState::Locked
        {
            match self.storage.take_staged()? {
                Some(bytes) => {
                    let document = VaultDocument::from_bytes(&bytes)?;
                    self.session.stage(document)?;
                    Some(bytes)
                }
                None => None,
            }
        } else {
            None
        };

        match self.session.unlock(password) {
            Ok(()) => {
                // Verified; the not-yet-verified cache has no business
                // outliving the unlock.
                let _ = self.storage.take_staged()?;
                Ok(())
            }
            Err(e) => {
                // Keep the staged cache so the user can retry without
                // re-selecting the file.
                if let Some(bytes) = restaged {
                    self.storage.stage_document(&bytes)?;
                }
                Err(e)
            }
        }
    }

    /// Lock the vault.
    ///
    /// Flushes a full save when there is anything to flush, then wipes
    /// the key and collections and clears the retained backend handle.
    /// A failed flush aborts the transition: the session stays
    /// unlocked and the edits stay in memory.
    pub fn lock(&mut self) -> Result<(), VaultError> {
        if self.session.is_unlocked() {
            let has_content = !self.session.information()?.is_empty()
                || !self.session.credentials()?.is_empty();
            if has_content {
                self.save()?;
            }
        }

        self.session.wipe();
        self.storage.clear_session_state()?;
        Ok(())
    }

    /// Drop the session and the retained handle without flushing.
    ///
    /// Unlike [`Self::lock`], unsaved edits are discarded. The durable
    /// document is left alone.
    pub fn forget_vault(&mut self) -> Result<(), VaultError> {
        self.session.wipe();
        self.storage.clear_session_state()?;
        Ok(())
    }

    // ==================== Information CRUD ====================

    /// Add an information item, overwriting by name (last write wins).
    pub fn add_information(&mut self, name: &str, value: &str) -> Result<SaveStatus, VaultError> {
        if name.is_empty() {
            return Err(VaultError::EmptyInput("name"));
        }
        if value.is_empty() {
            return Err(VaultError::EmptyInput("value"));
        }

        let vault = self.session.unlocked_mut()?;
        if let Some(existing) = vault.information.iter_mut().find(|i| i.name == name) {
            existing.value = value.to_owned();
        } else {
            vault.information.push(InformationItem {
                name: name.to_owned(),
                value: value.to_owned(),
            });
        }
        self.save()
    }

    /// Replace the information item at `index`.
    ///
    /// A rename that collides with another item's name drops that
    /// other item, preserving the name-uniqueness invariant with
    /// last-write-wins semantics.
    pub fn update_information(
        &mut self,
        index: usize,
        item: InformationItem,
    ) -> Result<SaveStatus, VaultError> {
        if item.name.is_empty() {
            return Err(VaultError::EmptyInput("name"));
        }
        if item.value.is_empty() {
            return Err(VaultError::EmptyInput("value"));
        }

        let vault = self.session.unlocked_mut()?;
        if index >= vault.information.len() {
            return Err(VaultError::InvalidIndex(index));
        }

        // Drop any other item already carrying the new name, adjusting
        // the target position when the duplicate sat before it.
        let duplicate = vault
            .information
            .iter()
            .position(|other| other.name == item.name);
        let mut index = index;
        if let Some(dup) = duplicate
            && dup != index
        {
            vault.information.remove(dup);
            if dup < index {
                index -= 1;
            }
        }

        vault.information[index] = item;
        self.save()
    }

    /// Remove the information item at `index`.
    pub fn delete_information(&mut self, index: usize) -> Result<SaveStatus, VaultError> {
        let vault = self.session.unlocked_mut()?;
        if index >= vault.information.len() {
            return Err(VaultError::InvalidIndex(index));
        }
        vault.information.remove(index);
        self.save()
    }

    // ==================== Credential CRUD ====================

    /// Append a credential. Duplicate sites are allowed.
    pub fn add_credential(
        &mut self,
        site: &str,
        user: &str,
        pass: &str,
    ) -> Result<SaveStatus, VaultError> {
        if site.is_empty() {
            return Err(VaultError::EmptyInput("site"));
        }
        if user.is_empty() {
            return Err(VaultError::EmptyInput("user"));
        }
        if pass.is_empty() {
            return Err(VaultError::EmptyInput("pass"));
        }

        let vault = self.session.unlocked_mut()?;
        vault.credentials.push(Credential {
            site: site.to_owned(),
            user: user.to_owned(),
            pass: pass.to_owned(),
        });
        self.save()
    }

    /// Replace the credential at `index`.
    pub fn update_credential(
        &mut self,
        index: usize,
        credential: Credential,
    ) -> Result<SaveStatus, VaultError> {
        if credential.site.is_empty() {
            return Err(VaultError::EmptyInput("site"));
        }
        if credential.user.is_empty() {
            return Err(VaultError::EmptyInput("user"));
        }
        if credential.pass.is_empty() {
            return Err(VaultError::EmptyInput("pass"));
        }

        let vault = self.session.unlocked_mut()?;
        let slot = vault
            .credentials
            .get_mut(index)
            .ok_or(VaultError::InvalidIndex(index))?;
        *slot = credential;
        self.save()
    }

    /// Remove the credential at `index`.
    pub fn delete_credential(&mut self, index: usize) -> Result<SaveStatus, VaultError> {
        let vault = self.session.unlocked_mut()?;
        if index >= vault.credentials.len() {
            return Err(VaultError::InvalidIndex(index));
        }
        vault.credentials.remove(index);
        self.save()
    }

    // ==================== Persistence ====================

    /// Re-encrypt the current collections and rewrite the document.
    ///
    /// An I/O failure leaves the in-memory state untouched; the edits
    /// survive for a retry.
    pub fn save(&mut self) -> Result<SaveStatus, VaultError> {
        self.save_slot.request();

        if !self.save_slot.begin() {
            // An outer save is draining the slot; it will pick this
            // request up. Never dropped silently.
            tracing::debug!("save request coalesced into in-flight save");
            return Ok(SaveStatus::Coalesced);
        }

        let result = self.drain_saves();
        self.save_slot.finish();
        result
    }

    fn drain_saves(&mut self) -> Result<SaveStatus, VaultError> {
        let mut status = SaveStatus::Saved;
        while self.save_slot.take_pending() {
            let bytes = self.session.seal()?.to_bytes()?;
            match self.storage.write_document(&bytes, self.picker.as_mut())? {
                WriteOutcome::Written => status = SaveStatus::Saved,
                WriteOutcome::Cancelled => {
                    tracing::debug!("save cancelled at the save-target gesture");
                    status = SaveStatus::Cancelled;
                }
            }
        }
        Ok(status)
    }

    /// Save, then additionally write a standalone dated backup copy
    /// under `export_dir`.
    ///
    /// A cancelled primary save yields [`ExportOutcome::Cancelled`]
    /// and skips the backup: a dated copy of a document that never
    /// reached durable storage would misrepresent what exists. The
    /// backup failing after the primary save succeeded is reported as
    /// [`VaultError::BackupFailed`] but does not roll anything back.
    pub fn export_snapshot(&mut self, export_dir: &Path) -> Result<ExportOutcome, VaultError> {
        if self.save()? == SaveStatus::Cancelled {
            tracing::debug!("export skipped: primary save was cancelled");
            return Ok(ExportOutcome::Cancelled);
        }

        let bytes = self.session.seal()?.to_bytes()?;
        let date = chrono::Local::now().format("%Y-%m-%d");
        let path = export_dir.join(format!("vault-backup-{date}.json"));

        fs::write(&path, &bytes).map_err(VaultError::BackupFailed)?;
        tracing::info!(path = %path.display(), "wrote export snapshot");
        Ok(ExportOutcome::Exported(path))
    }
}
