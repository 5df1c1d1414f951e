//! Vault-level abstractions: document model, session state machine,
//! and the repository orchestrating encryption and persistence.

pub mod document;
pub mod repository;
pub mod session;

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::storage::StorageError;

/// Errors surfaced by vault operations.
///
/// Per-field decryption failures are deliberately absent here: they
/// are absorbed during unlock and replaced with
/// [`document::DECRYPTION_FAILED_PLACEHOLDER`] so one corrupted field
/// never makes the rest of the vault unreadable.
#[derive(Error, Debug)]
pub enum VaultError {
    /// A required field was empty on add/update.
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),

    /// The submitted password does not match the stored digest.
    #[error("Incorrect master password")]
    WrongPassword,

    /// The operation requires an unlocked session.
    #[error("Vault is locked")]
    Locked,

    /// Staging is only valid while the session is locked.
    #[error("Vault is already unlocked")]
    AlreadyUnlocked,

    /// No information item or credential at this position.
    #[error("No entry at index {0}")]
    InvalidIndex(usize),

    /// The stored document is not valid vault JSON.
    #[error("Vault document is malformed: {0}")]
    MalformedDocument(#[from] serde_json::Error),

    /// The primary save succeeded but the export backup copy did not.
    /// The durable document is intact; only the backup is missing.
    #[error("Failed to write export backup: {0}")]
    BackupFailed(std::io::Error),

    /// Cryptographic failure outside the per-field degrade path.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Storage backend failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// Re-export commonly used types
pub use document::{
    Credential, CredentialRecord, DECRYPTION_FAILED_PLACEHOLDER, InformationItem, VaultDocument,
};
pub use repository::{ExportOutcome, SaveStatus, VaultRepository};
pub use session::{SessionState, VaultSession};
