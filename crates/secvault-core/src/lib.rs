#![forbid(unsafe_code)]

//! SecVault core: master-key derivation and verification, field-level
//! symmetric encryption, the locked/unlocked session lifecycle, and
//! the dual-backend persistence layer.

pub mod crypto;
pub mod error;
pub mod storage;
pub mod vault;

pub use storage::{BackendKind, HandlePicker, NoPicker, VaultStorage, select_backend};
pub use vault::{
    Credential, ExportOutcome, InformationItem, SaveStatus, SessionState, VaultDocument,
    VaultError, VaultRepository, VaultSession,
};
