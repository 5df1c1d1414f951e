//! Error types for the vault engine.
//!
//! This module gathers the error surface of the crate in one place.

// Re-export error types from submodules
pub use crate::crypto::{CryptoError, DecryptionFailed};
pub use crate::storage::StorageError;
pub use crate::vault::VaultError;
