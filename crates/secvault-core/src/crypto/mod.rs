//! Cryptographic primitives for vault operations.
//!
//! Two concerns live here, deliberately kept apart:
//!
//! - **Verification**: a one-way digest of the master password
//!   (`master_hash`) stored in the document and compared on unlock.
//!   It is never used as key material.
//! - **Field encryption**: a 256-bit key derived from the master
//!   password via scrypt, used with AES-GCM to encrypt individual
//!   field values.
//!
//! Legacy documents keyed their fields directly off an unsalted digest
//! of the password. Those still decrypt (see [`kdf::derive_field_key`]
//! with no salt), but every save re-keys the document with a fresh
//! scrypt salt.

pub mod cipher;
pub mod kdf;

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// scrypt key derivation failed.
    ///
    /// This usually means system resources were exhausted; the
    /// parameters themselves are fixed at compile time.
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// The key-derivation salt stored in the document is malformed.
    #[error("Invalid key derivation salt: {0}")]
    InvalidSalt(String),

    /// AEAD encryption failed.
    #[error("Field encryption failed")]
    EncryptionFailed,
}

/// Opaque per-field decryption failure.
///
/// Malformed base64, a wrong key, and tampered ciphertext are
/// deliberately indistinguishable. Callers substitute a placeholder
/// for the affected field rather than failing the whole load.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Decryption failed")]
pub struct DecryptionFailed;

// Re-export commonly used types
pub use cipher::{decrypt_field, encrypt_field};
pub use kdf::{FieldKey, KDF_SALT_LEN, derive_field_key, generate_salt, hash_password, verify_password};
