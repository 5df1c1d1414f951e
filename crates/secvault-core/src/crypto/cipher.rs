//! Per-field AES-256-GCM encryption.
//!
//! Ciphertext wire format: `base64(nonce || ciphertext || tag)` with a
//! fresh 96-bit nonce per call, so encrypting the same plaintext twice
//! under the same key never yields the same bytes.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;

use super::kdf::FieldKey;
use super::{CryptoError, DecryptionFailed};

const NONCE_LEN: usize = 12;

/// Encrypt a single field value.
pub fn encrypt_field(plaintext: &str, key: &FieldKey) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.expose()));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(out))
}

/// Decrypt a single field value.
///
/// All failure modes collapse into [`DecryptionFailed`]; a corrupted
/// field must not reveal whether the base64, the tag, or the UTF-8
/// decode broke.
pub fn decrypt_field(ciphertext: &str, key: &FieldKey) -> Result<String, DecryptionFailed> {
    let raw = BASE64.decode(ciphertext).map_err(|_| DecryptionFailed)?;
    if raw.len() < NONCE_LEN {
        return Err(DecryptionFailed);
    }
    let (nonce_bytes, body) = raw.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.expose()));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), body)
        .map_err(|_| DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| DecryptionFailed)
}
