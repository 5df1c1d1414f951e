//! Password hashing and field-key derivation.
//!
//! The stored `masterHash` is a plain SHA-256 hex digest of the
//! NFC-normalized password. That format predates this crate and is
//! kept byte-compatible so existing vault files still verify.
//!
//! The field-encryption key is a separate concern: scrypt over the
//! same normalized password with a per-document salt. Documents
//! written before the salt existed fall back to the digest as key
//! material, which is exactly what the legacy implementation did.

use rand::RngCore;
use ring::digest;
use secrecy::{ExposeSecret, SecretBox};
use subtle::ConstantTimeEq;
use unicode_normalization::UnicodeNormalization;
use zeroize::Zeroizing;

use super::CryptoError;

/// Length in bytes of the per-document key-derivation salt.
pub const KDF_SALT_LEN: usize = 32;

/// scrypt cost parameters for field-key derivation.
///
/// log2(N) = 15 keeps interactive unlock under ~100ms on commodity
/// hardware while still being a real work factor; r and p follow the
/// usual recommendation.
const SCRYPT_LOG2_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// A 256-bit field-encryption key.
///
/// The key material is boxed and zeroized on drop. This type
/// intentionally does not implement `Clone`; exactly one unlocked
/// session owns the key at a time.
pub struct FieldKey(SecretBox<[u8; 32]>);

impl FieldKey {
    fn new(bytes: [u8; 32]) -> Self {
        Self(SecretBox::new(Box::new(bytes)))
    }

    pub(crate) fn expose(&self) -> &[u8; 32] {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FieldKey([REDACTED])")
    }
}

/// NFC-normalize a password for digesting and key derivation.
///
/// Without this, the same password typed on macOS (NFD composition)
/// and Linux would produce different digests.
fn normalize(password: &str) -> Zeroizing<String> {
    Zeroizing::new(password.nfc().collect::<String>())
}

/// Compute the verification digest of a master password.
///
/// Deterministic, unsalted, hex-encoded SHA-256. Used only for the
/// equality check on unlock, never for decryption.
pub fn hash_password(password: &str) -> String {
    let normalized = normalize(password);
    let digest = digest::digest(&digest::SHA256, normalized.as_bytes());
    hex::encode(digest.as_ref())
}

/// Verify a candidate password against a stored digest.
///
/// Comparison is constant-time over the hex strings.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let candidate = hash_password(password);
    candidate.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

/// Generate a fresh key-derivation salt.
pub fn generate_salt() -> [u8; KDF_SALT_LEN] {
    let mut salt = [0u8; KDF_SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Derive the field-encryption key from the master password.
///
/// With a salt this is scrypt with the parameters above. Without one
/// (legacy documents) the key is the raw SHA-256 of the normalized
/// password - weak, but required to read documents written before the
/// salt field existed.
pub fn derive_field_key(password: &str, salt: Option<&[u8]>) -> Result<FieldKey, CryptoError> {
    let normalized = normalize(password);

    match salt {
        Some(salt) => {
            if salt.len() != KDF_SALT_LEN {
                return Err(CryptoError::InvalidSalt(format!(
                    "expected {KDF_SALT_LEN} bytes, got {}",
                    salt.len()
                )));
            }

            let params = scrypt::Params::new(SCRYPT_LOG2_N, SCRYPT_R, SCRYPT_P, 32)
                .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

            let mut key = Zeroizing::new([0u8; 32]);
            scrypt::scrypt(normalized.as_bytes(), salt, &params, &mut key[..])
                .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

            Ok(FieldKey::new(*key))
        }
        None => {
            tracing::debug!("deriving legacy unsalted field key");
            let digest = digest::digest(&digest::SHA256, normalized.as_bytes());
            let mut key = [0u8; 32];
            key.copy_from_slice(digest.as_ref());
            Ok(FieldKey::new(key))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_password("hunter2"), hash_password("hunter2"));
    }

    #[test]
    fn hash_differs_across_passwords() {
        assert_ne!(hash_password("hunter2"), hash_password("hunter3"));
        assert_ne!(hash_password(""), hash_password(" "));
    }

    #[test]
    fn hash_is_sha256_hex() {
        // Known-answer: SHA-256("abc")
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn verify_accepts_matching_password() {
        let stored = hash_password("correct horse");
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("correct  horse", &stored));
    }

    #[test]
    fn nfc_normalization_unifies_composition() {
        // U+00E9 vs U+0065 U+0301 are the same character after NFC
        assert_eq!(hash_password("caf\u{e9}"), hash_password("cafe\u{301}"));
    }

    #[test]
    fn salted_keys_differ_across_salts() {
        let k1 = derive_field_key("pw", Some(&[1u8; KDF_SALT_LEN])).unwrap();
        let k2 = derive_field_key("pw", Some(&[2u8; KDF_SALT_LEN])).unwrap();
        assert_ne!(k1.expose(), k2.expose());
    }

    #[test]
    fn salted_key_is_reproducible() {
        let salt = [7u8; KDF_SALT_LEN];
        let k1 = derive_field_key("pw", Some(&salt)).unwrap();
        let k2 = derive_field_key("pw", Some(&salt)).unwrap();
        assert_eq!(k1.expose(), k2.expose());
    }

    #[test]
    fn legacy_key_is_password_digest() {
        let key = derive_field_key("pw", None).unwrap();
        let expected = digest::digest(&digest::SHA256, b"pw");
        assert_eq!(&key.expose()[..], expected.as_ref());
    }

    #[test]
    fn wrong_salt_length_is_rejected() {
        let err = derive_field_key("pw", Some(&[0u8; 16])).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidSalt(_)));
    }
}
