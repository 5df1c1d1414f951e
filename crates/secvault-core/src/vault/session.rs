//! The locked/unlocked session state machine.
//!
//! States: `Locked` -> `Unlocking` -> `Unlocked` -> back to `Locked`.
//! `Unlocking` owns the staged ciphertext document read from storage
//! before the password is known; `Unlocked` owns the master key and
//! the plaintext collections. The enum makes the central secrecy
//! invariant structural: key material exists if and only if the
//! session is unlocked, and dropping the unlocked state zeroizes the
//! collections.
//!
//! The session performs no I/O. Staging, flushing and handle lifetime
//! belong to [`super::repository::VaultRepository`].

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::SecretString;

use crate::crypto::{
    self, FieldKey, KDF_SALT_LEN, decrypt_field, derive_field_key, encrypt_field, generate_salt,
    hash_password, verify_password,
};

use super::VaultError;
use super::document::{
    Credential, CredentialRecord, DECRYPTION_FAILED_PLACEHOLDER, InformationItem, VaultDocument,
};

/// Externally observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Locked,
    Unlocking,
    Unlocked,
}

/// The in-memory vault while unlocked.
///
/// Never persisted. Not `Clone`; exactly one unlocked vault exists
/// per session.
pub(crate) struct UnlockedVault {
    /// The master password, kept only for the lifetime of the session.
    #[allow(dead_code)] // held to enforce the key-lifecycle invariant
    master_key: SecretString,
    master_hash: String,
    kdf_salt: [u8; KDF_SALT_LEN],
    field_key: FieldKey,
    pub(crate) information: Vec<InformationItem>,
    pub(crate) credentials: Vec<Credential>,
}

enum Inner {
    Locked,
    Unlocking { staged: VaultDocument },
    Unlocked(Box<UnlockedVault>),
}

/// Session lifecycle holder. Created locked at application start.
pub struct VaultSession {
    inner: Inner,
}

impl Default for VaultSession {
    fn default() -> Self {
        Self::new()
    }
}

impl VaultSession {
    pub fn new() -> Self {
        Self {
            inner: Inner::Locked,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.inner {
            Inner::Locked => SessionState::Locked,
            Inner::Unlocking { .. } => SessionState::Unlocking,
            Inner::Unlocked(_) => SessionState::Unlocked,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == SessionState::Unlocked
    }

    pub fn has_staged(&self) -> bool {
        matches!(self.inner, Inner::Unlocking { .. })
    }

    /// Stage an encrypted document ahead of password submission.
    ///
    /// Valid from `Locked` (entering `Unlocking`) or `Unlocking`
    /// (replacing the staged document after a new selection).
    pub fn stage(&mut self, document: VaultDocument) -> Result<(), VaultError> {
        match self.inner {
            Inner::Unlocked(_) => Err(VaultError::AlreadyUnlocked),
            _ => {
                self.inner = Inner::Unlocking { staged: document };
                Ok(())
            }
        }
    }

    /// Submit the master password.
    ///
    /// With a staged document this verifies the digest and decrypts
    /// every field; without one it creates a fresh empty vault keyed
    /// to this password. An empty password is rejected up front and
    /// keeps the staged document; any later failure returns the
    /// machine to `Locked`. It never ends up `Unlocked` without a
    /// verified key.
    pub fn unlock(&mut self, password: &str) -> Result<(), VaultError> {
        if password.is_empty() {
            return Err(VaultError::EmptyInput("master password"));
        }
        if self.is_unlocked() {
            return Ok(());
        }

        match std::mem::replace(&mut self.inner, Inner::Locked) {
            Inner::Unlocked(_) => unreachable!("checked above"),
            Inner::Unlocking { staged } => {
                if !verify_password(password, &staged.master_hash) {
                    tracing::info!("unlock rejected: password digest mismatch");
                    return Err(VaultError::WrongPassword);
                }
                let unlocked = open_document(&staged, password)?;
                tracing::info!(
                    information = unlocked.information.len(),
                    credentials = unlocked.credentials.len(),
                    "vault unlocked"
                );
                self.inner = Inner::Unlocked(Box::new(unlocked));
                Ok(())
            }
            Inner::Locked => {
                let unlocked = create_fresh(password)?;
                tracing::info!("created fresh vault");
                self.inner = Inner::Unlocked(Box::new(unlocked));
                Ok(())
            }
        }
    }

    /// Wipe key material and plaintext collections, returning to
    /// `Locked`. Dropping the unlocked state zeroizes the strings.
    pub(crate) fn wipe(&mut self) {
        if matches!(self.inner, Inner::Unlocked(_)) {
            tracing::info!("vault locked, session wiped");
        }
        self.inner = Inner::Locked;
    }

    /// Re-encrypt the current collections into a fresh document.
    pub(crate) fn seal(&self) -> Result<VaultDocument, VaultError> {
        let vault = self.unlocked()?;

        let mut information = Vec::with_capacity(vault.information.len());
        for item in &vault.information {
            information.push((
                item.name.clone(),
                encrypt_field(&item.value, &vault.field_key)?,
            ));
        }

        let mut credentials = Vec::with_capacity(vault.credentials.len());
        for cred in &vault.credentials {
            credentials.push(CredentialRecord {
                site: cred.site.clone(),
                user: encrypt_field(&cred.user, &vault.field_key)?,
                pass: encrypt_field(&cred.pass, &vault.field_key)?,
            });
        }

        Ok(VaultDocument {
            master_hash: vault.master_hash.clone(),
            kdf_salt: Some(BASE64.encode(vault.kdf_salt)),
            information,
            credentials,
        })
    }

    pub(crate) fn unlocked(&self) -> Result<&UnlockedVault, VaultError> {
        match &self.inner {
            Inner::Unlocked(vault) => Ok(vault),
            _ => Err(VaultError::Locked),
        }
    }

    pub(crate) fn unlocked_mut(&mut self) -> Result<&mut UnlockedVault, VaultError> {
        match &mut self.inner {
            Inner::Unlocked(vault) => Ok(vault),
            _ => Err(VaultError::Locked),
        }
    }

    /// Plaintext information items; fails while locked.
    pub fn information(&self) -> Result<&[InformationItem], VaultError> {
        Ok(&self.unlocked()?.information)
    }

    /// Plaintext credentials; fails while locked.
    pub fn credentials(&self) -> Result<&[Credential], VaultError> {
        Ok(&self.unlocked()?.credentials)
    }
}

/// Build a fresh unlocked vault for a first-time password.
fn create_fresh(password: &str) -> Result<UnlockedVault, VaultError> {
    let kdf_salt = generate_salt();
    let field_key = derive_field_key(password, Some(&kdf_salt))?;
    Ok(UnlockedVault {
        master_key: SecretString::from(password.to_owned()),
        master_hash: hash_password(password),
        kdf_salt,
        field_key,
        information: Vec::new(),
        credentials: Vec::new(),
    })
}

/// Decrypt a verified staged document into plaintext collections.
///
/// Individual field failures degrade to the placeholder; the load as
/// a whole only fails on key-derivation problems.
fn open_document(document: &VaultDocument, password: &str) -> Result<UnlockedVault, VaultError> {
    // Legacy documents carry no salt and decrypt with the unsalted
    // key; they get a fresh salt here so the next save upgrades them.
    let stored_salt = match &document.kdf_salt {
        Some(encoded) => Some(decode_salt(encoded)?),
        None => None,
    };
    let field_key = derive_field_key(password, stored_salt.as_ref().map(|s| &s[..]))?;
    let kdf_salt = stored_salt.unwrap_or_else(generate_salt);

    let information = document
        .information
        .iter()
        .map(|(name, ciphertext)| InformationItem {
            name: name.clone(),
            value: decrypt_or_placeholder(ciphertext, &field_key, name),
        })
        .collect();

    let credentials = document
        .credentials
        .iter()
        .map(|record| Credential {
            site: record.site.clone(),
            user: decrypt_or_placeholder(&record.user, &field_key, &record.site),
            pass: decrypt_or_placeholder(&record.pass, &field_key, &record.site),
        })
        .collect();

    Ok(UnlockedVault {
        master_key: SecretString::from(password.to_owned()),
        master_hash: document.master_hash.clone(),
        kdf_salt,
        field_key,
        information,
        credentials,
    })
}

fn decrypt_or_placeholder(ciphertext: &str, key: &FieldKey, label: &str) -> String {
    match decrypt_field(ciphertext, key) {
        Ok(plaintext) => plaintext,
        Err(crypto::DecryptionFailed) => {
            tracing::warn!(field = %label, "field failed to decrypt, substituting placeholder");
            DECRYPTION_FAILED_PLACEHOLDER.to_owned()
        }
    }
}

fn decode_salt(encoded: &str) -> Result<[u8; KDF_SALT_LEN], VaultError> {
    let raw = BASE64
        .decode(encoded)
        .map_err(|e| crypto::CryptoError::InvalidSalt(e.to_string()))?;
    let salt: [u8; KDF_SALT_LEN] = raw.try_into().map_err(|raw: Vec<u8>| {
        crypto::CryptoError::InvalidSalt(format!(
            "expected {KDF_SALT_LEN} bytes, got {}",
            raw.len()
        ))
    })?;
    Ok(salt)
}
