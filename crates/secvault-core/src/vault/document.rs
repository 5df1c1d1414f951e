//! The durable vault document and the in-memory plaintext model.
//!
//! On disk the vault is one UTF-8 JSON object:
//!
//! ```json
//! {
//!   "masterHash": "<hex sha-256 of the master password>",
//!   "kdfSalt": "<base64, absent on legacy documents>",
//!   "information": { "<name>": "<ciphertext>" },
//!   "credentials": [ { "site": "...", "user": "<ct>", "pass": "<ct>" } ]
//! }
//! ```
//!
//! `site` is a plaintext label; `user`, `pass` and every information
//! value are ciphertext. `masterHash` verifies the password and is
//! never key material.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Placeholder shown in place of a field that failed to decrypt.
pub const DECRYPTION_FAILED_PLACEHOLDER: &str = "[Decryption Failed]";

/// A named plaintext information item. Names are unique per vault.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct InformationItem {
    pub name: String,
    pub value: String,
}

/// A plaintext website credential. Duplicate sites are allowed;
/// credentials are identified by position only.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    pub site: String,
    pub user: String,
    pub pass: String,
}

/// One credential entry as persisted: plaintext site, encrypted rest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialRecord {
    pub site: String,
    pub user: String,
    pub pass: String,
}

/// The encrypted, durable form of a vault.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VaultDocument {
    pub master_hash: String,

    /// Key-derivation salt, base64. Absent on documents written by the
    /// legacy implementation; those decrypt with the unsalted key and
    /// are upgraded on the next save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf_salt: Option<String>,

    /// Name -> ciphertext, insertion-ordered.
    #[serde(default, with = "info_map")]
    pub information: Vec<(String, String)>,

    #[serde(default)]
    pub credentials: Vec<CredentialRecord>,
}

impl VaultDocument {
    /// Parse a document from backend bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Serialize for the backend. Pretty-printed, matching what the
    /// legacy implementation wrote.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

/// Serialize `Vec<(name, ciphertext)>` as a JSON object while keeping
/// insertion order, which a sorted map type would destroy. Duplicate
/// names on input collapse last-write-wins.
mod info_map {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(entries: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (name, ciphertext) in entries {
            map.serialize_entry(name, ciphertext)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct InfoMapVisitor;

        impl<'de> Visitor<'de> for InfoMapVisitor {
            type Value = Vec<(String, String)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of information names to ciphertext")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, String)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, ciphertext)) = access.next_entry::<String, String>()? {
                    if let Some(existing) = entries.iter_mut().find(|(n, _)| *n == name) {
                        existing.1 = ciphertext;
                    } else {
                        entries.push((name, ciphertext));
                    }
                }
                Ok(entries)
            }
        }

        deserializer.deserialize_map(InfoMapVisitor)
    }
}
