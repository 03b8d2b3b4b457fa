//! Single-key sources built from raw or PEM-encoded Ed25519 public keys.

use std::sync::Arc;

use x509_parser::oid_registry::OID_SIG_ED25519;
use x509_parser::prelude::{FromDer, SubjectPublicKeyInfo};

use crate::error::KeySourceError;
use crate::jwks::KeySource;
use crate::jwks::key::{ED25519_KEY_LEN, Key};

const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// Key source returning the same key for every key ID.
#[derive(Debug, Clone)]
pub struct StaticKeySource {
    key: Arc<Key>,
}

impl StaticKeySource {
    /// Wraps an arbitrary key.
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self { key: Arc::new(key) }
    }

    /// Builds an `EdDSA` source from a raw 32-byte Ed25519 public key.
    ///
    /// # Errors
    ///
    /// [`KeySourceError::InvalidKeyMaterial`] if the key is not 32 bytes.
    pub fn from_ed25519(public_key: &[u8]) -> Result<Self, KeySourceError> {
        if public_key.len() != ED25519_KEY_LEN {
            return Err(KeySourceError::InvalidKeyMaterial {
                reason: format!(
                    "Ed25519 public key must be {ED25519_KEY_LEN} bytes, got {}",
                    public_key.len()
                ),
            });
        }
        Ok(Self::new(Key::ed25519(public_key)))
    }

    /// Builds an `EdDSA` source from a PEM `PUBLIC KEY` block.
    ///
    /// The block must hold a DER SubjectPublicKeyInfo for an Ed25519 key.
    ///
    /// # Errors
    ///
    /// - [`KeySourceError::InvalidPem`]: no PEM block, or a different label
    /// - [`KeySourceError::InvalidKeyMaterial`]: malformed DER
    /// - [`KeySourceError::UnsupportedKeyType`]: not an Ed25519 key
    pub fn from_ed25519_pem(pem_data: &str) -> Result<Self, KeySourceError> {
        let block = pem::parse(pem_data.trim()).map_err(|e| KeySourceError::InvalidPem {
            reason: e.to_string(),
        })?;

        if block.tag() != PUBLIC_KEY_LABEL {
            return Err(KeySourceError::InvalidPem {
                reason: format!("expected {PUBLIC_KEY_LABEL:?} block, found {:?}", block.tag()),
            });
        }

        let (_, spki) = SubjectPublicKeyInfo::from_der(block.contents()).map_err(|e| {
            KeySourceError::InvalidKeyMaterial {
                reason: format!("invalid SubjectPublicKeyInfo: {e}"),
            }
        })?;

        if spki.algorithm.algorithm != OID_SIG_ED25519 {
            return Err(KeySourceError::UnsupportedKeyType {
                reason: format!(
                    "not an Ed25519 public key (algorithm {})",
                    spki.algorithm.algorithm
                ),
            });
        }

        Self::from_ed25519(&spki.subject_public_key.data)
    }

    /// The key returned for every lookup
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }
}

impl KeySource for StaticKeySource {
    fn get(&self, _kid: &str) -> Option<Arc<Key>> {
        Some(Arc::clone(&self.key))
    }
}
