//! Verification key and signature check.

use ring::signature::{self, UnparsedPublicKey};

use crate::error::ValidationError;

/// Algorithm tag for Ed25519 signatures.
pub const EDDSA: &str = "EdDSA";

/// Length of a raw Ed25519 public key.
pub const ED25519_KEY_LEN: usize = 32;

/// Public verification key: an algorithm tag plus raw key material.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    algorithm: String,
    material: Vec<u8>,
}

impl Key {
    /// Creates a key from an algorithm tag and raw material.
    pub fn new(algorithm: impl Into<String>, material: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm: algorithm.into(),
            material: material.into(),
        }
    }

    /// Creates an `EdDSA` key from a raw Ed25519 public key.
    pub fn ed25519(public_key: impl Into<Vec<u8>>) -> Self {
        Self::new(EDDSA, public_key)
    }

    /// Algorithm tag, e.g. `"EdDSA"`
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Raw public key bytes
    #[must_use]
    pub fn material(&self) -> &[u8] {
        &self.material
    }

    /// Verifies `signature` over `message` with this key's algorithm.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnsupportedAlgorithm`] for anything but `EdDSA`,
    /// [`ValidationError::InvalidSignature`] when verification fails.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), ValidationError> {
        match self.algorithm.as_str() {
            EDDSA => UnparsedPublicKey::new(&signature::ED25519, &self.material)
                .verify(message, signature)
                .map_err(|_| ValidationError::InvalidSignature),
            other => Err(ValidationError::UnsupportedAlgorithm {
                algorithm: other.to_string(),
            }),
        }
    }
}
