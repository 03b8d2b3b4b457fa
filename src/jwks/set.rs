//! Immutable key set and JWKS document decoding.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::KeySourceError;
use crate::jwks::key::Key;
use crate::jwks::KeySource;

/// JSON Web Key as published in a JWKS document.
///
/// Only the fields used for verification are kept; anything else in the
/// document is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Jwk {
    /// Algorithm
    #[serde(default)]
    pub alg: String,
    /// Key ID
    #[serde(default)]
    pub kid: String,
    /// Base64url-encoded raw public key
    #[serde(default)]
    pub x: String,
}

/// JSON Web Key Set document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Jwks {
    /// List of keys
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

/// Snapshot of verification keys indexed by key ID.
///
/// Never mutated once built. Refreshing sources publish a new set instead.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, Arc<Key>>,
}

impl KeySet {
    /// Creates an empty key set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JWKS document held in a string.
    ///
    /// # Errors
    ///
    /// [`KeySourceError::Decode`] when the JSON or any `x` value is malformed.
    pub fn from_json(json: &str) -> Result<Self, KeySourceError> {
        Self::from_slice(json.as_bytes())
    }

    /// Parses a JWKS document from raw bytes.
    ///
    /// # Errors
    ///
    /// [`KeySourceError::Decode`] when the JSON or any `x` value is malformed.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeySourceError> {
        let document: Jwks = serde_json::from_slice(bytes).map_err(|e| KeySourceError::Decode {
            document: "JWKS",
            reason: e.to_string(),
        })?;
        Self::try_from(document)
    }

    /// Looks up a key by ID.
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<Arc<Key>> {
        self.keys.get(kid).cloned()
    }

    /// Number of keys in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl TryFrom<Jwks> for KeySet {
    type Error = KeySourceError;

    fn try_from(document: Jwks) -> Result<Self, Self::Error> {
        let mut keys = HashMap::with_capacity(document.keys.len());

        for jwk in document.keys {
            let material = URL_SAFE_NO_PAD
                .decode(jwk.x.as_bytes())
                .map_err(|e| KeySourceError::Decode {
                    document: "JWKS",
                    reason: format!("key {:?}: invalid x: {e}", jwk.kid),
                })?;

            // The first entry wins when a document repeats a kid.
            if let Entry::Vacant(slot) = keys.entry(jwk.kid) {
                slot.insert(Arc::new(Key::new(jwk.alg, material)));
            }
        }

        Ok(Self { keys })
    }
}

impl FromIterator<(String, Key)> for KeySet {
    fn from_iter<I: IntoIterator<Item = (String, Key)>>(iter: I) -> Self {
        let mut keys = HashMap::new();
        for (kid, key) in iter {
            keys.entry(kid).or_insert_with(|| Arc::new(key));
        }
        Self { keys }
    }
}

impl KeySource for KeySet {
    fn get(&self, kid: &str) -> Option<Arc<Key>> {
        Self::get(self, kid)
    }
}
