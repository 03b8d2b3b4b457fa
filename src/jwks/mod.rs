//! Key sources for token verification.
//!
//! A [`KeySource`] answers "which key verifies tokens carrying this `kid`?".
//! Four variants are provided:
//! - [`StaticKeySource`]: one fixed key, returned for every `kid`
//! - [`KeySet`]: a fixed set parsed once from a JWKS document
//! - [`UrlKeySource`]: a JWKS document refreshed from a URL in the background
//! - [`DiscoveryKeySource`]: like [`UrlKeySource`], with the JWKS location
//!   taken from the issuer's OpenID discovery document
//!
//! Lookups never touch the network; refreshing sources publish whole
//! [`KeySet`] snapshots that readers load without blocking.

pub mod discovery;
pub mod key;
mod refresher;
pub mod remote;
pub mod set;
pub mod static_key;

use std::sync::Arc;

pub use discovery::DiscoveryKeySource;
pub use key::{ED25519_KEY_LEN, EDDSA, Key};
pub use refresher::RefreshState;
pub use remote::UrlKeySource;
pub use set::{Jwk, Jwks, KeySet};
pub use static_key::StaticKeySource;

/// Lookup of verification keys by key ID.
pub trait KeySource: Send + Sync {
    /// Returns the key published under `kid`, if any.
    fn get(&self, kid: &str) -> Option<Arc<Key>>;

    /// Issuer this source is bound to, if any.
    ///
    /// Validators without an explicit issuer adopt this one.
    fn issuer(&self) -> Option<&str> {
        None
    }
}

impl<T: KeySource + ?Sized> KeySource for Arc<T> {
    fn get(&self, kid: &str) -> Option<Arc<Key>> {
        (**self).get(kid)
    }

    fn issuer(&self) -> Option<&str> {
        (**self).issuer()
    }
}

impl<T: KeySource + ?Sized> KeySource for Box<T> {
    fn get(&self, kid: &str) -> Option<Arc<Key>> {
        (**self).get(kid)
    }

    fn issuer(&self) -> Option<&str> {
        (**self).issuer()
    }
}
