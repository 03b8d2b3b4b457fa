//! JWKS Validator - compact EdDSA token verification over rotating key sets.
//!
//! Tokens are verified against a [`KeySource`]: a single static key, a fixed
//! JWKS document, a JWKS URL refreshed in the background, or an OpenID
//! discovery endpoint. Validation never waits on the network; refreshing
//! sources publish immutable key set snapshots that lookups read lock-free.
//!
//! ```no_run
//! use jwks_validator::{StaticKeySource, Validator, ValidatorConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = StaticKeySource::from_ed25519_pem(
//!     "-----BEGIN PUBLIC KEY-----\n\
//!      MCowBQYDK2VwAyEAwmK6SSAu2E9V7uynkCKEaj5nZJyTvNG4x0KohsRzLpg=\n\
//!      -----END PUBLIC KEY-----",
//! )?;
//! let validator = Validator::new(source, ValidatorConfig::default().with_audience("svc"));
//! let claims: serde_json::Value = validator.validate_into("header.payload.signature")?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod http;
pub mod jwks;
pub mod jwt;
pub mod metrics;
pub mod observability;
pub mod shutdown;

pub use config::{RefreshConfig, ValidatorConfig};
pub use error::{ErrorCode, KeySourceError, ValidationError};
pub use jwks::{
    DiscoveryKeySource, Key, KeySet, KeySource, RefreshState, StaticKeySource, UrlKeySource,
};
pub use jwt::{JsonDecoder, PayloadDecoder, Validator};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
