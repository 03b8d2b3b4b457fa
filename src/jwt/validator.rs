//! Token validator over a pluggable key source
//!
//! Validation is fail-fast and runs in a fixed order:
//! split and header decode, key lookup by `kid`, signature verification,
//! claim checks, then decoding into the caller's type.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::{Clock, ValidatorConfig};
use crate::error::ValidationError;
use crate::jwks::KeySource;
use crate::jwt::claims::{ClaimRules, Claims};
use crate::jwt::token::{Token, Unverified, Verified};
use crate::metrics::ValidatorMetrics;

/// Decodes verified payload bytes into a caller-chosen type.
pub trait PayloadDecoder: Send + Sync {
    /// Builds `T` from the JSON payload.
    ///
    /// # Errors
    ///
    /// A human-readable reason, surfaced as [`ValidationError::Deserialize`].
    fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T, String>;
}

/// Default decoder backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl PayloadDecoder for JsonDecoder {
    fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T, String> {
        serde_json::from_slice(payload).map_err(|e| e.to_string())
    }
}

/// Verifies compact EdDSA tokens against a [`KeySource`].
///
/// Shareable across threads; validation never blocks on key refreshes.
pub struct Validator<D = JsonDecoder> {
    source: Arc<dyn KeySource>,
    issuer: Option<String>,
    audience: Option<String>,
    clock: Clock,
    clock_skew_seconds: i64,
    validate_claims: bool,
    decoder: D,
    metrics: Option<Arc<ValidatorMetrics>>,
}

impl Validator<JsonDecoder> {
    /// Creates a validator decoding payloads with `serde_json`.
    ///
    /// When `config.issuer` is unset the source's own issuer, if any, is
    /// required instead.
    pub fn new<S>(source: S, config: ValidatorConfig) -> Self
    where
        S: KeySource + 'static,
    {
        Self::with_decoder(source, config, JsonDecoder)
    }
}

impl<D: PayloadDecoder> Validator<D> {
    /// Creates a validator with a custom payload decoder.
    pub fn with_decoder<S>(source: S, config: ValidatorConfig, decoder: D) -> Self
    where
        S: KeySource + 'static,
    {
        let issuer = config
            .issuer
            .or_else(|| source.issuer().map(str::to_owned))
            .filter(|issuer| !issuer.is_empty());

        Self {
            source: Arc::new(source),
            issuer,
            audience: config.audience.filter(|audience| !audience.is_empty()),
            clock: config.clock,
            clock_skew_seconds: i64::from(config.clock_skew_seconds),
            validate_claims: config.validate_claims,
            decoder,
            metrics: None,
        }
    }

    /// Records every validation outcome into `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<ValidatorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Issuer required in `iss`, if any
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// Audience required in `aud`, if any
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }

    /// Validates a token without decoding its payload for the caller.
    ///
    /// # Errors
    ///
    /// The first [`ValidationError`] hit by the validation steps.
    #[instrument(skip_all)]
    pub fn validate(&self, token: impl AsRef<[u8]>) -> Result<(), ValidationError> {
        let result = self.authenticate(token.as_ref()).and_then(|verified| {
            if self.validate_claims {
                self.check_claims(&verified.payload()?)?;
            }
            Ok(())
        });

        self.observe(result.as_ref().copied());
        result
    }

    /// Validates a token and decodes its payload into `T`.
    ///
    /// # Errors
    ///
    /// The first [`ValidationError`] hit by the validation steps, or
    /// [`ValidationError::Deserialize`] when `T` cannot be built.
    #[instrument(skip_all)]
    pub fn validate_into<T: DeserializeOwned>(
        &self,
        token: impl AsRef<[u8]>,
    ) -> Result<T, ValidationError> {
        let result = self.authenticate(token.as_ref()).and_then(|verified| {
            let payload = verified.payload()?;
            if self.validate_claims {
                self.check_claims(&payload)?;
            }
            self.decoder
                .decode(&payload)
                .map_err(|reason| ValidationError::Deserialize { reason })
        });

        self.observe(result.as_ref().map(|_| ()));
        result
    }

    /// Parses the token, looks up its key and verifies the signature.
    fn authenticate<'a>(&self, raw: &'a [u8]) -> Result<Token<'a, Verified>, ValidationError> {
        let token = Token::<Unverified>::parse(raw)?;

        let key = self
            .source
            .get(token.kid())
            .ok_or_else(|| ValidationError::UnknownKey {
                kid: token.kid().to_string(),
            })?;

        token.verify(&key)
    }

    fn check_claims(&self, payload: &[u8]) -> Result<(), ValidationError> {
        let document: Value = serde_json::from_slice(payload)
            .map_err(|e| ValidationError::malformed_payload(e.to_string()))?;

        let rules = ClaimRules {
            issuer: self.issuer.as_deref(),
            audience: self.audience.as_deref(),
            now: (self.clock)().timestamp(),
            clock_skew_seconds: self.clock_skew_seconds,
        };
        rules.check(&Claims::new(&document))
    }

    fn observe(&self, result: Result<(), &ValidationError>) {
        if let Err(err) = result {
            debug!(code = err.code().as_str(), error = %err, "Token rejected");
        }
        if let Some(metrics) = &self.metrics {
            metrics.record(result);
        }
    }
}

impl<D> fmt::Debug for Validator<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("clock_skew_seconds", &self.clock_skew_seconds)
            .field("validate_claims", &self.validate_claims)
            .finish_non_exhaustive()
    }
}
