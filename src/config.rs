//! Type-Safe Configuration with Validation
//!
//! Provides the validator and refresh configuration with builder methods
//! and environment variable support.

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::KeySourceError;
use crate::http::HttpConfig;
use crate::metrics::KeySourceMetrics;

/// Default tolerance applied to time-bound claims.
pub const DEFAULT_CLOCK_SKEW_SECONDS: u32 = 60;

/// Default interval between two JWKS refresh attempts.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

/// Source of the current time used for claim validation.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Callback receiving non-fatal refresh errors.
pub type ErrorHandler = Arc<dyn Fn(&KeySourceError) + Send + Sync>;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Refresh interval of zero
    #[error("Invalid refresh interval: must be greater than 0")]
    InvalidInterval,

    /// HTTP timeout of zero
    #[error("Invalid HTTP timeout: must be greater than 0")]
    InvalidTimeout,

    /// Response body cap of zero
    #[error("Invalid response body cap: must be greater than 0")]
    InvalidBodyLimit,

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError { name: String, reason: String },
}

/// Token validation settings.
#[derive(Clone)]
pub struct ValidatorConfig {
    /// Expected `iss` claim. `None` inherits the key source's issuer.
    pub issuer: Option<String>,
    /// Expected `aud` entry
    pub audience: Option<String>,
    /// Current time provider
    pub clock: Clock,
    /// Tolerance applied to `iat`, `nbf` and `exp`
    pub clock_skew_seconds: u32,
    /// Whether claims are checked at all
    pub validate_claims: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: None,
            clock: Arc::new(Utc::now),
            clock_skew_seconds: DEFAULT_CLOCK_SKEW_SECONDS,
            validate_claims: true,
        }
    }
}

impl fmt::Debug for ValidatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("clock_skew_seconds", &self.clock_skew_seconds)
            .field("validate_claims", &self.validate_claims)
            .finish_non_exhaustive()
    }
}

impl ValidatorConfig {
    /// Loads configuration from environment variables.
    ///
    /// Reads `JWT_ISSUER`, `JWT_AUDIENCE`, `JWT_CLOCK_SKEW_SECONDS` and
    /// `JWT_VALIDATE_CLAIMS`, after loading a `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            issuer: lookup("JWT_ISSUER").filter(|s| !s.is_empty()),
            audience: lookup("JWT_AUDIENCE").filter(|s| !s.is_empty()),
            clock_skew_seconds: parse_var(
                &lookup,
                "JWT_CLOCK_SKEW_SECONDS",
                defaults.clock_skew_seconds,
            )?,
            validate_claims: parse_var(&lookup, "JWT_VALIDATE_CLAIMS", defaults.validate_claims)?,
            ..defaults
        })
    }

    /// Sets the expected issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the expected audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Replaces the wall clock, e.g. with a fixed instant in tests.
    #[must_use]
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets the clock skew tolerance in seconds.
    #[must_use]
    pub const fn with_clock_skew(mut self, seconds: u32) -> Self {
        self.clock_skew_seconds = seconds;
        self
    }

    /// Disables issuer, audience and time claim checks.
    #[must_use]
    pub const fn without_claim_validation(mut self) -> Self {
        self.validate_claims = false;
        self
    }
}

/// Settings for key sources that refresh in the background.
#[derive(Clone)]
pub struct RefreshConfig {
    /// Delay between two refresh attempts
    pub interval: Duration,
    /// HTTP client settings
    pub http: HttpConfig,
    /// Receives non-fatal refresh errors; `None` drops them
    pub error_handler: Option<ErrorHandler>,
    /// Optional refresh metrics
    pub metrics: Option<Arc<KeySourceMetrics>>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            http: HttpConfig::default(),
            error_handler: None,
            metrics: None,
        }
    }
}

impl fmt::Debug for RefreshConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshConfig")
            .field("interval", &self.interval)
            .field("http", &self.http)
            .field("error_handler", &self.error_handler.is_some())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl RefreshConfig {
    /// Loads configuration from environment variables.
    ///
    /// Reads `JWKS_REFRESH_INTERVAL_SECONDS`, `JWKS_HTTP_TIMEOUT_SECONDS`
    /// and `JWKS_HTTP_MAX_BODY_BYTES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let interval = parse_var(
            &lookup,
            "JWKS_REFRESH_INTERVAL_SECONDS",
            defaults.interval.as_secs(),
        )?;
        let timeout = parse_var(
            &lookup,
            "JWKS_HTTP_TIMEOUT_SECONDS",
            defaults.http.timeout.as_secs(),
        )?;
        let max_body_bytes = parse_var(
            &lookup,
            "JWKS_HTTP_MAX_BODY_BYTES",
            defaults.http.max_body_bytes,
        )?;

        let config = Self {
            interval: Duration::from_secs(interval),
            http: defaults
                .http
                .with_timeout(Duration::from_secs(timeout))
                .with_max_body_bytes(max_body_bytes),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    /// Sets the refresh interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the HTTP client settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Installs a handler for non-fatal refresh errors.
    #[must_use]
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&KeySourceError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Records refresh outcomes into the given metrics.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<KeySourceMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }
        if self.http.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.http.max_body_bytes == 0 {
            return Err(ConfigError::InvalidBodyLimit);
        }
        Ok(())
    }
}

/// Parse a variable with a default value.
fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(val) => val.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_validator_defaults() {
        let config = ValidatorConfig::default();
        assert_eq!(config.clock_skew_seconds, 60);
        assert!(config.validate_claims);
        assert!(config.issuer.is_none());
        assert!(config.audience.is_none());
    }

    #[test]
    fn test_validator_from_lookup() {
        let config = ValidatorConfig::from_lookup(lookup_from(&[
            ("JWT_ISSUER", "https://idp.example"),
            ("JWT_AUDIENCE", "svc"),
            ("JWT_CLOCK_SKEW_SECONDS", "5"),
            ("JWT_VALIDATE_CLAIMS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.issuer.as_deref(), Some("https://idp.example"));
        assert_eq!(config.audience.as_deref(), Some("svc"));
        assert_eq!(config.clock_skew_seconds, 5);
        assert!(!config.validate_claims);
    }

    #[test]
    fn test_validator_from_lookup_empty_issuer_is_unset() {
        let config = ValidatorConfig::from_lookup(lookup_from(&[("JWT_ISSUER", "")])).unwrap();
        assert!(config.issuer.is_none());
    }

    #[test]
    fn test_validator_from_lookup_invalid_skew() {
        let result = ValidatorConfig::from_lookup(lookup_from(&[("JWT_CLOCK_SKEW_SECONDS", "-1")]));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_refresh_from_lookup() {
        let config = RefreshConfig::from_lookup(lookup_from(&[
            ("JWKS_REFRESH_INTERVAL_SECONDS", "120"),
            ("JWKS_HTTP_TIMEOUT_SECONDS", "3"),
            ("JWKS_HTTP_MAX_BODY_BYTES", "65536"),
        ]))
        .unwrap();

        assert_eq!(config.interval, Duration::from_secs(120));
        assert_eq!(config.http.timeout, Duration::from_secs(3));
        assert_eq!(config.http.max_body_bytes, 65536);
    }

    #[test]
    fn test_refresh_validation_zero_body_limit() {
        let result = RefreshConfig::from_lookup(lookup_from(&[("JWKS_HTTP_MAX_BODY_BYTES", "0")]));
        assert_eq!(result.unwrap_err(), ConfigError::InvalidBodyLimit);
    }

    #[test]
    fn test_refresh_validation_zero_interval() {
        let result =
            RefreshConfig::from_lookup(lookup_from(&[("JWKS_REFRESH_INTERVAL_SECONDS", "0")]));
        assert_eq!(result.unwrap_err(), ConfigError::InvalidInterval);
    }

    #[test]
    fn test_refresh_validation_zero_timeout() {
        let config = RefreshConfig::default()
            .with_http(HttpConfig::default().with_timeout(Duration::ZERO));
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout));
    }

    #[test]
    fn test_clock_override() {
        let fixed = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let config = ValidatorConfig::default().with_clock(move || fixed);
        assert_eq!((config.clock)().timestamp(), 1_700_000_000);
    }
}
