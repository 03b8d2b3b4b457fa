//! Error handling module with type-safe, non-exhaustive error types
//!
//! Two families of errors live here:
//! - [`ValidationError`]: returned by token validation, fail-fast
//! - [`KeySourceError`]: key source construction and background refresh failures
//!
//! Refresh failures never reach validation callers. They are reported to the
//! optional error handler configured on the refreshing key source.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced while validating a compact token.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Token structure, header or signature encoding is malformed
    #[error("Token malformed: {reason}")]
    MalformedToken {
        /// Description of the malformation
        reason: String,
    },

    /// Signed payload could not be decoded as a JSON claims object
    #[error("Token payload malformed: {reason}")]
    MalformedPayload {
        /// Description of the malformation
        reason: String,
    },

    /// No key is published under the token's `kid`
    #[error("Unknown signing key: {kid:?}")]
    UnknownKey {
        /// Key identifier from the token header
        kid: String,
    },

    /// The key names an algorithm this crate cannot verify
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm {
        /// Algorithm tag carried by the key
        algorithm: String,
    },

    /// Token signature verification failed
    #[error("Token signature invalid")]
    InvalidSignature,

    /// `iss` claim does not match the expected issuer
    #[error("Invalid token issuer")]
    InvalidIssuer,

    /// `aud` claim does not contain the expected audience
    #[error("Invalid token audience")]
    InvalidAudience,

    /// `aud` claim is neither a string nor an array
    #[error("Malformed token audience: expected string or array, found {found}")]
    MalformedAudience {
        /// JSON type found in the claim
        found: &'static str,
    },

    /// `iat` claim lies in the future beyond the allowed skew
    #[error("Token isn't issued yet")]
    NotYetIssued,

    /// `nbf` claim lies in the future beyond the allowed skew
    #[error("Token is not valid for another {remaining} seconds")]
    NotYetValid {
        /// Seconds until the token becomes valid
        remaining: i64,
    },

    /// `exp` claim lies in the past beyond the allowed skew
    #[error("Token expired {elapsed} seconds ago")]
    Expired {
        /// Seconds since the token expired
        elapsed: i64,
    },

    /// Caller destination could not be built from the payload
    #[error("Failed to deserialize token payload: {reason}")]
    Deserialize {
        /// Decoder error message
        reason: String,
    },
}

/// Stable error codes for logs, metrics and API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MalformedToken,
    MalformedPayload,
    UnknownKey,
    UnsupportedAlgorithm,
    InvalidSignature,
    InvalidIssuer,
    InvalidAudience,
    MalformedAudience,
    NotYetIssued,
    NotYetValid,
    Expired,
    Deserialize,
    KeySourceFetch,
    DiscoveryIssuerMismatch,
    KeySourceConstruction,
}

impl ErrorCode {
    /// Get the string representation of the error code
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedToken => "JWT_MALFORMED_TOKEN",
            Self::MalformedPayload => "JWT_MALFORMED_PAYLOAD",
            Self::UnknownKey => "JWT_UNKNOWN_KEY",
            Self::UnsupportedAlgorithm => "JWT_UNSUPPORTED_ALGORITHM",
            Self::InvalidSignature => "JWT_INVALID_SIGNATURE",
            Self::InvalidIssuer => "JWT_INVALID_ISSUER",
            Self::InvalidAudience => "JWT_INVALID_AUDIENCE",
            Self::MalformedAudience => "JWT_MALFORMED_AUDIENCE",
            Self::NotYetIssued => "JWT_NOT_YET_ISSUED",
            Self::NotYetValid => "JWT_NOT_YET_VALID",
            Self::Expired => "JWT_EXPIRED",
            Self::Deserialize => "JWT_DESERIALIZE",
            Self::KeySourceFetch => "JWKS_FETCH_ERROR",
            Self::DiscoveryIssuerMismatch => "JWKS_DISCOVERY_ISSUER_MISMATCH",
            Self::KeySourceConstruction => "JWKS_CONSTRUCTION_ERROR",
        }
    }
}

impl ValidationError {
    /// Get the error code for this error
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedToken { .. } => ErrorCode::MalformedToken,
            Self::MalformedPayload { .. } => ErrorCode::MalformedPayload,
            Self::UnknownKey { .. } => ErrorCode::UnknownKey,
            Self::UnsupportedAlgorithm { .. } => ErrorCode::UnsupportedAlgorithm,
            Self::InvalidSignature => ErrorCode::InvalidSignature,
            Self::InvalidIssuer => ErrorCode::InvalidIssuer,
            Self::InvalidAudience => ErrorCode::InvalidAudience,
            Self::MalformedAudience { .. } => ErrorCode::MalformedAudience,
            Self::NotYetIssued => ErrorCode::NotYetIssued,
            Self::NotYetValid { .. } => ErrorCode::NotYetValid,
            Self::Expired { .. } => ErrorCode::Expired,
            Self::Deserialize { .. } => ErrorCode::Deserialize,
        }
    }

    /// True for failures raised by claim validation, i.e. after the
    /// signature was accepted.
    #[must_use]
    pub const fn is_claims_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIssuer
                | Self::InvalidAudience
                | Self::MalformedAudience { .. }
                | Self::NotYetIssued
                | Self::NotYetValid { .. }
                | Self::Expired { .. }
        )
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_payload(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }
}

/// Errors raised by key sources.
///
/// Construction variants are fatal and returned from the constructor.
/// Fetch variants are non-fatal and only reach the refresh error handler.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum KeySourceError {
    /// HTTP request could not be performed
    #[error("Failed to fetch {url}: {reason}")]
    Fetch {
        /// Requested URL
        url: String,
        /// Transport error description
        reason: String,
    },

    /// HTTP request timed out
    #[error("Request to {url} timed out")]
    Timeout {
        /// Requested URL
        url: String,
    },

    /// Endpoint answered with a non-2xx status
    #[error("Invalid response code from {url}: {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Response body is larger than the configured cap
    #[error("Response from {url} exceeds {limit} bytes")]
    BodyTooLarge {
        /// Requested URL
        url: String,
        /// Configured cap in bytes
        limit: usize,
    },

    /// Document or key material could not be decoded
    #[error("Failed to decode {document}: {reason}")]
    Decode {
        /// Which document failed ("JWKS", "Discovery")
        document: &'static str,
        /// Decoder error description
        reason: String,
    },

    /// Discovery document names a different issuer than configured
    #[error("Mismatching issuer: discovered {discovered}, expected {expected}")]
    DiscoveryIssuerMismatch {
        /// Configured issuer
        expected: String,
        /// Issuer found in the discovery document
        discovered: String,
    },

    /// PEM input is not a single `PUBLIC KEY` block
    #[error("Invalid PEM public key: {reason}")]
    InvalidPem {
        /// Description of the problem
        reason: String,
    },

    /// Public key is not an Ed25519 key
    #[error("Unsupported key type: {reason}")]
    UnsupportedKeyType {
        /// Description of the key found
        reason: String,
    },

    /// Raw key material has the wrong shape
    #[error("Invalid key material: {reason}")]
    InvalidKeyMaterial {
        /// Description of the problem
        reason: String,
    },

    /// Endpoint URL cannot be parsed
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Parser error description
        reason: String,
    },

    /// HTTP client could not be built
    #[error("Failed to create HTTP client: {reason}")]
    HttpClient {
        /// Builder error description
        reason: String,
    },

    /// Refresh configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl KeySourceError {
    /// Get the error code for this error
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Fetch { .. }
            | Self::Timeout { .. }
            | Self::Status { .. }
            | Self::BodyTooLarge { .. }
            | Self::Decode { .. } => {
                ErrorCode::KeySourceFetch
            }
            Self::DiscoveryIssuerMismatch { .. } => ErrorCode::DiscoveryIssuerMismatch,
            Self::InvalidPem { .. }
            | Self::UnsupportedKeyType { .. }
            | Self::InvalidKeyMaterial { .. }
            | Self::InvalidUrl { .. }
            | Self::HttpClient { .. }
            | Self::Config(_) => ErrorCode::KeySourceConstruction,
        }
    }

    /// Check if a later refresh attempt may succeed where this one failed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// True when the error can only come from a constructor
    #[must_use]
    pub fn is_construction_error(&self) -> bool {
        self.code() == ErrorCode::KeySourceConstruction
    }
}

impl From<reqwest::Error> for KeySourceError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(ToString::to_string)
            .unwrap_or_default();

        if err.is_timeout() {
            Self::Timeout { url }
        } else if err.is_decode() {
            Self::Decode {
                document: "response body",
                reason: err.to_string(),
            }
        } else {
            Self::Fetch {
                url,
                reason: err.to_string(),
            }
        }
    }
}
