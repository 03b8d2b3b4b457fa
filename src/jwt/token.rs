//! Type-State compact token with compile-time trust boundary
//!
//! A token is parsed into `Token<Unverified>`, which exposes only the
//! header's `kid`. Verifying the signature yields `Token<Verified>`, the
//! only state that can hand out payload bytes.

use std::marker::PhantomData;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::Value;

use crate::error::ValidationError;
use crate::jwks::Key;

/// Separator between the three token segments.
const SEPARATOR: u8 = b'.';

/// Unpadded base64url that ignores the unused low bits of the last symbol.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

// ============================================================================
// Sealed Trait Pattern for Token States
// ============================================================================

mod private {
    /// Sealed trait to prevent external implementations
    pub trait Sealed {}
}

/// Marker trait for token validation states
pub trait TokenState: private::Sealed {
    /// Human-readable state name for debugging
    fn state_name() -> &'static str;
}

/// Unverified token - split and header decoded, signature not checked
#[derive(Debug)]
pub struct Unverified;
impl private::Sealed for Unverified {}
impl TokenState for Unverified {
    fn state_name() -> &'static str {
        "Unverified"
    }
}

/// Verified token - signature accepted, payload may be trusted
#[derive(Debug)]
pub struct Verified;
impl private::Sealed for Verified {}
impl TokenState for Verified {
    fn state_name() -> &'static str {
        "Verified"
    }
}

// ============================================================================
// Type-State Token Wrapper
// ============================================================================

/// Compact token borrowed from the caller's buffer.
///
/// Segment boundaries are fixed at parse time; segments are never
/// reordered or truncated afterwards.
#[derive(Debug)]
pub struct Token<'a, State: TokenState> {
    /// Raw token bytes
    raw: &'a [u8],
    /// Index of the first separator
    header_end: usize,
    /// Index of the second separator
    payload_end: usize,
    /// Key ID from the header, empty when absent
    kid: String,
    _state: PhantomData<State>,
}

impl<'a> Token<'a, Unverified> {
    /// Splits a compact token and decodes its header.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MalformedToken`] if either separator is missing,
    /// a segment is empty, or the header is not base64url-encoded JSON.
    pub fn parse(raw: &'a [u8]) -> Result<Self, ValidationError> {
        let header_end = find_separator(raw, 0)
            .ok_or_else(|| ValidationError::malformed("missing header separator"))?;
        let payload_end = find_separator(raw, header_end + 1)
            .ok_or_else(|| ValidationError::malformed("missing payload separator"))?;

        if header_end == 0 || payload_end == header_end + 1 || payload_end + 1 == raw.len() {
            return Err(ValidationError::malformed("empty segment"));
        }

        let header = decode_segment(&raw[..header_end])
            .map_err(|e| ValidationError::malformed(format!("invalid header encoding: {e}")))?;
        let header: Value = serde_json::from_slice(&header)
            .map_err(|e| ValidationError::malformed(format!("invalid header: {e}")))?;

        let kid = header
            .get("kid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        Ok(Token {
            raw,
            header_end,
            payload_end,
            kid,
            _state: PhantomData,
        })
    }

    /// Get the key ID from the token header (empty when absent)
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Verifies the signature over `<header>.<payload>` with `key`.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MalformedToken`] for a badly encoded signature,
    /// otherwise whatever [`Key::verify`] reports.
    pub fn verify(self, key: &Key) -> Result<Token<'a, Verified>, ValidationError> {
        let signature = decode_segment(self.signature_segment())
            .map_err(|e| ValidationError::malformed(format!("invalid signature encoding: {e}")))?;

        key.verify(self.signing_input(), &signature)?;

        Ok(Token {
            raw: self.raw,
            header_end: self.header_end,
            payload_end: self.payload_end,
            kid: self.kid,
            _state: PhantomData,
        })
    }
}

impl Token<'_, Verified> {
    /// Decodes the authenticated payload.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MalformedPayload`] if the segment is not base64url.
    pub fn payload(&self) -> Result<Vec<u8>, ValidationError> {
        decode_segment(self.payload_segment())
            .map_err(|e| ValidationError::malformed_payload(format!("invalid encoding: {e}")))
    }
}

// Common methods for all states
impl<S: TokenState> Token<'_, S> {
    /// Encoded header segment
    #[must_use]
    pub fn header_segment(&self) -> &[u8] {
        &self.raw[..self.header_end]
    }

    /// Encoded payload segment
    #[must_use]
    pub fn payload_segment(&self) -> &[u8] {
        &self.raw[self.header_end + 1..self.payload_end]
    }

    /// Encoded signature segment
    #[must_use]
    pub fn signature_segment(&self) -> &[u8] {
        &self.raw[self.payload_end + 1..]
    }

    /// Bytes covered by the signature: `<header>.<payload>` as transmitted
    #[must_use]
    pub fn signing_input(&self) -> &[u8] {
        &self.raw[..self.payload_end]
    }

    /// Get the current state name
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }
}

/// Decodes one unpadded base64url segment.
///
/// Padding is rejected. Non-zero unused bits in the final symbol are not.
pub fn decode_segment(segment: &[u8]) -> Result<Vec<u8>, base64::DecodeError> {
    SEGMENT_ENGINE.decode(segment)
}

fn find_separator(raw: &[u8], from: usize) -> Option<usize> {
    raw.get(from..)?
        .iter()
        .position(|&b| b == SEPARATOR)
        .map(|idx| idx + from)
}
