//! Property-Based Tests for token validation
//!
//! Uses proptest for invariant verification.
//! Each test runs minimum 100 iterations.

mod common;

use std::sync::OnceLock;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use common::{NOW, TestKey, fixed_clock, jwks};
use jwks_validator::jwt::token::decode_segment;
use jwks_validator::{KeySet, ValidationError, Validator};
use proptest::prelude::*;
use serde_json::json;

/// Key generation is comparatively slow; one key serves every case.
fn signer() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(|| TestKey::generate("signer"))
}

fn validator(skew: u32) -> Validator {
    let set = KeySet::from_json(&jwks(&[signer()]).to_string()).unwrap();
    Validator::new(set, fixed_clock().with_clock_skew(skew))
}

fn base64url_symbol() -> impl Strategy<Value = u8> {
    prop::sample::select(
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_".to_vec(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Changing any single character of the signed payload segment breaks
    /// the signature; the payload is never decoded.
    #[test]
    fn tampered_payload_never_validates(
        sub in "[a-zA-Z0-9]{1,32}",
        position in any::<prop::sample::Index>(),
        replacement in base64url_symbol(),
    ) {
        let token = signer().sign(&json!({"sub": sub}));
        let start = token.find('.').unwrap() + 1;
        let end = token.rfind('.').unwrap();

        let mut bytes = token.into_bytes();
        let idx = start + position.index(end - start);
        prop_assume!(bytes[idx] != replacement);
        bytes[idx] = replacement;

        prop_assert_eq!(validator(60).validate(&bytes), Err(ValidationError::InvalidSignature));
    }

    /// Flipping bits of any decoded signature byte fails verification.
    #[test]
    fn flipped_signature_byte_is_invalid(
        position in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let token = signer().sign(&json!({"sub": "a"}));
        let (signing_input, signature) = token.rsplit_once('.').unwrap();

        let mut raw = decode_segment(signature.as_bytes()).unwrap();
        let idx = position.index(raw.len());
        raw[idx] ^= mask;
        let tampered = format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(&raw));

        prop_assert_eq!(validator(60).validate(&tampered), Err(ValidationError::InvalidSignature));
    }

    /// Replacing any encoded signature character fails verification unless
    /// the decoded signature is unchanged.
    #[test]
    fn swapped_signature_symbol_is_invalid(
        position in any::<prop::sample::Index>(),
        replacement in base64url_symbol(),
    ) {
        let token = signer().sign(&json!({"sub": "a"}));
        let (signing_input, signature) = token.rsplit_once('.').unwrap();

        let mut symbols = signature.as_bytes().to_vec();
        let idx = position.index(symbols.len());
        prop_assume!(symbols[idx] != replacement);
        symbols[idx] = replacement;
        prop_assume!(decode_segment(&symbols).unwrap() != decode_segment(signature.as_bytes()).unwrap());

        let mut tampered = format!("{signing_input}.").into_bytes();
        tampered.extend_from_slice(&symbols);

        prop_assert_eq!(validator(60).validate(&tampered), Err(ValidationError::InvalidSignature));
    }

    /// A token whose key ID is not published fails with that key ID.
    #[test]
    fn unpublished_kid_is_unknown(kid in "[a-z0-9-]{1,24}") {
        prop_assume!(kid != signer().kid);

        let other = TestKey::generate(&kid);
        let result = validator(60).validate(other.sign(&json!({})));
        prop_assert_eq!(result, Err(ValidationError::UnknownKey { kid }));
    }

    /// A token expiring `age` seconds ago is accepted exactly when the
    /// skew covers the age.
    #[test]
    fn expiry_is_accepted_within_skew(age in 1i64..10_000, skew in 0u32..10_000) {
        let token = signer().sign(&json!({"exp": NOW - age}));
        let result = validator(skew).validate(&token);

        if age <= i64::from(skew) {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(ValidationError::Expired { elapsed: age - i64::from(skew) }));
        }
    }

    /// `nbf` in the future is accepted exactly when the skew covers it.
    #[test]
    fn not_before_is_accepted_within_skew(ahead in 1i64..10_000, skew in 0u32..10_000) {
        let token = signer().sign(&json!({"nbf": NOW + ahead}));
        let result = validator(skew).validate(&token);

        if ahead <= i64::from(skew) {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(ValidationError::NotYetValid { remaining: ahead - i64::from(skew) }));
        }
    }

    /// Arbitrary input never panics the validator.
    #[test]
    fn arbitrary_input_is_rejected_gracefully(input in prop::collection::vec(any::<u8>(), 0..256)) {
        prop_assert!(validator(60).validate(&input).is_err());
    }
}
