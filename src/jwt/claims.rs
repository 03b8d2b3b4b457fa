//! Registered claim checks run after the signature was accepted.

use serde_json::Value;

use crate::error::ValidationError;

/// Read-only view over a decoded claims document.
///
/// A payload that is valid JSON but not an object has no claims.
#[derive(Debug, Clone, Copy)]
pub struct Claims<'a> {
    value: &'a Value,
}

impl<'a> Claims<'a> {
    /// Wraps a decoded payload
    #[must_use]
    pub const fn new(value: &'a Value) -> Self {
        Self { value }
    }

    /// Raw claim by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.value.get(name)
    }

    /// `iss` when it is a string
    #[must_use]
    pub fn issuer(&self) -> Option<&'a str> {
        self.get("iss").and_then(Value::as_str)
    }

    /// `aud` in whatever shape the token carries it
    #[must_use]
    pub fn audience(&self) -> Option<&'a Value> {
        self.get("aud")
    }

    /// `iat`, absent when missing, zero or not an integer
    #[must_use]
    pub fn issued_at(&self) -> Option<i64> {
        self.timestamp("iat")
    }

    /// `nbf`, absent when missing, zero or not an integer
    #[must_use]
    pub fn not_before(&self) -> Option<i64> {
        self.timestamp("nbf")
    }

    /// `exp`, absent when missing, zero or not an integer
    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        self.timestamp("exp")
    }

    // Only integral seconds count; anything else is treated as absent.
    fn timestamp(&self, name: &str) -> Option<i64> {
        let seconds = self.get(name)?.as_i64()?;
        (seconds != 0).then_some(seconds)
    }
}

/// Expectations a claims document is checked against.
#[derive(Debug, Clone, Copy)]
pub struct ClaimRules<'a> {
    /// Required `iss`, if any
    pub issuer: Option<&'a str>,
    /// Required `aud` entry, if any
    pub audience: Option<&'a str>,
    /// Current time in Unix seconds
    pub now: i64,
    /// Tolerance applied to every time-bound claim
    pub clock_skew_seconds: i64,
}

impl ClaimRules<'_> {
    /// Runs the checks in order: issuer, audience, `iat`, `nbf`, `exp`.
    /// The first failure is returned.
    ///
    /// # Errors
    ///
    /// The [`ValidationError`] claims variant describing the first failed check.
    pub fn check(&self, claims: &Claims<'_>) -> Result<(), ValidationError> {
        self.check_issuer(claims)?;
        self.check_audience(claims)?;
        self.check_times(claims)
    }

    fn check_issuer(&self, claims: &Claims<'_>) -> Result<(), ValidationError> {
        match self.issuer {
            Some(expected) if claims.issuer() != Some(expected) => {
                Err(ValidationError::InvalidIssuer)
            }
            _ => Ok(()),
        }
    }

    fn check_audience(&self, claims: &Claims<'_>) -> Result<(), ValidationError> {
        let Some(expected) = self.audience else {
            return Ok(());
        };

        let matched = match claims.audience() {
            Some(Value::String(aud)) => aud == expected,
            Some(Value::Array(entries)) => entries.iter().any(|e| e.as_str() == Some(expected)),
            Some(other) => {
                return Err(ValidationError::MalformedAudience {
                    found: json_type(other),
                });
            }
            None => false,
        };

        if matched {
            Ok(())
        } else {
            Err(ValidationError::InvalidAudience)
        }
    }

    fn check_times(&self, claims: &Claims<'_>) -> Result<(), ValidationError> {
        let latest = self.now.saturating_add(self.clock_skew_seconds);

        if claims.issued_at().is_some_and(|iat| iat > latest) {
            return Err(ValidationError::NotYetIssued);
        }

        if let Some(nbf) = claims.not_before() {
            let remaining = nbf.saturating_sub(latest);
            if remaining > 0 {
                return Err(ValidationError::NotYetValid { remaining });
            }
        }

        if let Some(exp) = claims.expires_at() {
            let elapsed = self
                .now
                .saturating_sub(exp.saturating_add(self.clock_skew_seconds));
            if elapsed > 0 {
                return Err(ValidationError::Expired { elapsed });
            }
        }

        Ok(())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn rules() -> ClaimRules<'static> {
        ClaimRules {
            issuer: None,
            audience: None,
            now: NOW,
            clock_skew_seconds: 60,
        }
    }

    fn check(rules: &ClaimRules<'_>, payload: &Value) -> Result<(), ValidationError> {
        rules.check(&Claims::new(payload))
    }

    // ========================================================================
    // Issuer
    // ========================================================================

    #[test]
    fn test_issuer_match() {
        let rules = ClaimRules {
            issuer: Some("https://idp.example"),
            ..rules()
        };
        assert!(check(&rules, &json!({"iss": "https://idp.example"})).is_ok());
    }

    #[test]
    fn test_issuer_mismatch_missing_or_wrong_type() {
        let rules = ClaimRules {
            issuer: Some("https://idp.example"),
            ..rules()
        };
        for payload in [
            json!({"iss": "https://idp.example/"}),
            json!({}),
            json!({"iss": 1}),
        ] {
            assert_eq!(check(&rules, &payload), Err(ValidationError::InvalidIssuer));
        }
    }

    #[test]
    fn test_issuer_ignored_when_not_required() {
        assert!(check(&rules(), &json!({"iss": "anyone"})).is_ok());
    }

    // ========================================================================
    // Audience
    // ========================================================================

    #[test]
    fn test_audience_shapes() {
        let rules = ClaimRules {
            audience: Some("svc"),
            ..rules()
        };

        assert!(check(&rules, &json!({"aud": "svc"})).is_ok());
        assert!(check(&rules, &json!({"aud": ["other", "svc"]})).is_ok());
        assert!(check(&rules, &json!({"aud": [1, "svc"]})).is_ok());

        assert_eq!(
            check(&rules, &json!({"aud": "other"})),
            Err(ValidationError::InvalidAudience)
        );
        assert_eq!(
            check(&rules, &json!({"aud": ["other"]})),
            Err(ValidationError::InvalidAudience)
        );
        assert_eq!(
            check(&rules, &json!({"aud": []})),
            Err(ValidationError::InvalidAudience)
        );
        assert_eq!(check(&rules, &json!({})), Err(ValidationError::InvalidAudience));
    }

    #[test]
    fn test_audience_malformed() {
        let rules = ClaimRules {
            audience: Some("svc"),
            ..rules()
        };
        assert_eq!(
            check(&rules, &json!({"aud": 42})),
            Err(ValidationError::MalformedAudience { found: "number" })
        );
        assert_eq!(
            check(&rules, &json!({"aud": {"svc": true}})),
            Err(ValidationError::MalformedAudience { found: "object" })
        );
    }

    #[test]
    fn test_issuer_checked_before_audience() {
        let rules = ClaimRules {
            issuer: Some("https://idp.example"),
            audience: Some("svc"),
            ..rules()
        };
        assert_eq!(
            check(&rules, &json!({"iss": "x", "aud": 42})),
            Err(ValidationError::InvalidIssuer)
        );
    }

    // ========================================================================
    // Time-bound claims
    // ========================================================================

    #[test]
    fn test_expired_beyond_skew() {
        assert_eq!(
            check(&rules(), &json!({"exp": NOW - 61})),
            Err(ValidationError::Expired { elapsed: 1 })
        );
        assert!(check(&rules(), &json!({"exp": NOW - 60})).is_ok());
    }

    #[test]
    fn test_not_yet_valid_beyond_skew() {
        assert_eq!(
            check(&rules(), &json!({"nbf": NOW + 100})),
            Err(ValidationError::NotYetValid { remaining: 40 })
        );
        assert!(check(&rules(), &json!({"nbf": NOW + 60})).is_ok());
    }

    #[test]
    fn test_not_yet_issued_beyond_skew() {
        assert_eq!(
            check(&rules(), &json!({"iat": NOW + 61})),
            Err(ValidationError::NotYetIssued)
        );
        assert!(check(&rules(), &json!({"iat": NOW + 60})).is_ok());
    }

    #[test]
    fn test_zero_and_missing_times_skip_checks() {
        assert!(check(&rules(), &json!({"exp": 0, "nbf": 0, "iat": 0})).is_ok());
        assert!(check(&rules(), &json!({"exp": "tomorrow"})).is_ok());
        assert!(check(&rules(), &json!([1, 2, 3])).is_ok());
    }

    #[test]
    fn test_fractional_times_are_absent() {
        assert!(check(&rules(), &json!({"exp": (NOW - 500) as f64 + 0.5})).is_ok());
        assert!(check(&rules(), &json!({"nbf": (NOW + 500) as f64 + 0.5})).is_ok());
        assert!(check(&rules(), &json!({"iat": 1.0e12})).is_ok());
    }

    #[test]
    fn test_time_checks_do_not_overflow() {
        assert!(check(&rules(), &json!({"exp": i64::MAX})).is_ok());
        assert!(matches!(
            check(&rules(), &json!({"exp": i64::MIN})),
            Err(ValidationError::Expired { .. })
        ));
    }

    #[test]
    fn test_time_check_order() {
        assert_eq!(
            check(&rules(), &json!({"iat": NOW + 500, "nbf": NOW + 500, "exp": NOW - 500})),
            Err(ValidationError::NotYetIssued)
        );
        assert!(matches!(
            check(&rules(), &json!({"nbf": NOW + 500, "exp": NOW - 500})),
            Err(ValidationError::NotYetValid { .. })
        ));
    }
}
