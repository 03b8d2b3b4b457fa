//! Compact token parsing, verification and claim validation.

pub mod claims;
pub mod token;
pub mod validator;

pub use claims::{ClaimRules, Claims};
pub use token::{Token, TokenState, Unverified, Verified};
pub use validator::{JsonDecoder, PayloadDecoder, Validator};
