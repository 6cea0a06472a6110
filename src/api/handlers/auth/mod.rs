//! Auth handlers and supporting modules.
//!
//! This module coordinates the account lifecycle: registration, email
//! verification, login, and password reset, driven by purpose-tagged
//! signed tokens.
//!
//! ## Token lifecycle
//!
//! Registration and reset issue signed tokens and record their hashes in
//! the verification ledger. Verification/reset consume the ledger entry
//! with an atomic find-and-delete, so a token is honored at most once
//! even under concurrent duplicate submission. Sessions are stateless
//! signed tokens and never touch the ledger.
//!
//! > **Warning:** Rotating the token seed invalidates all outstanding
//! > verification links and sessions.

pub(crate) mod gate;
pub(crate) mod login;
pub(crate) mod password;
pub(crate) mod reset;
pub(crate) mod session;
pub(crate) mod signup;
mod state;
pub(crate) mod storage;
pub(crate) mod tokens;
pub(crate) mod types;
pub(crate) mod utils;
pub(crate) mod verification;

pub use gate::{AbuseGate, AllowAllGate, GateDecision};
pub use state::{AppConfig, AuthState};
pub use tokens::{TokenIssuer, TokenPurpose};

use crate::api::error::ApiError;

/// Map a token failure onto the API taxonomy with the stable messages.
pub(super) fn token_error(err: tokens::Error) -> ApiError {
    if err.is_expired() {
        ApiError::Token("Token expired")
    } else {
        ApiError::Token("Invalid token")
    }
}

#[cfg(test)]
mod tests {
    use super::{token_error, tokens};
    use crate::api::error::ApiError;

    #[test]
    fn token_error_distinguishes_expiry() {
        assert!(matches!(
            token_error(tokens::Error::Expired),
            ApiError::Token("Token expired")
        ));
        assert!(matches!(
            token_error(tokens::Error::InvalidSignature),
            ApiError::Token("Invalid token")
        ));
        assert!(matches!(
            token_error(tokens::Error::InvalidPurpose),
            ApiError::Token("Invalid token")
        ));
    }
}
