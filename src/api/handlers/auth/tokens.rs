//! Purpose-tagged signed tokens for the account lifecycle.
//!
//! Tokens are EdDSA-signed compact strings (`header.claims.signature`,
//! base64url unpadded). Every token carries a purpose tag, and
//! verification checks the tag against what the calling operation
//! expects, so a verification link can never be replayed as a session.
//! Issuing has no side effects; single-use enforcement for email links
//! lives in the verification ledger.

use base64ct::{Base64UrlUnpadded, Encoding};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

pub const TOKEN_VERSION: u8 = 1;

/// What a token is allowed to be used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailVerification,
    ResetPassword,
    Session,
}

impl TokenPurpose {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "email-verification",
            Self::ResetPassword => "reset-password",
            Self::Session => "session",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl TokenHeader {
    fn eddsa() -> Self {
        Self {
            alg: "EdDSA".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub v: u8,
    pub sub: String,
    pub purpose: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl TokenClaims {
    /// Parse the subject claim back into an account id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSubject` if the claim is not a UUID.
    pub fn subject(&self) -> Result<Uuid, Error> {
        Uuid::parse_str(&self.sub).map_err(|_| Error::InvalidSubject)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid token version")]
    InvalidVersion,
    #[error("invalid purpose")]
    InvalidPurpose,
    #[error("invalid subject")]
    InvalidSubject,
    #[error("token expired")]
    Expired,
}

impl Error {
    /// Whether the failure was a valid-but-expired token, as opposed to a
    /// malformed or forged one.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Issues and verifies the service's signed tokens with a single Ed25519
/// key derived from the configured seed.
pub struct TokenIssuer {
    signing_key: SigningKey,
}

impl TokenIssuer {
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Create a signed token for `subject`, valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if claims JSON cannot be encoded.
    pub fn issue(
        &self,
        subject: Uuid,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<String, Error> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let ttl_seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = TokenClaims {
            v: TOKEN_VERSION,
            sub: subject.to_string(),
            purpose: purpose.as_str().to_string(),
            exp: now.saturating_add(ttl_seconds),
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };

        self.sign_claims(&claims)
    }

    fn sign_claims(&self, claims: &TokenClaims) -> Result<String, Error> {
        let header_b64 = b64e_json(&TokenHeader::eddsa())?;
        let claims_b64 = b64e_json(claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let signature: Signature = self.signing_key.sign(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&signature.to_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify a token and return its decoded claims.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the token is malformed or contains invalid base64/json,
    /// - the signature is invalid,
    /// - the claims fail validation (`v`, `purpose`, `exp`).
    pub fn verify(&self, token: &str, expected: TokenPurpose) -> Result<TokenClaims, Error> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(Error::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(Error::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(Error::TokenFormat)?;
        if parts.next().is_some() {
            return Err(Error::TokenFormat);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != "EdDSA" {
            return Err(Error::UnsupportedAlg(header.alg));
        }

        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature_bytes = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Base64)?;
        let signature =
            Signature::try_from(signature_bytes.as_slice()).map_err(|_| Error::InvalidSignature)?;
        self.signing_key
            .verifying_key()
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| Error::InvalidSignature)?;

        let claims: TokenClaims = b64d_json(claims_b64)?;
        if claims.v != TOKEN_VERSION {
            return Err(Error::InvalidVersion);
        }
        if claims.purpose != expected.as_str() {
            return Err(Error::InvalidPurpose);
        }
        if claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
            return Err(Error::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, TokenClaims, TokenIssuer, TokenPurpose, TOKEN_VERSION};
    use std::time::Duration;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn issuer() -> TokenIssuer {
        TokenIssuer::from_seed([7u8; 32])
    }

    #[test]
    fn issue_and_verify_round_trip() -> Result<(), Error> {
        let subject = Uuid::new_v4();
        for purpose in [
            TokenPurpose::EmailVerification,
            TokenPurpose::ResetPassword,
            TokenPurpose::Session,
        ] {
            let token = issuer().issue(subject, purpose, Duration::from_secs(3600))?;
            let claims = issuer().verify(&token, purpose)?;
            assert_eq!(claims.subject()?, subject);
            assert_eq!(claims.purpose, purpose.as_str());
        }
        Ok(())
    }

    #[test]
    fn verify_rejects_purpose_mismatch() -> Result<(), Error> {
        let token = issuer().issue(
            Uuid::new_v4(),
            TokenPurpose::EmailVerification,
            Duration::from_secs(3600),
        )?;
        let result = issuer().verify(&token, TokenPurpose::Session);
        assert!(matches!(result, Err(Error::InvalidPurpose)));
        Ok(())
    }

    #[test]
    fn verify_rejects_expired_regardless_of_signature() -> Result<(), Error> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = TokenClaims {
            v: TOKEN_VERSION,
            sub: Uuid::new_v4().to_string(),
            purpose: TokenPurpose::ResetPassword.as_str().to_string(),
            exp: now - 1,
            iat: now - 900,
            jti: Uuid::new_v4().to_string(),
        };
        let token = issuer().sign_claims(&claims)?;
        let result = issuer().verify(&token, TokenPurpose::ResetPassword);
        assert!(matches!(result, Err(Error::Expired)));
        assert!(result.unwrap_err().is_expired());
        Ok(())
    }

    #[test]
    fn verify_rejects_other_key() -> Result<(), Error> {
        let token = issuer().issue(
            Uuid::new_v4(),
            TokenPurpose::Session,
            Duration::from_secs(3600),
        )?;
        let other = TokenIssuer::from_seed([9u8; 32]);
        let result = other.verify(&token, TokenPurpose::Session);
        assert!(matches!(result, Err(Error::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn verify_rejects_tampered_claims() -> Result<(), Error> {
        let token = issuer().issue(
            Uuid::new_v4(),
            TokenPurpose::Session,
            Duration::from_secs(3600),
        )?;
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = super::b64e_json(&TokenClaims {
            v: TOKEN_VERSION,
            sub: Uuid::new_v4().to_string(),
            purpose: TokenPurpose::Session.as_str().to_string(),
            exp: i64::MAX,
            iat: 0,
            jti: Uuid::new_v4().to_string(),
        })?;
        parts[1] = &forged;
        let tampered = parts.join(".");
        let result = issuer().verify(&tampered, TokenPurpose::Session);
        assert!(matches!(result, Err(Error::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn verify_rejects_garbage() {
        assert!(matches!(
            issuer().verify("not-a-token", TokenPurpose::Session),
            Err(Error::TokenFormat)
        ));
        assert!(matches!(
            issuer().verify("a.b.c.d", TokenPurpose::Session),
            Err(Error::TokenFormat)
        ));
    }

    #[test]
    fn purpose_strings_are_stable() {
        assert_eq!(TokenPurpose::EmailVerification.as_str(), "email-verification");
        assert_eq!(TokenPurpose::ResetPassword.as_str(), "reset-password");
        assert_eq!(TokenPurpose::Session.as_str(), "session");
    }
}
