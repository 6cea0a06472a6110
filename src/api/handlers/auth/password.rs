//! Password hashing for stored credentials.
//!
//! Digests are Argon2id in PHC string format with a per-password random
//! salt. A mismatch is a boolean outcome, not an error; an undecodable
//! stored digest also reads as a mismatch.

use anyhow::Result;
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;

/// Hash a plaintext password into a PHC digest string.
///
/// # Errors
///
/// Returns an error if hashing fails.
pub fn hash(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|_| anyhow::anyhow!("failed to hash password"))?
        .to_string();
    Ok(digest)
}

/// Compare a plaintext password against a stored digest.
#[must_use]
pub fn matches(plaintext: &str, digest: &str) -> bool {
    PasswordHash::new(digest).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::{hash, matches};
    use anyhow::Result;

    #[test]
    fn hash_then_match_round_trip() -> Result<()> {
        let digest = hash("correct horse battery staple")?;
        assert!(matches("correct horse battery staple", &digest));
        assert!(!matches("wrong password", &digest));
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let first = hash("pw1")?;
        let second = hash("pw1")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn matches_rejects_undecodable_digest() {
        assert!(!matches("pw1", "not-a-phc-string"));
        assert!(!matches("pw1", ""));
    }

    #[test]
    fn digest_uses_argon2id() -> Result<()> {
        let digest = hash("pw1")?;
        assert!(digest.starts_with("$argon2id$"));
        Ok(())
    }
}
