use crate::api;
use crate::api::handlers::auth::{AllowAllGate, AppConfig, AuthState, TokenIssuer};
use crate::api::mailer::LogMailer;
use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{anyhow, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use secrecy::ExposeSecret;
use std::sync::Arc;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server { port, dsn } => {
            // Fail early on an unparseable DSN instead of inside the pool.
            Url::parse(&dsn)?;

            let seed = decode_token_seed(globals.token_seed.expose_secret())?;

            let config = AppConfig::new(globals.frontend_url.clone());
            let auth_state = Arc::new(AuthState::new(
                config,
                TokenIssuer::from_seed(seed),
                Arc::new(AllowAllGate),
                Arc::new(LogMailer),
            ));

            api::new(port, dsn, auth_state).await?;
        }
        Action::RepairMembers { .. } => {
            return Err(anyhow!("unexpected action for server handler"));
        }
    }

    Ok(())
}

/// Decode the base64url (unpadded) token seed into 32 key bytes.
fn decode_token_seed(encoded: &str) -> Result<[u8; 32]> {
    let bytes = Base64UrlUnpadded::decode_vec(encoded.trim())
        .map_err(|_| anyhow!("token seed is not valid base64url"))?;
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow!("token seed must decode to exactly 32 bytes"))?;
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::decode_token_seed;
    use base64ct::{Base64UrlUnpadded, Encoding};

    #[test]
    fn decode_token_seed_round_trip() {
        let encoded = Base64UrlUnpadded::encode_string(&[7u8; 32]);
        let seed = decode_token_seed(&encoded).expect("seed should decode");
        assert_eq!(seed, [7u8; 32]);
    }

    #[test]
    fn decode_token_seed_rejects_bad_input() {
        assert!(decode_token_seed("not base64url!").is_err());

        let short = Base64UrlUnpadded::encode_string(&[7u8; 16]);
        assert!(decode_token_seed(&short).is_err());
    }
}
