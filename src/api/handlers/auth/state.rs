//! Auth state and configuration.
//!
//! Every secret and TTL the handlers need is passed in here at
//! construction; operations never read process-wide environment state.

use std::sync::Arc;
use std::time::Duration;

use super::gate::AbuseGate;
use super::tokens::TokenIssuer;
use crate::api::mailer::Mailer;

const DEFAULT_VERIFICATION_TOKEN_TTL: Duration = Duration::from_secs(12 * 60 * 60);
const DEFAULT_RESET_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_SESSION_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Clone, Debug)]
pub struct AppConfig {
    frontend_base_url: String,
    verification_token_ttl: Duration,
    reset_token_ttl: Duration,
    session_token_ttl: Duration,
}

impl AppConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            verification_token_ttl: DEFAULT_VERIFICATION_TOKEN_TTL,
            reset_token_ttl: DEFAULT_RESET_TOKEN_TTL,
            session_token_ttl: DEFAULT_SESSION_TOKEN_TTL,
        }
    }

    #[must_use]
    pub fn with_verification_token_ttl(mut self, ttl: Duration) -> Self {
        self.verification_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl(mut self, ttl: Duration) -> Self {
        self.reset_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_session_token_ttl(mut self, ttl: Duration) -> Self {
        self.session_token_ttl = ttl;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(crate) fn verification_token_ttl(&self) -> Duration {
        self.verification_token_ttl
    }

    pub(crate) fn reset_token_ttl(&self) -> Duration {
        self.reset_token_ttl
    }

    pub(crate) fn session_token_ttl(&self) -> Duration {
        self.session_token_ttl
    }

    pub(super) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AppConfig,
    tokens: TokenIssuer,
    gate: Arc<dyn AbuseGate>,
    mailer: Arc<dyn Mailer>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        tokens: TokenIssuer,
        gate: Arc<dyn AbuseGate>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            tokens,
            gate,
            mailer,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub(super) fn gate(&self) -> &dyn AbuseGate {
        self.gate.as_ref()
    }

    pub(super) fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::super::gate::AllowAllGate;
    use super::super::tokens::TokenIssuer;
    use super::{AppConfig, AuthState};
    use crate::api::mailer::LogMailer;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn app_config_defaults_and_overrides() {
        let config = AppConfig::new("https://app.laboro.dev".to_string());

        assert_eq!(config.frontend_base_url(), "https://app.laboro.dev");
        assert_eq!(
            config.verification_token_ttl(),
            Duration::from_secs(12 * 60 * 60)
        );
        assert_eq!(config.reset_token_ttl(), Duration::from_secs(15 * 60));
        assert_eq!(
            config.session_token_ttl(),
            Duration::from_secs(7 * 24 * 60 * 60)
        );
        assert!(config.session_cookie_secure());

        let config = config
            .with_verification_token_ttl(Duration::from_secs(120))
            .with_reset_token_ttl(Duration::from_secs(30))
            .with_session_token_ttl(Duration::from_secs(60));

        assert_eq!(config.verification_token_ttl(), Duration::from_secs(120));
        assert_eq!(config.reset_token_ttl(), Duration::from_secs(30));
        assert_eq!(config.session_token_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn insecure_frontend_disables_secure_cookie() {
        let config = AppConfig::new("http://localhost:5173".to_string());
        assert!(!config.session_cookie_secure());
    }

    #[test]
    fn auth_state_constructs_with_defaults() {
        let config = AppConfig::new("https://app.laboro.dev".to_string());
        let state = AuthState::new(
            config,
            TokenIssuer::from_seed([7u8; 32]),
            Arc::new(AllowAllGate),
            Arc::new(LogMailer),
        );
        assert_eq!(state.config().frontend_base_url(), "https://app.laboro.dev");
    }
}
