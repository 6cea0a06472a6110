//! Session token handling for cookie and bearer auth.

use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION},
    HeaderMap, HeaderValue,
};
use sqlx::PgPool;
use uuid::Uuid;

use super::state::{AppConfig, AuthState};
use super::tokens::TokenPurpose;
use super::{storage, token_error};
use crate::api::error::ApiError;

const SESSION_COOKIE_NAME: &str = "laboro_session";

/// The authenticated caller resolved from a session token.
#[derive(Debug)]
pub(crate) struct Principal {
    pub(crate) account_id: Uuid,
    pub(crate) email: String,
    pub(crate) name: String,
}

/// Resolve the session token (cookie or bearer) into a principal.
///
/// # Errors
///
/// Returns `ApiError::Token` when the token is missing, invalid, expired,
/// or points at an account that no longer resolves.
pub(crate) async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
) -> Result<Principal, ApiError> {
    let Some(token) = extract_session_token(headers) else {
        return Err(ApiError::Token("No token provided"));
    };

    let claims = auth_state
        .tokens()
        .verify(&token, TokenPurpose::Session)
        .map_err(token_error)?;
    let account_id = claims.subject().map_err(token_error)?;

    let account = storage::lookup_account_by_id(pool, account_id)
        .await?
        .ok_or(ApiError::Token("Invalid user"))?;

    Ok(Principal {
        account_id: account.id,
        email: account.email,
        name: account.name,
    })
}

/// Build a secure `HttpOnly` cookie for the session token.
pub(super) fn session_cookie(
    config: &AppConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_token_ttl().as_secs();
    // Only mark cookies secure when the frontend is served over HTTPS.
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::AppConfig;
    use super::{extract_session_token, session_cookie};
    use axum::http::{header::COOKIE, HeaderMap, HeaderValue};

    #[test]
    fn session_cookie_sets_attributes() {
        let config = AppConfig::new("https://app.laboro.dev".to_string());
        let cookie = session_cookie(&config, "token").expect("cookie");
        let cookie = cookie.to_str().expect("ascii");
        assert!(cookie.starts_with("laboro_session=token;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn session_cookie_omits_secure_for_http() {
        let config = AppConfig::new("http://localhost:5173".to_string());
        let cookie = session_cookie(&config, "token").expect("cookie");
        assert!(!cookie.to_str().expect("ascii").contains("Secure"));
    }

    #[test]
    fn extract_session_token_reads_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=1; laboro_session=abc; more=2"),
        );
        assert_eq!(extract_session_token(&headers), Some("abc".to_string()));
    }

    #[test]
    fn extract_session_token_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer xyz"),
        );
        headers.insert(COOKIE, HeaderValue::from_static("laboro_session=abc"));
        assert_eq!(extract_session_token(&headers), Some("xyz".to_string()));
    }

    #[test]
    fn extract_session_token_none_when_missing() {
        let headers = HeaderMap::new();
        assert_eq!(extract_session_token(&headers), None);
    }
}
