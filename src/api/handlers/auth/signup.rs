//! Registration endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::state::AuthState;
use super::storage::{self, InsertAccountOutcome};
use super::tokens::TokenPurpose;
use super::types::{MessageResponse, RegisterRequest};
use super::utils::{build_verify_url, extract_client_ip, normalize_email, valid_email};
use super::password;
use crate::api::error::{ApiError, ForbiddenReason};

/// Create an unverified account and deliver a verification link.
///
/// The account row is not rolled back when delivery fails: account
/// creation is at-least-once, notification is best-effort.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification email sent", body = MessageResponse),
        (status = 400, description = "Malformed or duplicate input", body = MessageResponse),
        (status = 403, description = "Denied by the abuse gate", body = MessageResponse),
        (status = 500, description = "Internal error or undeliverable email", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    let name = request.name.trim();
    if email.is_empty() || name.is_empty() || request.password.is_empty() {
        return Err(ApiError::Validation(
            "Email, name & password required".to_string(),
        ));
    }
    if !valid_email(&email) {
        return Err(ApiError::Validation("Invalid email address".to_string()));
    }

    // The abuse gate runs before any database work.
    let client_ip = extract_client_ip(&headers);
    if auth_state
        .gate()
        .protect(client_ip.as_deref(), &email)
        .is_denied()
    {
        return Err(ApiError::Forbidden(ForbiddenReason::GateDenied));
    }

    if storage::lookup_account_by_email(&pool, &email).await?.is_some() {
        return Err(ApiError::Validation("Email already in use".to_string()));
    }

    let digest = password::hash(&request.password)?;

    let account_id = match storage::insert_account(&pool, &email, name, &digest).await? {
        InsertAccountOutcome::Created(id) => id,
        // Lost the race to a concurrent registration for the same email.
        InsertAccountOutcome::Conflict => {
            return Err(ApiError::Validation("Email already in use".to_string()));
        }
    };

    let config = auth_state.config();
    let token = auth_state
        .tokens()
        .issue(
            account_id,
            TokenPurpose::EmailVerification,
            config.verification_token_ttl(),
        )
        .map_err(|err| ApiError::Internal(err.into()))?;
    storage::record_token(&pool, account_id, &token, config.verification_token_ttl()).await?;

    let link = build_verify_url(config.frontend_base_url(), &token);
    let body = format!(
        "<p>Hello {name},</p>\n\
         <p>Click <a href=\"{link}\">here</a> to verify your email.</p>\n\
         <p>This link will expire in 12 hours.</p>"
    );

    if let Err(err) = auth_state.mailer().send(&email, "Verify Email", &body) {
        error!("Failed to deliver verification email: {err:#}");
        // The account stays; the caller can request a fresh link later.
        return Err(ApiError::Notification("Email could not be sent"));
    }

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "Verification email sent. Please verify your account.",
        )),
    ))
}

#[cfg(test)]
mod tests {
    use super::super::gate::{AbuseGate, AllowAllGate, GateDecision};
    use super::super::state::{AppConfig, AuthState};
    use super::super::tokens::TokenIssuer;
    use super::register;
    use crate::api::mailer::LogMailer;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::Json;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    struct DenyAllGate;

    impl AbuseGate for DenyAllGate {
        fn protect(&self, _ip: Option<&str>, _email: &str) -> GateDecision {
            GateDecision::Denied
        }
    }

    fn auth_state_with_gate(gate: Arc<dyn AbuseGate>) -> Arc<AuthState> {
        Arc::new(AuthState::new(
            AppConfig::new("https://app.laboro.dev".to_string()),
            TokenIssuer::from_seed([1u8; 32]),
            gate,
            Arc::new(LogMailer),
        ))
    }

    fn lazy_pool() -> sqlx::PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/postgres")
            .expect("lazy pool")
    }

    fn request_json(email: &str, name: &str, password: &str) -> super::RegisterRequest {
        super::RegisterRequest {
            email: email.to_string(),
            name: name.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_missing_payload() {
        let response = register(
            HeaderMap::new(),
            Extension(lazy_pool()),
            Extension(auth_state_with_gate(Arc::new(AllowAllGate))),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_empty_fields() {
        let response = register(
            HeaderMap::new(),
            Extension(lazy_pool()),
            Extension(auth_state_with_gate(Arc::new(AllowAllGate))),
            Some(Json(request_json("a@x.com", "  ", "pw1"))),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_malformed_email() {
        let response = register(
            HeaderMap::new(),
            Extension(lazy_pool()),
            Extension(auth_state_with_gate(Arc::new(AllowAllGate))),
            Some(Json(request_json("not-an-email", "Alice", "pw1"))),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_gate_denial_is_forbidden() {
        // The gate runs before any database access, so a lazy pool never connects.
        let response = register(
            HeaderMap::new(),
            Extension(lazy_pool()),
            Extension(auth_state_with_gate(Arc::new(DenyAllGate))),
            Some(Json(request_json("a@x.com", "Alice", "pw1"))),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
