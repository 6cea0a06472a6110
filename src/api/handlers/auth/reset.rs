//! Password reset endpoints.

use axum::{extract::Extension, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::password;
use super::state::AuthState;
use super::storage::{self, ConsumeOutcome};
use super::token_error;
use super::tokens::TokenPurpose;
use super::types::{MessageResponse, ResetPasswordRequest, ResetPasswordRequestRequest};
use super::utils::{build_reset_url, normalize_email};
use crate::api::error::ApiError;

/// Issue a 15-minute reset token for an already-verified account and
/// deliver the reset link.
#[utoipa::path(
    post,
    path = "/auth/reset-password-request",
    request_body = ResetPasswordRequestRequest,
    responses(
        (status = 200, description = "Reset email sent", body = MessageResponse),
        (status = 400, description = "Unknown or unverified email", body = MessageResponse),
        (status = 500, description = "Internal error or undeliverable email", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password_request(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequestRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let email = normalize_email(&request.email);
    if email.is_empty() {
        return Err(ApiError::Validation("Email required".to_string()));
    }

    let account = storage::lookup_account_by_email(&pool, &email)
        .await?
        .ok_or_else(|| ApiError::Validation("User not found".to_string()))?;

    // Reset links only go to addresses that proved they receive mail.
    if !account.email_verified {
        return Err(ApiError::Validation("Email not verified".to_string()));
    }

    let config = auth_state.config();
    let token = auth_state
        .tokens()
        .issue(account.id, TokenPurpose::ResetPassword, config.reset_token_ttl())
        .map_err(|err| ApiError::Internal(err.into()))?;
    storage::record_token(&pool, account.id, &token, config.reset_token_ttl()).await?;

    let link = build_reset_url(config.frontend_base_url(), &token);
    let body = format!(
        "<p>Hello,</p>\n\
         <p>Click <a href=\"{link}\">here</a> to reset your password.</p>\n\
         <p>This link will expire in 15 minutes.</p>"
    );

    if let Err(err) = auth_state.mailer().send(&email, "Reset Password", &body) {
        error!("Failed to deliver reset email: {err:#}");
        return Err(ApiError::Notification("Failed to send reset password email"));
    }

    Ok(Json(MessageResponse::new("Reset password email sent")))
}

/// Complete a reset by consuming the ledger entry and storing the new
/// password digest.
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Password confirmation mismatch", body = MessageResponse),
        (status = 403, description = "Invalid or expired token", body = MessageResponse),
        (status = 500, description = "Internal error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let token = request.token.trim();
    if token.is_empty() {
        return Err(ApiError::Validation("Missing token".to_string()));
    }

    let claims = auth_state
        .tokens()
        .verify(token, TokenPurpose::ResetPassword)
        .map_err(token_error)?;

    if request.new_password.is_empty() {
        return Err(ApiError::Validation("Password required".to_string()));
    }
    if request.new_password != request.confirm_password {
        return Err(ApiError::Validation("Passwords do not match".to_string()));
    }

    let account_id = claims.subject().map_err(token_error)?;

    match storage::consume_token(&pool, account_id, token).await? {
        ConsumeOutcome::Consumed => {}
        ConsumeOutcome::NotFound => return Err(ApiError::Token("Invalid token")),
        ConsumeOutcome::Expired => return Err(ApiError::Token("Token expired")),
    }

    let digest = password::hash(&request.new_password)?;
    storage::update_password(&pool, account_id, &digest).await?;

    Ok(Json(MessageResponse::new("Password reset successfully")))
}
