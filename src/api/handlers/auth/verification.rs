//! Email verification endpoint.

use axum::{extract::Extension, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;

use super::state::AuthState;
use super::storage::{self, ConsumeOutcome};
use super::token_error;
use super::tokens::TokenPurpose;
use super::types::{MessageResponse, VerifyEmailRequest};
use crate::api::error::ApiError;

/// Verify the email link by consuming the ledger entry and flipping the
/// account to verified. The consume is single-use: replaying the same
/// token fails with 403.
#[utoipa::path(
    post,
    path = "/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 403, description = "Invalid or expired token", body = MessageResponse),
        (status = 500, description = "Internal error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyEmailRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let token = request.token.trim();
    if token.is_empty() {
        return Err(ApiError::Validation("Missing token".to_string()));
    }

    // Signature, purpose, and embedded expiry are checked before the
    // ledger is touched.
    let claims = auth_state
        .tokens()
        .verify(token, TokenPurpose::EmailVerification)
        .map_err(token_error)?;
    let account_id = claims.subject().map_err(token_error)?;

    match storage::consume_token(&pool, account_id, token).await? {
        ConsumeOutcome::Consumed => {}
        ConsumeOutcome::NotFound => return Err(ApiError::Token("Invalid token")),
        ConsumeOutcome::Expired => return Err(ApiError::Token("Token expired")),
    }

    storage::mark_email_verified(&pool, account_id).await?;

    Ok(Json(MessageResponse::new("Email verified successfully")))
}
