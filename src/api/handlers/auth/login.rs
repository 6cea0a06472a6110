//! Login endpoint issuing stateless session tokens.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::password;
use super::session::session_cookie;
use super::state::AuthState;
use super::storage;
use super::tokens::TokenPurpose;
use super::types::{LoginRequest, LoginResponse, MessageResponse, UserResponse};
use super::utils::normalize_email;
use crate::api::error::ApiError;

/// Authenticate by email + password and issue a 7-day session token,
/// returned in the body and as an `HttpOnly` cookie.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing fields or wrong password", body = MessageResponse),
        (status = 404, description = "Unknown email", body = MessageResponse),
        (status = 500, description = "Internal error", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Email & password required".to_string()));
    };

    let email = normalize_email(&request.email);
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::Validation("Email & password required".to_string()));
    }

    let account = storage::lookup_account_by_email(&pool, &email)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    // A wrong password is a plain mismatch, never an error; the message
    // stays the same no matter why verification failed.
    if !password::matches(&request.password, &account.password_hash) {
        return Err(ApiError::Validation("Invalid password".to_string()));
    }

    let token = auth_state
        .tokens()
        .issue(
            account.id,
            TokenPurpose::Session,
            auth_state.config().session_token_ttl(),
        )
        .map_err(|err| ApiError::Internal(err.into()))?;

    let mut headers = HeaderMap::new();
    match session_cookie(auth_state.config(), &token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            // The body still carries the token; a missing cookie only
            // affects browser clients.
            error!("Failed to build session cookie: {err}");
        }
    }

    let response = LoginResponse {
        message: "Login successful".to_string(),
        user: UserResponse::from_record(&account),
        token,
    };

    Ok((StatusCode::OK, headers, Json(response)))
}
