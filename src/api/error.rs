//! Unified error taxonomy for the API surface.
//!
//! Expected domain failures carry a stable message and map to a fixed
//! status code; anything unexpected is logged and collapsed into a 500
//! so internals never leak to callers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Reason code for a 403 denial. One Forbidden kind covers both
/// membership violations and abuse-gate denials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    WorkspaceMembership,
    ProjectMembership,
    GateDenied,
}

impl ForbiddenReason {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::WorkspaceMembership => "You are not a member of this workspace",
            Self::ProjectMembership => "You are not a member of this project",
            Self::GateDenied => "Invalid email address",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or duplicate input.
    #[error("{0}")]
    Validation(String),
    /// Entity lookup came back empty.
    #[error("{0}")]
    NotFound(&'static str),
    /// Membership/role violation or abuse-gate denial.
    #[error("{}", .0.message())]
    Forbidden(ForbiddenReason),
    /// Signed token failed verification or ledger consumption.
    #[error("{0}")]
    Token(&'static str),
    /// The injected notifier could not deliver; distinct from Internal so
    /// callers can tell an undelivered email from a failed operation.
    #[error("{0}")]
    Notification(&'static str),
    /// Unexpected failure; cause is logged, never returned to the caller.
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) | Self::Token(_) => StatusCode::FORBIDDEN,
            Self::Notification(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            Self::Internal(err) => {
                error!("Internal error: {err:#}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiError, ForbiddenReason};
    use axum::{http::StatusCode, response::IntoResponse};

    #[test]
    fn validation_maps_to_400() {
        let response = ApiError::Validation("Email already in use".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError::NotFound("User not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn forbidden_and_token_map_to_403() {
        let response = ApiError::Forbidden(ForbiddenReason::ProjectMembership).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = ApiError::Token("Token expired").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn notification_and_internal_map_to_500() {
        let response = ApiError::Notification("Email could not be sent").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ApiError::Internal(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn forbidden_reason_messages_are_stable() {
        assert_eq!(
            ForbiddenReason::WorkspaceMembership.message(),
            "You are not a member of this workspace"
        );
        assert_eq!(
            ForbiddenReason::ProjectMembership.message(),
            "You are not a member of this project"
        );
        assert_eq!(ForbiddenReason::GateDenied.message(), "Invalid email address");
    }
}
