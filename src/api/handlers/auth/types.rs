//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use utoipa::ToSchema;

use super::storage::AccountRecord;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequestRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub(super) fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Account view with the password digest stripped.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_email_verified: bool,
    pub created_at: String,
}

impl UserResponse {
    pub(super) fn from_record(record: &AccountRecord) -> Self {
        Self {
            id: record.id.to_string(),
            email: record.email.clone(),
            name: record.name.clone(),
            is_email_verified: record.email_verified,
            created_at: record
                .created_at
                .format(&Rfc3339)
                .unwrap_or_else(|_| record.created_at.to_string()),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserResponse,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn register_request_round_trips() -> Result<()> {
        let request = RegisterRequest {
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            password: "pw1".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let email = value
            .get("email")
            .and_then(serde_json::Value::as_str)
            .context("missing email")?;
        assert_eq!(email, "alice@example.com");
        let decoded: RegisterRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.name, "Alice");
        Ok(())
    }

    #[test]
    fn reset_password_request_uses_camel_case() -> Result<()> {
        let request: ResetPasswordRequest = serde_json::from_value(serde_json::json!({
            "token": "t",
            "newPassword": "pw2",
            "confirmPassword": "pw2",
        }))?;
        assert_eq!(request.new_password, "pw2");
        assert_eq!(request.confirm_password, "pw2");
        Ok(())
    }

    #[test]
    fn user_response_serializes_camel_case() -> Result<()> {
        let response = UserResponse {
            id: "id".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            is_email_verified: true,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(
            value.get("isEmailVerified"),
            Some(&serde_json::Value::Bool(true))
        );
        assert!(value.get("createdAt").is_some());
        Ok(())
    }
}
