use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::UserRole;
use crate::schemas::{non_blank, trimmed_email};
use crate::schemas::user::UserResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RegisterRequest {
    #[validate(custom(function = non_blank, message = "username must not be blank"))]
    pub(crate) username: String,
    #[validate(custom(function = trimmed_email, message = "email must be a valid address"))]
    pub(crate) email: String,
    #[validate(custom(function = non_blank, message = "password must not be blank"))]
    pub(crate) password: String,
    pub(crate) role: UserRole,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LoginRequest {
    #[validate(custom(function = trimmed_email, message = "email must be a valid address"))]
    pub(crate) email: String,
    #[validate(custom(function = non_blank, message = "password must not be blank"))]
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterResponse {
    pub(crate) status: &'static str,
    pub(crate) user: UserResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: &'static str,
    pub(crate) role: UserRole,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) profile_picture_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_validation() {
        let valid: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "ada",
            "email": "ada@example.com",
            "password": "secret",
            "role": "TEACHER"
        }))
        .expect("payload");
        assert!(valid.validate().is_ok());
        assert_eq!(valid.role, UserRole::Teacher);

        let invalid: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "  ",
            "email": "not-an-email",
            "password": "secret",
            "role": "student"
        }))
        .expect("payload");
        let errors = invalid.validate().expect_err("invalid");
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
    }
}
