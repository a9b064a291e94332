use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::extract::ApiJson;
use crate::core::redis::rate_limit_key;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::auth::{LoginRequest, RegisterRequest, RegisterResponse, TokenResponse};
use crate::schemas::user::UserResponse;

/// Max attempts per window for register/login.
const AUTH_RATE_LIMIT: u64 = 10;
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/register", post(register)).route("/login", post(login))
}

async fn check_rate_limit(
    state: &AppState,
    scope: &str,
    email: &str,
    message: &'static str,
) -> Result<(), ApiError> {
    let allowed = state
        .redis()
        .rate_limit(&rate_limit_key(scope, email), AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests(message));
    }
    Ok(())
}

async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let email = payload.email.trim().to_lowercase();
    check_rate_limit(&state, "register", &email, "Too many registration attempts, try again later")
        .await?;

    let exists = repositories::users::exists_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if exists.is_some() {
        return Err(ApiError::Conflict("User with this email already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;
    let now = primitive_now_utc();

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: payload.username.trim(),
            email: &email,
            hashed_password,
            role: payload.role,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            ApiError::Conflict("User with this email already exists".to_string())
        }
        other => ApiError::internal(other, "Failed to create user"),
    })?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { status: "registered", user: UserResponse::from_db(user) }),
    ))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let email = payload.email.trim().to_lowercase();
    check_rate_limit(&state, "login", &email, "Too many login attempts, try again later").await?;

    let user = repositories::users::find_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Incorrect email or password"))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect email or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect email or password"));
    }

    let access_token = security::create_access_token(&user, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        role: user.role,
        username: user.username,
        email: user.email,
        profile_picture_url: user.profile_picture_url,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::types::UserRole;
    use crate::test_support;

    #[tokio::test]
    async fn register_then_login_returns_token() {
        let ctx = test_support::setup_test_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "username": "ada",
                    "email": "Ada@Example.com",
                    "password": "lovelace-123",
                    "role": "student"
                })),
            ))
            .await
            .expect("register");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {body}");
        assert_eq!(body["status"], "registered");
        assert_eq!(body["user"]["email"], "ada@example.com");
        assert_eq!(body["user"]["role"], "STUDENT");

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({"email": "ada@example.com", "password": "lovelace-123"})),
            ))
            .await
            .expect("login");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["role"], "STUDENT");
        assert!(body["access_token"].as_str().is_some_and(|token| !token.is_empty()));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_and_bad_password_is_rejected() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_user(
            ctx.state.db(),
            "taken@example.com",
            UserRole::Teacher,
            "secret-pw",
        )
        .await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "username": "other",
                    "email": "taken@example.com",
                    "password": "whatever-1",
                    "role": "teacher"
                })),
            ))
            .await
            .expect("register");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({"email": "taken@example.com", "password": "wrong"})),
            ))
            .await
            .expect("login");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
