use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::extract::ApiJson;
use crate::api::guards::{CurrentStudent, CurrentTeacher, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::repositories;
use crate::schemas::user::{ProfileUpdate, UserResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/profile", put(update_student_profile))
        .route("/teacher/profile", put(update_teacher_profile))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn update_student_profile(
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ProfileUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    update_profile(&state, user, payload).await
}

async fn update_teacher_profile(
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ProfileUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    update_profile(&state, user, payload).await
}

async fn update_profile(
    state: &AppState,
    user: User,
    payload: ProfileUpdate,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let email = payload.email().map(str::to_lowercase);
    if let Some(email) = email.as_deref().filter(|email| *email != user.email) {
        let taken = repositories::users::exists_by_email(state.db(), email)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check email"))?;
        if taken.is_some() {
            return Err(ApiError::Conflict("Email already in use".to_string()));
        }
    }

    let updated = repositories::users::update_profile(
        state.db(),
        &user.id,
        repositories::users::UpdateProfile {
            username: payload.username().map(str::to_string),
            email,
            department: payload.department().map(str::to_string),
            profile_picture_url: payload.profile_picture_url().map(str::to_string),
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            ApiError::Conflict("Email already in use".to_string())
        }
        other => ApiError::internal(other, "Failed to update profile"),
    })?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %updated.id, "Profile updated");

    Ok(Json(UserResponse::from_db(updated)))
}
