use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::assessments::fetch_test;
use crate::api::errors::ApiError;
use crate::api::guards::{CurrentTeacher, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::analytics::{AnalyticsQuery, StudentAnalyticsResponse, TestReviewQuery};
use crate::services::analytics::{build_student_analytics, ScoredAttempt, TimeRange};
use crate::services::class_review::{build_test_review, TestReview};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/my-analytics", get(my_analytics))
        .route("/test/:test_id/review", get(test_review))
}

async fn my_analytics(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<StudentAnalyticsResponse>, ApiError> {
    let attempts = repositories::attempts::list_completed_for_student(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempts"))?;

    let range = TimeRange::parse(query.time_range.as_deref());
    let analytics = build_student_analytics(
        attempts.into_iter().map(ScoredAttempt::from).collect(),
        query.subject(),
        range,
        primitive_now_utc(),
    );

    Ok(Json(StudentAnalyticsResponse {
        student_id: user.id,
        student_name: user.username,
        analytics,
    }))
}

async fn test_review(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Path(test_id): Path<String>,
    Query(query): Query<TestReviewQuery>,
) -> Result<Json<TestReview>, ApiError> {
    let test = fetch_test(&state, &test_id).await?;
    if !test.is_creator(&teacher.id) {
        return Err(ApiError::Forbidden("Only the test creator can review results"));
    }

    let attempts = repositories::attempts::list_completed_for_test(state.db(), &test.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempts"))?;

    let mut student_ids: Vec<String> =
        attempts.iter().map(|attempt| attempt.student_id.clone()).collect();
    student_ids.sort();
    student_ids.dedup();

    let names: HashMap<String, String> =
        repositories::users::list_names_by_ids(state.db(), &student_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load student names"))?
            .into_iter()
            .collect();

    Ok(Json(build_test_review(&test, &attempts, &names, query.include_ai_report)))
}
