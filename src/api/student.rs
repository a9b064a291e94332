use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::assessments::fetch_test;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::attempt::{AttemptSummary, StudentTestReview};
use crate::services::ranking;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/test/:test_id/review", get(review_attempt))
        .route("/my-attempts", get(my_attempts))
}

/// Review of the student's latest attempt, ranked against every completed
/// attempt of the test.
async fn review_attempt(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<StudentTestReview>, ApiError> {
    let attempt =
        repositories::attempts::find_latest_completed(state.db(), &test_id, &student.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load attempt"))?
            .ok_or_else(|| ApiError::NotFound("No completed attempt for this test".to_string()))?;

    let test = fetch_test(&state, &test_id).await?;

    let all_attempts = repositories::attempts::list_completed_for_test(state.db(), &test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempts"))?;

    let pairs: Vec<(i32, i32)> =
        all_attempts.iter().map(|other| (other.score, other.correct_answers)).collect();
    let scores: Vec<i32> = all_attempts.iter().map(|other| other.score).collect();

    let rank = ranking::rank(&pairs, attempt.score, attempt.correct_answers);
    let percentile = ranking::percentile(&scores, attempt.score);

    Ok(Json(StudentTestReview::build(&test, &attempt, rank, all_attempts.len(), percentile)))
}

async fn my_attempts(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<AttemptSummary>>, ApiError> {
    let attempts = repositories::attempts::list_completed_for_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    Ok(Json(attempts.iter().map(AttemptSummary::from_db).collect()))
}
