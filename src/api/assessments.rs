use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::extract::ApiJson;
use crate::api::guards::{CurrentStudent, CurrentTeacher, CurrentUser, StudentOrTeacher};
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::Test;
use crate::repositories;
use crate::schemas::assessment::{
    JoinResponse, SubmitRequest, SubmitResponse, TestCreate, TestCreated, TestResponse,
};
use crate::schemas::attempt::AttemptResponse;
use crate::services::grading;
use crate::services::join_codes::{generate_join_code, join_link};
use crate::services::notifier::TestEvent;

const JOIN_CODE_ATTEMPTS: usize = 5;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_test).get(list_tests))
        .route("/completed", get(list_completed))
        .route("/join/:join_code", post(join_test))
        .route("/subject/:subject", get(list_by_subject))
        .route("/:test_id", get(get_test))
        .route("/:test_id/submit", post(submit_test))
}

pub(crate) async fn fetch_test(state: &AppState, test_id: &str) -> Result<Test, ApiError> {
    repositories::assessments::find_by_id(state.db(), test_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load test"))?
        .ok_or_else(|| ApiError::NotFound("Test not found".to_string()))
}

async fn create_test(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TestCreate>,
) -> Result<(StatusCode, Json<TestCreated>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = primitive_now_utc();
    let test_id = Uuid::new_v4().to_string();
    let mut created = None;

    for _ in 0..JOIN_CODE_ATTEMPTS {
        let join_code = generate_join_code();
        let result = repositories::assessments::create(
            state.db(),
            repositories::assessments::CreateTest {
                id: &test_id,
                title: payload.title.trim(),
                subject: payload.subject(),
                scheduled_at: payload.scheduled_at.map(to_primitive_utc),
                duration_minutes: payload.duration_minutes,
                created_by: &teacher.id,
                join_code: &join_code,
                questions: payload.questions.clone(),
                created_at: now,
                updated_at: now,
            },
        )
        .await;

        match result {
            Ok(test) => {
                created = Some(test);
                break;
            }
            Err(err) if repositories::assessments::is_join_code_conflict(&err) => {
                tracing::warn!(test_id = %test_id, "Join code collision, regenerating");
            }
            Err(err) => return Err(ApiError::internal(err, "Failed to create test")),
        }
    }

    let test = created.ok_or_else(|| {
        ApiError::internal("join code space exhausted", "Failed to allocate join code")
    })?;

    tracing::info!(
        test_id = %test.id,
        teacher_id = %teacher.id,
        questions = test.questions().len(),
        "Test created"
    );
    metrics::counter!("tests_created_total").increment(1);

    let response = TestCreated {
        join_link: join_link(&state.settings().api().api_v1_str, &test.join_code),
        id: test.id,
        title: test.title,
        join_code: test.join_code,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_tests(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<Vec<TestResponse>>, ApiError> {
    let tests = repositories::assessments::list_by_creator(state.db(), &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list tests"))?;

    Ok(Json(tests.into_iter().map(TestResponse::from_db).collect()))
}

async fn get_test(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<TestResponse>, ApiError> {
    let test = fetch_test(&state, &test_id).await?;

    if !test.is_creator(&user.id) && !test.is_participant(&user.id) {
        return Err(ApiError::Forbidden("Access denied"));
    }

    Ok(Json(TestResponse::for_viewer(test, &user.id)))
}

async fn join_test(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Path(join_code): Path<String>,
) -> Result<Json<JoinResponse>, ApiError> {
    let test = repositories::assessments::find_by_join_code(state.db(), join_code.trim())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load test"))?
        .ok_or_else(|| ApiError::NotFound("Invalid join code".to_string()))?;

    let added = repositories::assessments::add_participant(
        state.db(),
        &test.id,
        &student.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to join test"))?;

    if !added {
        return Ok(Json(JoinResponse { status: "already_joined", test_id: test.id }));
    }

    tracing::info!(test_id = %test.id, student_id = %student.id, "Student joined test");
    state.events().publish(&test.id, TestEvent::joined(&student.id)).await;

    Ok(Json(JoinResponse { status: "joined", test_id: test.id }))
}

async fn submit_test(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Path(test_id): Path<String>,
    ApiJson(payload): ApiJson<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let test = fetch_test(&state, &test_id).await?;
    let now = primitive_now_utc();

    if !test.is_participant(&student.id) {
        repositories::assessments::add_participant(state.db(), &test.id, &student.id, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to register participant"))?;
        tracing::info!(
            test_id = %test.id,
            student_id = %student.id,
            "Submission from non-participant, added to participants"
        );
    }

    let outcome = grading::grade_submission(test.questions(), &payload.answers);
    let attempt_id = Uuid::new_v4().to_string();

    let attempt = repositories::attempts::create_completed(
        state.db(),
        repositories::attempts::CreateAttempt {
            id: &attempt_id,
            test_id: &test.id,
            student_id: &student.id,
            test_title: &test.title,
            subject: test.subject.as_deref(),
            join_code: &test.join_code,
            completed_at: now,
            score: outcome.score,
            total_questions: outcome.total_questions,
            correct_answers: outcome.correct_answers,
            duration_minutes: payload.duration_minutes.unwrap_or(test.duration_minutes),
            answers: outcome.answers,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to store attempt"))?;

    tracing::info!(
        test_id = %test.id,
        student_id = %student.id,
        attempt_id = %attempt.id,
        score = attempt.score,
        "Test submitted"
    );
    metrics::counter!("test_submissions_total").increment(1);
    state.events().publish(&test.id, TestEvent::submitted(&student.id, &attempt.id)).await;

    Ok(Json(SubmitResponse {
        attempt_id: attempt.id,
        score: attempt.score,
        correct: attempt.correct_answers,
        total: attempt.total_questions,
    }))
}

async fn list_by_subject(
    StudentOrTeacher(user): StudentOrTeacher,
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<Vec<TestResponse>>, ApiError> {
    let tests =
        repositories::assessments::list_by_subject_for_user(state.db(), subject.trim(), &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list tests"))?;

    Ok(Json(tests.into_iter().map(|test| TestResponse::for_viewer(test, &user.id)).collect()))
}

async fn list_completed(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<AttemptResponse>>, ApiError> {
    let attempts = repositories::attempts::list_completed_for_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    Ok(Json(attempts.into_iter().map(AttemptResponse::from_db).collect()))
}
