use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{AnswerRecord, TestAttempt};

const COLUMNS: &str = "\
    id, test_id, student_id, test_title, subject, join_code, completed_at, score, \
    total_questions, correct_answers, duration_minutes, answers, is_completed";

pub(crate) struct CreateAttempt<'a> {
    pub id: &'a str,
    pub test_id: &'a str,
    pub student_id: &'a str,
    pub test_title: &'a str,
    pub subject: Option<&'a str>,
    pub join_code: &'a str,
    pub completed_at: PrimitiveDateTime,
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub duration_minutes: i32,
    pub answers: Vec<AnswerRecord>,
}

/// Inserts a completed attempt. Attempts are never updated afterwards.
pub(crate) async fn create_completed(
    pool: &PgPool,
    params: CreateAttempt<'_>,
) -> Result<TestAttempt, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "INSERT INTO test_attempts (
            id, test_id, student_id, test_title, subject, join_code, completed_at, score,
            total_questions, correct_answers, duration_minutes, answers, is_completed
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,TRUE)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.test_id)
    .bind(params.student_id)
    .bind(params.test_title)
    .bind(params.subject)
    .bind(params.join_code)
    .bind(params.completed_at)
    .bind(params.score)
    .bind(params.total_questions)
    .bind(params.correct_answers)
    .bind(params.duration_minutes)
    .bind(Json(params.answers))
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_completed_for_test(
    pool: &PgPool,
    test_id: &str,
) -> Result<Vec<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "SELECT {COLUMNS} FROM test_attempts
         WHERE test_id = $1 AND is_completed
         ORDER BY completed_at ASC"
    ))
    .bind(test_id)
    .fetch_all(pool)
    .await
}

/// Completed attempts for a student, newest first.
pub(crate) async fn list_completed_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "SELECT {COLUMNS} FROM test_attempts
         WHERE student_id = $1 AND is_completed
         ORDER BY completed_at DESC"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

/// The student's most recent completed attempt at a test.
pub(crate) async fn find_latest_completed(
    pool: &PgPool,
    test_id: &str,
    student_id: &str,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "SELECT {COLUMNS} FROM test_attempts
         WHERE test_id = $1 AND student_id = $2 AND is_completed
         ORDER BY completed_at DESC
         LIMIT 1"
    ))
    .bind(test_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}
