//! Persistence for tests. The embedded questions travel with the row as one
//! JSON document; participants are a text array with set semantics.

use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{Question, Test};

const COLUMNS: &str = "\
    id, title, subject, scheduled_at, duration_minutes, created_by, join_code, \
    participant_ids, questions, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!("SELECT {COLUMNS} FROM tests WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_join_code(
    pool: &PgPool,
    join_code: &str,
) -> Result<Option<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!("SELECT {COLUMNS} FROM tests WHERE join_code = $1"))
        .bind(join_code)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_by_creator(
    pool: &PgPool,
    teacher_id: &str,
) -> Result<Vec<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!(
        "SELECT {COLUMNS} FROM tests WHERE created_by = $1 ORDER BY created_at DESC"
    ))
    .bind(teacher_id)
    .fetch_all(pool)
    .await
}

/// Tests in `subject` that the user either created or joined.
pub(crate) async fn list_by_subject_for_user(
    pool: &PgPool,
    subject: &str,
    user_id: &str,
) -> Result<Vec<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!(
        "SELECT {COLUMNS} FROM tests
         WHERE subject = $1 AND (created_by = $2 OR $2 = ANY(participant_ids))
         ORDER BY created_at DESC"
    ))
    .bind(subject)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateTest<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub subject: Option<&'a str>,
    pub scheduled_at: Option<PrimitiveDateTime>,
    pub duration_minutes: i32,
    pub created_by: &'a str,
    pub join_code: &'a str,
    pub questions: Vec<Question>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateTest<'_>) -> Result<Test, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!(
        "INSERT INTO tests (
            id, title, subject, scheduled_at, duration_minutes, created_by, join_code,
            participant_ids, questions, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,'{{}}',$8,$9,$10)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.subject)
    .bind(params.scheduled_at)
    .bind(params.duration_minutes)
    .bind(params.created_by)
    .bind(params.join_code)
    .bind(Json(params.questions))
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

/// Adds `user_id` to the participant set in a single statement. Returns
/// `false` when the user was already a participant (or the test is gone).
pub(crate) async fn add_participant(
    pool: &PgPool,
    test_id: &str,
    user_id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE tests
         SET participant_ids = array_append(participant_ids, $1), updated_at = $2
         WHERE id = $3 AND NOT ($1 = ANY(participant_ids))",
    )
    .bind(user_id)
    .bind(now)
    .bind(test_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) fn is_join_code_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.constraint() == Some("ix_tests_join_code")
        }
        _ => false,
    }
}
