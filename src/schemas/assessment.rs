use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::{Validate, ValidationError};

use crate::core::time::format_primitive;
use crate::db::models::{Question, Test};
use crate::schemas::non_blank;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TestCreate {
    #[validate(custom(function = non_blank, message = "title must not be blank"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) subject: Option<String>,
    #[serde(
        default,
        alias = "scheduledAt",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) scheduled_at: Option<OffsetDateTime>,
    #[serde(default, alias = "durationInMinutes", alias = "durationMinutes")]
    #[validate(range(min = 0, message = "duration_minutes must be non-negative"))]
    pub(crate) duration_minutes: i32,
    #[serde(default)]
    #[validate(custom(function = validate_questions))]
    pub(crate) questions: Vec<Question>,
}

impl TestCreate {
    pub(crate) fn subject(&self) -> Option<&str> {
        self.subject.as_deref().map(str::trim).filter(|subject| !subject.is_empty())
    }
}

/// Choice questions must point their correct answers at existing options.
fn validate_questions(questions: &[Question]) -> Result<(), ValidationError> {
    for question in questions.iter().filter(|question| question.has_options()) {
        let in_range = question
            .correct_answer
            .iter()
            .all(|&index| index >= 0 && (index as usize) < question.options.len());
        if !in_range {
            return Err(ValidationError::new("correct_answer_out_of_range")
                .with_message("correct_answer must reference existing options".into()));
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub(crate) struct TestCreated {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) join_code: String,
    pub(crate) join_link: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TestResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) subject: Option<String>,
    pub(crate) scheduled_at: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) created_by: String,
    pub(crate) join_code: String,
    pub(crate) participant_ids: Vec<String>,
    pub(crate) questions: Vec<QuestionView>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

/// A question as shown to a caller. Only the creator sees the answer key.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum QuestionView {
    Full(Question),
    Student(StudentQuestion),
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestion {
    #[serde(rename = "type")]
    pub(crate) question_type: String,
    pub(crate) question_text: String,
    pub(crate) points: i32,
    pub(crate) options: Vec<String>,
    pub(crate) word_limit: Option<i32>,
}

impl From<Question> for StudentQuestion {
    fn from(question: Question) -> Self {
        Self {
            question_type: question.question_type,
            question_text: question.question_text,
            points: question.points,
            options: question.options,
            word_limit: question.word_limit,
        }
    }
}

impl TestResponse {
    /// Creator view with answer keys.
    pub(crate) fn from_db(test: Test) -> Self {
        Self::project(test, QuestionView::Full)
    }

    /// Answer keys are stripped unless `viewer_id` created the test.
    pub(crate) fn for_viewer(test: Test, viewer_id: &str) -> Self {
        if test.is_creator(viewer_id) {
            return Self::from_db(test);
        }
        Self::project(test, |question| QuestionView::Student(question.into()))
    }

    fn project(test: Test, view: impl FnMut(Question) -> QuestionView) -> Self {
        Self {
            id: test.id,
            title: test.title,
            subject: test.subject,
            scheduled_at: test.scheduled_at.map(format_primitive),
            duration_minutes: test.duration_minutes,
            created_by: test.created_by,
            join_code: test.join_code,
            participant_ids: test.participant_ids,
            questions: test.questions.0.into_iter().map(view).collect(),
            created_at: format_primitive(test.created_at),
            updated_at: format_primitive(test.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JoinResponse {
    pub(crate) status: &'static str,
    pub(crate) test_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    pub(crate) answers: Vec<serde_json::Value>,
    #[serde(default, alias = "durationInMinutes", alias = "durationMinutes")]
    #[validate(range(min = 0, message = "duration_minutes must be non-negative"))]
    pub(crate) duration_minutes: Option<i32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) attempt_id: String,
    pub(crate) score: i32,
    pub(crate) correct: i32,
    pub(crate) total: i32,
}

fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // datetime-local inputs arrive without an offset; treat them as UTC.
    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_option_offset_datetime_flexible<'de, D>(
    deserializer: D,
) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_offset_datetime_flexible(value)
            .ok_or_else(|| D::Error::custom(format!("invalid datetime: {value}")))
            .map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_create_accepts_camel_case_and_local_datetime() {
        let payload: TestCreate = serde_json::from_value(json!({
            "title": "Midterm",
            "subject": " Math ",
            "scheduledAt": "2025-05-01T09:30",
            "durationInMinutes": 45,
            "questions": [
                {"type": "choice", "questionText": "1+1?", "options": ["1", "2"], "correctAnswer": [1]},
                {"type": "text", "questionText": "Explain"}
            ]
        }))
        .expect("payload");

        assert!(payload.validate().is_ok());
        assert_eq!(payload.subject(), Some("Math"));
        assert_eq!(payload.duration_minutes, 45);
        assert_eq!(payload.scheduled_at, Some(datetime!(2025-05-01 09:30 UTC)));
        assert_eq!(payload.questions.len(), 2);
    }

    #[test]
    fn rfc3339_scheduled_at_keeps_offset() {
        let payload: TestCreate = serde_json::from_value(json!({
            "title": "Quiz",
            "scheduled_at": "2025-05-01T09:30:00+03:00"
        }))
        .expect("payload");

        assert_eq!(payload.scheduled_at, Some(datetime!(2025-05-01 06:30 UTC)));
        assert!(payload.questions.is_empty());
    }

    #[test]
    fn out_of_range_correct_answer_is_rejected() {
        let payload: TestCreate = serde_json::from_value(json!({
            "title": "Quiz",
            "questions": [{"type": "choice", "question_text": "?", "options": ["a"], "correct_answer": [3]}]
        }))
        .expect("payload");

        assert!(payload.validate().is_err());
    }

    #[test]
    fn blank_title_and_garbage_date_fail() {
        let blank: TestCreate =
            serde_json::from_value(json!({"title": " "})).expect("payload");
        assert!(blank.validate().is_err());

        let garbage = serde_json::from_value::<TestCreate>(json!({
            "title": "Quiz",
            "scheduledAt": "next tuesday"
        }));
        assert!(garbage.is_err());
    }

    #[test]
    fn submit_request_accepts_mixed_answers() {
        let payload: SubmitRequest = serde_json::from_value(json!({
            "answers": [1, [0, 2], "free text", null],
            "durationInMinutes": 12
        }))
        .expect("payload");

        assert_eq!(payload.answers.len(), 4);
        assert_eq!(payload.duration_minutes, Some(12));
        assert!(payload.validate().is_ok());
    }

    fn quiz() -> Test {
        let now = datetime!(2025-04-01 10:00);
        Test {
            id: "test-1".to_string(),
            title: "Quiz".to_string(),
            subject: None,
            scheduled_at: None,
            duration_minutes: 30,
            created_by: "teacher-1".to_string(),
            join_code: "abcdEFGH".to_string(),
            participant_ids: vec!["student-1".to_string()],
            questions: sqlx::types::Json(vec![Question {
                question_type: "choice".to_string(),
                question_text: "1+1?".to_string(),
                points: 1,
                options: vec!["1".to_string(), "2".to_string()],
                correct_answer: vec![1],
                word_limit: None,
                sample_answer: Some("two".to_string()),
            }]),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn participants_do_not_see_answer_keys() {
        let student =
            serde_json::to_value(TestResponse::for_viewer(quiz(), "student-1")).expect("json");
        let question = &student["questions"][0];
        assert_eq!(question["type"], "choice");
        assert_eq!(question["options"], json!(["1", "2"]));
        assert!(question.get("correct_answer").is_none());
        assert!(question.get("sample_answer").is_none());

        let creator =
            serde_json::to_value(TestResponse::for_viewer(quiz(), "teacher-1")).expect("json");
        assert_eq!(creator["questions"][0]["correct_answer"], json!([1]));
        assert_eq!(creator["questions"][0]["sample_answer"], "two");
    }
}
