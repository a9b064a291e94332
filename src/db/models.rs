use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::UserRole;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) role: UserRole,
    pub(crate) department: Option<String>,
    pub(crate) profile_picture_url: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// A question embedded in its test. It has no identity of its own and is
/// only ever read or written together with the owning [`Test`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Question {
    #[serde(rename = "type", default)]
    pub(crate) question_type: String,
    #[serde(default, alias = "questionText")]
    pub(crate) question_text: String,
    #[serde(default)]
    pub(crate) points: i32,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    #[serde(default, alias = "correctAnswer")]
    pub(crate) correct_answer: Vec<i64>,
    #[serde(default, alias = "wordLimit")]
    pub(crate) word_limit: Option<i32>,
    #[serde(default, alias = "sampleAnswer")]
    pub(crate) sample_answer: Option<String>,
}

impl Question {
    /// Choice questions are the only auto-gradable kind.
    pub(crate) fn has_options(&self) -> bool {
        !self.options.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Test {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) subject: Option<String>,
    pub(crate) scheduled_at: Option<PrimitiveDateTime>,
    pub(crate) duration_minutes: i32,
    pub(crate) created_by: String,
    pub(crate) join_code: String,
    pub(crate) participant_ids: Vec<String>,
    pub(crate) questions: Json<Vec<Question>>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Test {
    pub(crate) fn is_creator(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }

    pub(crate) fn is_participant(&self, user_id: &str) -> bool {
        self.participant_ids.iter().any(|id| id == user_id)
    }

    pub(crate) fn questions(&self) -> &[Question] {
        &self.questions.0
    }
}

/// Grading outcome for one question of an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AnswerRecord {
    pub(crate) question_index: usize,
    pub(crate) answer: serde_json::Value,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TestAttempt {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) test_title: String,
    pub(crate) subject: Option<String>,
    pub(crate) join_code: String,
    pub(crate) completed_at: PrimitiveDateTime,
    pub(crate) score: i32,
    pub(crate) total_questions: i32,
    pub(crate) correct_answers: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) answers: Json<Vec<AnswerRecord>>,
    pub(crate) is_completed: bool,
}

impl TestAttempt {
    pub(crate) fn answer_for(&self, question_index: usize) -> Option<&AnswerRecord> {
        self.answers.0.iter().find(|record| record.question_index == question_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_accepts_camel_case_payload() {
        let question: Question = serde_json::from_value(serde_json::json!({
            "type": "choice",
            "questionText": "2 + 2?",
            "points": 2,
            "options": ["3", "4"],
            "correctAnswer": [1]
        }))
        .expect("question");

        assert_eq!(question.question_type, "choice");
        assert_eq!(question.question_text, "2 + 2?");
        assert_eq!(question.correct_answer, vec![1]);
        assert!(question.has_options());
    }

    #[test]
    fn text_question_defaults_to_no_options() {
        let question: Question =
            serde_json::from_value(serde_json::json!({"type": "text", "question_text": "Why?"}))
                .expect("question");

        assert!(!question.has_options());
        assert!(question.correct_answer.is_empty());
    }
}
