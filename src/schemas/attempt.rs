use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::{AnswerRecord, Question, Test, TestAttempt};
use crate::services::ranking::{letter_grade, PerformanceLevel};

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) test_title: String,
    pub(crate) subject: Option<String>,
    pub(crate) join_code: String,
    pub(crate) completed_at: String,
    pub(crate) score: i32,
    pub(crate) total_questions: i32,
    pub(crate) correct_answers: i32,
    pub(crate) duration_minutes: i32,
    pub(crate) answers: Vec<AnswerRecord>,
    pub(crate) is_completed: bool,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: TestAttempt) -> Self {
        Self {
            id: attempt.id,
            test_id: attempt.test_id,
            student_id: attempt.student_id,
            test_title: attempt.test_title,
            subject: attempt.subject,
            join_code: attempt.join_code,
            completed_at: format_primitive(attempt.completed_at),
            score: attempt.score,
            total_questions: attempt.total_questions,
            correct_answers: attempt.correct_answers,
            duration_minutes: attempt.duration_minutes,
            answers: attempt.answers.0,
            is_completed: attempt.is_completed,
        }
    }
}

/// One row of a student's attempt history.
#[derive(Debug, Serialize)]
pub(crate) struct AttemptSummary {
    pub(crate) attempt_id: String,
    pub(crate) test_id: String,
    pub(crate) test_title: String,
    pub(crate) subject: Option<String>,
    pub(crate) score: i32,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) completed_at: String,
    pub(crate) duration_minutes: i32,
    pub(crate) grade: &'static str,
    pub(crate) performance_level: PerformanceLevel,
}

impl AttemptSummary {
    pub(crate) fn from_db(attempt: &TestAttempt) -> Self {
        Self {
            attempt_id: attempt.id.clone(),
            test_id: attempt.test_id.clone(),
            test_title: attempt.test_title.clone(),
            subject: attempt.subject.clone(),
            score: attempt.score,
            correct_answers: attempt.correct_answers,
            total_questions: attempt.total_questions,
            completed_at: format_primitive(attempt.completed_at),
            duration_minutes: attempt.duration_minutes,
            grade: letter_grade(attempt.score),
            performance_level: PerformanceLevel::from_score(attempt.score),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ReviewedQuestion {
    pub(crate) question_index: usize,
    pub(crate) question_text: String,
    pub(crate) student_answer: serde_json::Value,
    pub(crate) correct_answer: Vec<i64>,
    pub(crate) is_correct: bool,
    pub(crate) question: Question,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentTestReview {
    #[serde(flatten)]
    pub(crate) summary: AttemptSummary,
    pub(crate) question_results: Vec<ReviewedQuestion>,
    pub(crate) rank: usize,
    pub(crate) total_students: usize,
    pub(crate) percentile: f64,
}

impl StudentTestReview {
    pub(crate) fn build(
        test: &Test,
        attempt: &TestAttempt,
        rank: usize,
        total_students: usize,
        percentile: f64,
    ) -> Self {
        let question_results = test
            .questions()
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let record = attempt.answer_for(index);
                ReviewedQuestion {
                    question_index: index,
                    question_text: question.question_text.clone(),
                    student_answer: record
                        .map(|record| record.answer.clone())
                        .unwrap_or(serde_json::Value::Null),
                    correct_answer: question.correct_answer.clone(),
                    is_correct: record.map(|record| record.is_correct).unwrap_or(false),
                    question: question.clone(),
                }
            })
            .collect();

        let mut summary = AttemptSummary::from_db(attempt);
        summary.test_title = test.title.clone();
        summary.subject = test.subject.clone();

        Self { summary, question_results, rank, total_students, percentile }
    }
}
