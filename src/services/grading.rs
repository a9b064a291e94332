use serde_json::Value;

use crate::db::models::{AnswerRecord, Question};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradeOutcome {
    pub(crate) total_questions: i32,
    pub(crate) correct_answers: i32,
    pub(crate) score: i32,
    pub(crate) answers: Vec<AnswerRecord>,
}

/// Grades `answers` against `questions` position by position. Missing
/// trailing answers are recorded as `null` and count as incorrect.
pub(crate) fn grade_submission(questions: &[Question], answers: &[Value]) -> GradeOutcome {
    let mut records = Vec::with_capacity(questions.len());
    let mut correct = 0;

    for (index, question) in questions.iter().enumerate() {
        let answer = answers.get(index).cloned().unwrap_or(Value::Null);
        let is_correct = is_answer_correct(question, &answer);
        if is_correct {
            correct += 1;
        }
        records.push(AnswerRecord { question_index: index, answer, is_correct });
    }

    let total = questions.len() as i32;

    GradeOutcome {
        total_questions: total,
        correct_answers: correct,
        score: percentage_score(correct, total),
        answers: records,
    }
}

pub(crate) fn is_answer_correct(question: &Question, answer: &Value) -> bool {
    // Free-text questions are left for manual review.
    if !question.has_options() {
        return false;
    }

    match answer {
        Value::Number(_) => match (as_index(answer), question.correct_answer.as_slice()) {
            (Some(selected), [only]) => selected == *only,
            _ => false,
        },
        Value::Array(items) => {
            let Some(mut selected) = items.iter().map(as_index).collect::<Option<Vec<_>>>()
            else {
                return false;
            };
            let mut expected = question.correct_answer.clone();
            selected.sort_unstable();
            expected.sort_unstable();
            selected == expected
        }
        _ => false,
    }
}

/// Rounded integer percentage; zero when there is nothing to grade.
pub(crate) fn percentage_score(correct: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    (f64::from(correct) * 100.0 / f64::from(total)).round() as i32
}

fn as_index(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|number| number.trunc() as i64))
}
