//! Teacher-facing review of one test: class statistics, per-student results,
//! per-question difficulty and a heuristic class report.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::{Question, Test, TestAttempt};
use crate::services::ranking::{letter_grade, PerformanceLevel};

const PASS_SCORE: i32 = 60;
const EASY_BELOW: f64 = 30.0;
const MEDIUM_BELOW: f64 = 60.0;
const HIGHLIGHT_LIMIT: usize = 3;
const WIDE_SPREAD_STD_DEV: f64 = 20.0;
const GRADES: [&str; 5] = ["A", "B", "C", "D", "F"];

#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct TestStatistics {
    pub(crate) total_students: usize,
    pub(crate) average_score: f64,
    pub(crate) median_score: f64,
    pub(crate) highest_score: f64,
    pub(crate) lowest_score: f64,
    pub(crate) standard_deviation: f64,
    pub(crate) grade_distribution: BTreeMap<String, usize>,
    pub(crate) pass_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub(crate) fn from_percentage(percentage: f64) -> Self {
        if percentage < EASY_BELOW {
            Self::Easy
        } else if percentage < MEDIUM_BELOW {
            Self::Medium
        } else {
            Self::Hard
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionDifficulty {
    pub(crate) question_index: usize,
    pub(crate) difficulty_percentage: f64,
    pub(crate) difficulty_level: Difficulty,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionAnalysis {
    pub(crate) question_difficulties: Vec<QuestionDifficulty>,
    pub(crate) most_missed_questions: Vec<String>,
    pub(crate) most_correct_questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionOutcome {
    pub(crate) question_index: usize,
    pub(crate) question_text: String,
    pub(crate) is_correct: bool,
    pub(crate) student_answer: serde_json::Value,
    pub(crate) correct_answer: Vec<i64>,
    pub(crate) difficulty_level: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StudentResult {
    pub(crate) student_id: String,
    pub(crate) student_name: Option<String>,
    pub(crate) score: i32,
    pub(crate) grade: &'static str,
    pub(crate) completed_at: String,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) performance_level: PerformanceLevel,
    pub(crate) question_results: Vec<QuestionOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ClassReport {
    pub(crate) summary: String,
    pub(crate) insights: Vec<String>,
    pub(crate) recommendations: Vec<String>,
    pub(crate) class_performance: PerformanceLevel,
    pub(crate) areas_of_concern: Vec<String>,
    pub(crate) suggested_actions: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TestReview {
    pub(crate) test_id: String,
    pub(crate) test_title: String,
    pub(crate) subject: Option<String>,
    pub(crate) statistics: TestStatistics,
    pub(crate) student_results: Vec<StudentResult>,
    pub(crate) question_analysis: QuestionAnalysis,
    pub(crate) ai_report: Option<ClassReport>,
}

/// `student_names` maps student ids to display names; unknown ids are
/// reported without a name.
pub(crate) fn build_test_review(
    test: &Test,
    attempts: &[TestAttempt],
    student_names: &HashMap<String, String>,
    include_report: bool,
) -> TestReview {
    let scores: Vec<i32> = attempts.iter().map(|attempt| attempt.score).collect();
    let statistics = statistics(&scores);
    let difficulties = question_difficulties(test.questions(), attempts);
    let question_analysis = question_analysis(test.questions(), difficulties);

    let student_results = attempts
        .iter()
        .map(|attempt| {
            student_result(attempt, test.questions(), &question_analysis, student_names)
        })
        .collect();

    let ai_report = include_report
        .then(|| class_report(&test.title, &statistics, test.questions(), &question_analysis));

    TestReview {
        test_id: test.id.clone(),
        test_title: test.title.clone(),
        subject: test.subject.clone(),
        statistics,
        student_results,
        question_analysis,
        ai_report,
    }
}

pub(crate) fn statistics(scores: &[i32]) -> TestStatistics {
    let mut grade_distribution: BTreeMap<String, usize> =
        GRADES.iter().map(|grade| (grade.to_string(), 0)).collect();

    if scores.is_empty() {
        return TestStatistics { grade_distribution, ..TestStatistics::default() };
    }

    let count = scores.len() as f64;
    let values: Vec<f64> = scores.iter().map(|&score| f64::from(score)).collect();
    let average = values.iter().sum::<f64>() / count;
    let variance = values.iter().map(|value| (value - average).powi(2)).sum::<f64>() / count;

    let mut sorted = values.clone();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median =
        if sorted.len() % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] };

    for &score in scores {
        *grade_distribution.entry(letter_grade(score).to_string()).or_default() += 1;
    }
    let passed = scores.iter().filter(|&&score| score >= PASS_SCORE).count();

    TestStatistics {
        total_students: scores.len(),
        average_score: average,
        median_score: median,
        highest_score: sorted[sorted.len() - 1],
        lowest_score: sorted[0],
        standard_deviation: variance.sqrt(),
        grade_distribution,
        pass_rate: passed as f64 * 100.0 / count,
    }
}

/// Percentage of attempts that did not answer each question correctly.
pub(crate) fn question_difficulties(
    questions: &[Question],
    attempts: &[TestAttempt],
) -> Vec<QuestionDifficulty> {
    (0..questions.len())
        .map(|index| {
            let percentage = if attempts.is_empty() {
                0.0
            } else {
                let missed = attempts
                    .iter()
                    .filter(|attempt| {
                        !attempt.answer_for(index).map(|record| record.is_correct).unwrap_or(false)
                    })
                    .count();
                missed as f64 * 100.0 / attempts.len() as f64
            };

            QuestionDifficulty {
                question_index: index,
                difficulty_percentage: percentage,
                difficulty_level: Difficulty::from_percentage(percentage),
            }
        })
        .collect()
}

fn question_analysis(
    questions: &[Question],
    question_difficulties: Vec<QuestionDifficulty>,
) -> QuestionAnalysis {
    let text_of = |difficulty: &QuestionDifficulty| {
        questions
            .get(difficulty.question_index)
            .map(|question| question.question_text.clone())
            .unwrap_or_default()
    };

    let mut by_difficulty: Vec<&QuestionDifficulty> = question_difficulties.iter().collect();
    by_difficulty.sort_by(|a, b| b.difficulty_percentage.total_cmp(&a.difficulty_percentage));

    let most_missed_questions = by_difficulty
        .iter()
        .filter(|difficulty| difficulty.difficulty_percentage > 0.0)
        .take(HIGHLIGHT_LIMIT)
        .map(|difficulty| text_of(*difficulty))
        .collect();

    let most_correct_questions = by_difficulty
        .iter()
        .rev()
        .filter(|difficulty| difficulty.difficulty_percentage < 100.0)
        .take(HIGHLIGHT_LIMIT)
        .map(|difficulty| text_of(*difficulty))
        .collect();

    QuestionAnalysis { question_difficulties, most_missed_questions, most_correct_questions }
}

fn student_result(
    attempt: &TestAttempt,
    questions: &[Question],
    analysis: &QuestionAnalysis,
    student_names: &HashMap<String, String>,
) -> StudentResult {
    let question_results = questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let record = attempt.answer_for(index);
            QuestionOutcome {
                question_index: index,
                question_text: question.question_text.clone(),
                is_correct: record.map(|record| record.is_correct).unwrap_or(false),
                student_answer: record
                    .map(|record| record.answer.clone())
                    .unwrap_or(serde_json::Value::Null),
                correct_answer: question.correct_answer.clone(),
                difficulty_level: analysis
                    .question_difficulties
                    .get(index)
                    .map(|difficulty| difficulty.difficulty_percentage)
                    .unwrap_or_default(),
            }
        })
        .collect();

    StudentResult {
        student_id: attempt.student_id.clone(),
        student_name: student_names.get(&attempt.student_id).cloned(),
        score: attempt.score,
        grade: letter_grade(attempt.score),
        completed_at: format_primitive(attempt.completed_at),
        correct_answers: attempt.correct_answers,
        total_questions: attempt.total_questions,
        performance_level: PerformanceLevel::from_score(attempt.score),
        question_results,
    }
}

pub(crate) fn class_report(
    title: &str,
    statistics: &TestStatistics,
    questions: &[Question],
    analysis: &QuestionAnalysis,
) -> ClassReport {
    let class_performance = PerformanceLevel::from_score(statistics.average_score.round() as i32);

    if statistics.total_students == 0 {
        return ClassReport {
            summary: format!("No students have completed {title} yet."),
            insights: Vec::new(),
            recommendations: Vec::new(),
            class_performance,
            areas_of_concern: Vec::new(),
            suggested_actions: "Share the join code with your class to collect results."
                .to_string(),
        };
    }

    let hard: Vec<&QuestionDifficulty> = analysis
        .question_difficulties
        .iter()
        .filter(|difficulty| difficulty.difficulty_level == Difficulty::Hard)
        .collect();
    let question_label = |difficulty: &QuestionDifficulty| {
        let text = questions
            .get(difficulty.question_index)
            .map(|question| question.question_text.as_str())
            .unwrap_or_default();
        format!("Question {} ({text})", difficulty.question_index + 1)
    };

    let summary = format!(
        "{} students completed {title}. The class average is {:.2} with a pass rate of {:.2}%.",
        statistics.total_students, statistics.average_score, statistics.pass_rate
    );

    let mut insights = vec![format!(
        "Scores ranged from {:.0} to {:.0} with a median of {:.2}.",
        statistics.lowest_score, statistics.highest_score, statistics.median_score
    )];
    if statistics.standard_deviation > WIDE_SPREAD_STD_DEV {
        insights.push(format!(
            "Scores vary widely (standard deviation {:.2}); understanding is uneven.",
            statistics.standard_deviation
        ));
    } else {
        insights.push("Scores are fairly consistent across the class.".to_string());
    }
    if let Some(missed) = analysis.most_missed_questions.first() {
        insights.push(format!("The most missed question was: {missed}"));
    }

    let mut recommendations: Vec<String> = hard
        .iter()
        .map(|difficulty| {
            format!("Revisit the material behind {}.", question_label(*difficulty))
        })
        .collect();
    if statistics.pass_rate < f64::from(PASS_SCORE) {
        recommendations.push("Schedule a review session before moving to new topics.".to_string());
    }
    if recommendations.is_empty() {
        recommendations.push("Keep the pace and add more challenging questions.".to_string());
    }

    let mut areas_of_concern = Vec::new();
    let failing = statistics.grade_distribution.get("F").copied().unwrap_or_default();
    if failing > 0 {
        let noun = if failing == 1 { "student" } else { "students" };
        areas_of_concern.push(format!("{failing} {noun} scored below {PASS_SCORE}."));
    }
    for difficulty in &hard {
        areas_of_concern.push(format!(
            "{} was missed by {:.0}% of students.",
            question_label(*difficulty),
            difficulty.difficulty_percentage
        ));
    }

    let suggested_actions = if hard.is_empty() && failing == 0 {
        "No immediate action needed; consider enrichment material for top performers.".to_string()
    } else {
        "Review the hardest questions in class and offer extra practice below the pass mark."
            .to_string()
    };

    ClassReport {
        summary,
        insights,
        recommendations,
        class_performance,
        areas_of_concern,
        suggested_actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AnswerRecord;
    use serde_json::json;
    use sqlx::types::Json;
    use time::macros::datetime;

    fn question(text: &str) -> Question {
        Question {
            question_type: "choice".to_string(),
            question_text: text.to_string(),
            options: vec!["a".into(), "b".into()],
            correct_answer: vec![0],
            ..Question::default()
        }
    }

    fn sample_test(questions: Vec<Question>) -> Test {
        let now = datetime!(2025-04-01 10:00);
        Test {
            id: "test-1".to_string(),
            title: "Algebra quiz".to_string(),
            subject: Some("Math".to_string()),
            scheduled_at: None,
            duration_minutes: 30,
            created_by: "teacher-1".to_string(),
            join_code: "abcdEFGH".to_string(),
            participant_ids: vec![],
            questions: Json(questions),
            created_at: now,
            updated_at: now,
        }
    }

    fn attempt(student_id: &str, correct: &[bool]) -> TestAttempt {
        let right = correct.iter().filter(|&&value| value).count() as i32;
        let total = correct.len() as i32;
        TestAttempt {
            id: format!("attempt-{student_id}"),
            test_id: "test-1".to_string(),
            student_id: student_id.to_string(),
            test_title: "Algebra quiz".to_string(),
            subject: Some("Math".to_string()),
            join_code: "abcdEFGH".to_string(),
            completed_at: datetime!(2025-04-02 10:00),
            score: crate::services::grading::percentage_score(right, total),
            total_questions: total,
            correct_answers: right,
            duration_minutes: 30,
            answers: Json(
                correct
                    .iter()
                    .enumerate()
                    .map(|(index, &is_correct)| AnswerRecord {
                        question_index: index,
                        answer: json!(if is_correct { 0 } else { 1 }),
                        is_correct,
                    })
                    .collect(),
            ),
            is_completed: true,
        }
    }

    #[test]
    fn statistics_over_scores() {
        let stats = statistics(&[100, 80, 60, 40]);

        assert_eq!(stats.total_students, 4);
        assert_eq!(stats.average_score, 70.0);
        assert_eq!(stats.median_score, 70.0);
        assert_eq!(stats.highest_score, 100.0);
        assert_eq!(stats.lowest_score, 40.0);
        assert!((stats.standard_deviation - 500f64.sqrt()).abs() < 1e-9);
        assert_eq!(stats.pass_rate, 75.0);
        assert_eq!(stats.grade_distribution["A"], 1);
        assert_eq!(stats.grade_distribution["B"], 1);
        assert_eq!(stats.grade_distribution["C"], 0);
        assert_eq!(stats.grade_distribution["D"], 1);
        assert_eq!(stats.grade_distribution["F"], 1);
    }

    #[test]
    fn empty_statistics_are_zeroed() {
        let stats = statistics(&[]);
        assert_eq!(stats.total_students, 0);
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.pass_rate, 0.0);
        assert_eq!(stats.grade_distribution.len(), 5);
    }

    #[test]
    fn difficulty_counts_missing_answers_as_wrong() {
        let questions = vec![question("q1"), question("q2")];
        let attempts = vec![attempt("s1", &[true, false]), attempt("s2", &[true])];

        let difficulties = question_difficulties(&questions, &attempts);
        assert_eq!(difficulties[0].difficulty_percentage, 0.0);
        assert_eq!(difficulties[0].difficulty_level, Difficulty::Easy);
        assert_eq!(difficulties[1].difficulty_percentage, 100.0);
        assert_eq!(difficulties[1].difficulty_level, Difficulty::Hard);
    }

    #[test]
    fn difficulty_bands() {
        assert_eq!(Difficulty::from_percentage(29.9), Difficulty::Easy);
        assert_eq!(Difficulty::from_percentage(30.0), Difficulty::Medium);
        assert_eq!(Difficulty::from_percentage(60.0), Difficulty::Hard);
    }

    #[test]
    fn review_highlights_questions_and_names_students() {
        let test = sample_test(vec![question("easy one"), question("tricky one")]);
        let attempts = vec![attempt("s1", &[true, false]), attempt("s2", &[true, true])];
        let names = HashMap::from([("s1".to_string(), "Ada".to_string())]);

        let review = build_test_review(&test, &attempts, &names, true);

        assert_eq!(review.statistics.total_students, 2);
        assert_eq!(review.question_analysis.most_missed_questions, vec!["tricky one".to_string()]);
        assert_eq!(
            review.question_analysis.most_correct_questions,
            vec!["easy one".to_string(), "tricky one".to_string()]
        );
        assert_eq!(review.student_results[0].student_name.as_deref(), Some("Ada"));
        assert_eq!(review.student_results[1].student_name, None);
        assert_eq!(review.student_results[0].grade, "F");
        assert_eq!(review.student_results[0].question_results[1].difficulty_level, 50.0);

        let report = review.ai_report.expect("report");
        assert!(report.summary.starts_with("2 students completed Algebra quiz."));
        assert_eq!(report.areas_of_concern, vec!["1 student scored below 60.".to_string()]);
    }

    #[test]
    fn failing_count_is_pluralised() {
        let test = sample_test(vec![question("q1")]);
        let attempts = vec![attempt("s1", &[false]), attempt("s2", &[false])];

        let review = build_test_review(&test, &attempts, &HashMap::new(), true);

        let report = review.ai_report.expect("report");
        assert_eq!(report.areas_of_concern[0], "2 students scored below 60.");
    }

    #[test]
    fn report_is_optional_and_handles_no_attempts() {
        let test = sample_test(vec![question("q1")]);
        assert!(build_test_review(&test, &[], &HashMap::new(), false).ai_report.is_none());

        let report =
            build_test_review(&test, &[], &HashMap::new(), true).ai_report.expect("report");
        assert_eq!(report.summary, "No students have completed Algebra quiz yet.");
    }
}
