use std::collections::BTreeMap;

use serde::Serialize;

use super::Trend;

const LOW_SUBJECT_AVERAGE: f64 = 60.0;
const VERY_LOW_SUBJECT_AVERAGE: f64 = 50.0;
const LOW_OVERALL_AVERAGE: f64 = 60.0;
const GOOD_OVERALL_AVERAGE: f64 = 75.0;
const HIGH_SCORE: i32 = 80;
const MIN_ATTEMPTS_FOR_STYLE: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Insights {
    pub(crate) overall_summary: String,
    pub(crate) recommendations: Vec<String>,
    pub(crate) concerns: Vec<String>,
    pub(crate) predicted_performance: String,
    pub(crate) learning_style: String,
}

pub(super) fn generate(
    scores: &[i32],
    overall_average: f64,
    subject_averages: &BTreeMap<String, f64>,
    trend: Trend,
) -> Insights {
    Insights {
        overall_summary: overall_summary(scores.len(), overall_average, trend),
        recommendations: recommendations(subject_averages, trend),
        concerns: concerns(subject_averages, overall_average, trend),
        predicted_performance: predicted_performance(trend, overall_average).to_string(),
        learning_style: learning_style(scores).to_string(),
    }
}

pub(crate) fn overall_summary(total_tests: usize, average: f64, trend: Trend) -> String {
    format!(
        "You have completed {total_tests} tests with an average score of {average:.2}. \
         Your overall performance trend is {}.",
        trend.as_str()
    )
}

pub(crate) fn recommendations(
    subject_averages: &BTreeMap<String, f64>,
    trend: Trend,
) -> Vec<String> {
    let mut items = Vec::new();

    if trend == Trend::Declining {
        items.push(
            "Your recent performance is declining. Revise weak topics and take mock tests."
                .to_string(),
        );
    }

    for (subject, &average) in subject_averages {
        if average < LOW_SUBJECT_AVERAGE {
            items.push(format!("Focus more on {subject} to improve your score."));
        }
    }

    if items.is_empty() {
        items.push("Keep up the good work and maintain consistency.".to_string());
    }

    items
}

pub(crate) fn concerns(
    subject_averages: &BTreeMap<String, f64>,
    overall_average: f64,
    trend: Trend,
) -> Vec<String> {
    let mut items = Vec::new();

    if overall_average < LOW_OVERALL_AVERAGE {
        items.push("Your overall average score is low.".to_string());
    }
    if trend == Trend::Declining {
        items.push("Your performance trend shows a decline.".to_string());
    }
    for (subject, &average) in subject_averages {
        if average < VERY_LOW_SUBJECT_AVERAGE {
            items.push(format!("Very low performance detected in {subject}"));
        }
    }

    items
}

pub(crate) fn predicted_performance(trend: Trend, overall_average: f64) -> &'static str {
    match trend {
        Trend::Improving => "Your performance is likely to improve in upcoming tests.",
        Trend::Declining => "Performance may decline if corrective actions are not taken.",
        Trend::Stable if overall_average >= GOOD_OVERALL_AVERAGE => {
            "You are expected to maintain good performance."
        }
        Trend::Stable => "Consistent practice can improve your future results.",
    }
}

pub(crate) fn learning_style(scores: &[i32]) -> &'static str {
    if scores.len() < MIN_ATTEMPTS_FOR_STYLE {
        return "Insufficient data to determine learning style.";
    }

    let high_scores = scores.iter().filter(|&&score| score >= HIGH_SCORE).count();
    if high_scores > scores.len() / 2 {
        "Concept-Oriented Learner"
    } else {
        "Practice-Oriented Learner"
    }
}
