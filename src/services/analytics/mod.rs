//! Per-student analytics over completed attempts. Everything here is a pure
//! function of the attempt history and the current time; nothing errors on
//! missing data.

mod insights;

use std::collections::BTreeMap;

use serde::Serialize;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use crate::core::time::{date_label, format_primitive, to_primitive_utc};
use crate::db::models::TestAttempt;
use crate::services::ranking::PerformanceLevel;

pub(crate) use insights::Insights;

const RECENT_TESTS_LIMIT: usize = 10;
const TREND_THRESHOLD_PERCENT: f64 = 5.0;
const STRENGTH_MARGIN: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeRange {
    All,
    Week,
    Month,
    Semester,
    /// Unrecognised value; keeps everything after the Unix epoch.
    Unknown,
}

impl TimeRange {
    pub(crate) fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") | Some("all") => Self::All,
            Some("week") => Self::Week,
            Some("month") => Self::Month,
            Some("semester") => Self::Semester,
            Some(_) => Self::Unknown,
        }
    }

    pub(crate) fn cutoff(self, now: PrimitiveDateTime) -> Option<PrimitiveDateTime> {
        match self {
            Self::All => None,
            Self::Week => Some(now - Duration::days(7)),
            Self::Month => Some(now - Duration::days(30)),
            Self::Semester => Some(now - Duration::days(120)),
            Self::Unknown => Some(to_primitive_utc(OffsetDateTime::UNIX_EPOCH)),
        }
    }
}

/// The slice of an attempt the analytics pipeline looks at.
#[derive(Debug, Clone)]
pub(crate) struct ScoredAttempt {
    pub(crate) test_id: String,
    pub(crate) test_title: String,
    pub(crate) subject: Option<String>,
    pub(crate) score: i32,
    pub(crate) completed_at: PrimitiveDateTime,
}

impl From<TestAttempt> for ScoredAttempt {
    fn from(attempt: TestAttempt) -> Self {
        Self {
            test_id: attempt.test_id,
            test_title: attempt.test_title,
            subject: attempt.subject,
            score: attempt.score,
            completed_at: attempt.completed_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Improving => "Improving",
            Self::Declining => "Declining",
            Self::Stable => "Stable",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PerformanceTrend {
    pub(crate) trend: Trend,
    pub(crate) trend_percentage: f64,
    pub(crate) scores_over_time: Vec<f64>,
    pub(crate) time_labels: Vec<String>,
}

impl PerformanceTrend {
    fn stable() -> Self {
        Self {
            trend: Trend::Stable,
            trend_percentage: 0.0,
            scores_over_time: Vec::new(),
            time_labels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TestPerformance {
    pub(crate) test_id: String,
    pub(crate) test_title: String,
    pub(crate) subject: Option<String>,
    pub(crate) score: i32,
    pub(crate) completed_at: String,
    pub(crate) performance_level: PerformanceLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum StandingKind {
    Strength,
    Weakness,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SubjectStanding {
    pub(crate) subject: String,
    #[serde(rename = "type")]
    pub(crate) kind: StandingKind,
    pub(crate) description: String,
    pub(crate) score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StudentAnalytics {
    pub(crate) overall_average: f64,
    pub(crate) subject_averages: BTreeMap<String, f64>,
    pub(crate) recent_tests: Vec<TestPerformance>,
    pub(crate) performance_trend: PerformanceTrend,
    pub(crate) strengths_weaknesses: Vec<SubjectStanding>,
    pub(crate) ai_insights: Option<Insights>,
}

impl StudentAnalytics {
    fn empty() -> Self {
        Self {
            overall_average: 0.0,
            subject_averages: BTreeMap::new(),
            recent_tests: Vec::new(),
            performance_trend: PerformanceTrend::stable(),
            strengths_weaknesses: Vec::new(),
            ai_insights: None,
        }
    }
}

pub(crate) fn build_student_analytics(
    attempts: Vec<ScoredAttempt>,
    subject: Option<&str>,
    range: TimeRange,
    now: PrimitiveDateTime,
) -> StudentAnalytics {
    let attempts = filter_attempts(attempts, subject, range.cutoff(now));
    if attempts.is_empty() {
        return StudentAnalytics::empty();
    }

    let scores: Vec<i32> = attempts.iter().map(|attempt| attempt.score).collect();
    let overall_average = mean(&scores);
    let subject_averages = subject_averages(&attempts);
    let performance_trend = performance_trend(&attempts);
    let strengths_weaknesses = strengths_and_weaknesses(&subject_averages);

    let ai_insights = insights::generate(
        &scores,
        overall_average,
        &subject_averages,
        performance_trend.trend,
    );

    StudentAnalytics {
        overall_average,
        recent_tests: recent_tests(&attempts),
        subject_averages,
        performance_trend,
        strengths_weaknesses,
        ai_insights: Some(ai_insights),
    }
}

fn filter_attempts(
    attempts: Vec<ScoredAttempt>,
    subject: Option<&str>,
    cutoff: Option<PrimitiveDateTime>,
) -> Vec<ScoredAttempt> {
    attempts
        .into_iter()
        .filter(|attempt| match subject {
            Some(wanted) => attempt.subject.as_deref() == Some(wanted),
            None => true,
        })
        .filter(|attempt| cutoff.map_or(true, |cutoff| attempt.completed_at > cutoff))
        .collect()
}

/// Mean score per subject. Attempts without a subject are left out.
pub(crate) fn subject_averages(attempts: &[ScoredAttempt]) -> BTreeMap<String, f64> {
    let mut grouped: BTreeMap<String, Vec<i32>> = BTreeMap::new();
    for attempt in attempts {
        if let Some(subject) = attempt.subject.as_ref() {
            grouped.entry(subject.clone()).or_default().push(attempt.score);
        }
    }

    grouped.into_iter().map(|(subject, scores)| (subject, mean(&scores))).collect()
}

fn recent_tests(attempts: &[ScoredAttempt]) -> Vec<TestPerformance> {
    let mut ordered: Vec<&ScoredAttempt> = attempts.iter().collect();
    ordered.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    ordered
        .into_iter()
        .take(RECENT_TESTS_LIMIT)
        .map(|attempt| TestPerformance {
            test_id: attempt.test_id.clone(),
            test_title: attempt.test_title.clone(),
            subject: attempt.subject.clone(),
            score: attempt.score,
            completed_at: format_primitive(attempt.completed_at),
            performance_level: PerformanceLevel::from_score(attempt.score),
        })
        .collect()
}

/// Compares the mean of the older half of the history with the newer half.
pub(crate) fn performance_trend(attempts: &[ScoredAttempt]) -> PerformanceTrend {
    let mut ordered: Vec<&ScoredAttempt> = attempts.iter().collect();
    ordered.sort_by_key(|attempt| attempt.completed_at);

    let scores: Vec<i32> = ordered.iter().map(|attempt| attempt.score).collect();
    let mid = scores.len() / 2;
    let first = mean(&scores[..mid]);
    let second = mean(&scores[mid..]);

    let change = if first > 0.0 { (second - first) / first * 100.0 } else { 0.0 };
    let trend = if change > TREND_THRESHOLD_PERCENT {
        Trend::Improving
    } else if change < -TREND_THRESHOLD_PERCENT {
        Trend::Declining
    } else {
        Trend::Stable
    };

    PerformanceTrend {
        trend,
        trend_percentage: change.abs(),
        scores_over_time: scores.iter().map(|&score| f64::from(score)).collect(),
        time_labels: ordered.iter().map(|attempt| date_label(attempt.completed_at)).collect(),
    }
}

/// Subjects at least ten points above or below the mean of all subject
/// averages.
pub(crate) fn strengths_and_weaknesses(
    subject_averages: &BTreeMap<String, f64>,
) -> Vec<SubjectStanding> {
    if subject_averages.is_empty() {
        return Vec::new();
    }
    let baseline = subject_averages.values().sum::<f64>() / subject_averages.len() as f64;

    subject_averages
        .iter()
        .filter_map(|(subject, &average)| {
            let (kind, description) = if average >= baseline + STRENGTH_MARGIN {
                (StandingKind::Strength, format!("Strong performance in {subject}"))
            } else if average <= baseline - STRENGTH_MARGIN {
                (StandingKind::Weakness, format!("Weak performance in {subject}"))
            } else {
                return None;
            };

            Some(SubjectStanding { subject: subject.clone(), kind, description, score: average })
        })
        .collect()
}

fn mean(scores: &[i32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|&score| f64::from(score)).sum::<f64>() / scores.len() as f64
}
