//! Placement of one attempt among all completed attempts of a test, plus the
//! score bands shared by reviews and analytics.

use std::cmp::Reverse;

use serde::Serialize;

/// 1-based rank of `(score, correct)` among `attempts` ordered by score then
/// correct answers, both descending. Equal pairs share the rank of the first
/// of them.
pub(crate) fn rank(attempts: &[(i32, i32)], score: i32, correct: i32) -> usize {
    if attempts.is_empty() {
        return 1;
    }

    let mut ordered = attempts.to_vec();
    ordered.sort_by_key(|&(score, correct)| (Reverse(score), Reverse(correct)));

    ordered
        .iter()
        .position(|&pair| pair == (score, correct))
        .map(|index| index + 1)
        .unwrap_or(ordered.len() + 1)
}

/// Share of attempts scoring at or below `score`, as a percentage.
pub(crate) fn percentile(scores: &[i32], score: i32) -> f64 {
    if scores.is_empty() {
        return 100.0;
    }

    let at_or_below = scores.iter().filter(|&&other| other <= score).count();
    at_or_below as f64 * 100.0 / scores.len() as f64
}

pub(crate) fn letter_grade(score: i32) -> &'static str {
    match score {
        s if s >= 90 => "A",
        s if s >= 80 => "B",
        s if s >= 70 => "C",
        s if s >= 60 => "D",
        _ => "F",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum PerformanceLevel {
    Excellent,
    Good,
    Average,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl PerformanceLevel {
    pub(crate) fn from_score(score: i32) -> Self {
        match score {
            s if s >= 90 => Self::Excellent,
            s if s >= 80 => Self::Good,
            s if s >= 70 => Self::Average,
            _ => Self::NeedsImprovement,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::NeedsImprovement => "Needs Improvement",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_share_rank() {
        let attempts = [(90, 9), (80, 8), (90, 9)];
        assert_eq!(rank(&attempts, 90, 9), 1);
        assert_eq!(rank(&attempts, 80, 8), 3);
    }

    #[test]
    fn correct_answers_break_score_ties() {
        let attempts = [(80, 8), (80, 9)];
        assert_eq!(rank(&attempts, 80, 9), 1);
        assert_eq!(rank(&attempts, 80, 8), 2);
    }

    #[test]
    fn rank_edge_cases() {
        assert_eq!(rank(&[], 50, 5), 1);
        assert_eq!(rank(&[(90, 9), (70, 7)], 60, 6), 3);
    }

    #[test]
    fn percentile_counts_at_or_below() {
        assert_eq!(percentile(&[], 10), 100.0);
        assert_eq!(percentile(&[42], 42), 100.0);
        assert_eq!(percentile(&[10, 20, 30, 40], 10), 25.0);
        assert_eq!(percentile(&[10, 20, 20, 40], 20), 75.0);
    }

    #[test]
    fn grade_and_level_bands() {
        assert_eq!(letter_grade(90), "A");
        assert_eq!(letter_grade(89), "B");
        assert_eq!(letter_grade(70), "C");
        assert_eq!(letter_grade(60), "D");
        assert_eq!(letter_grade(59), "F");

        assert_eq!(PerformanceLevel::from_score(95), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::from_score(80), PerformanceLevel::Good);
        assert_eq!(PerformanceLevel::from_score(70), PerformanceLevel::Average);
        assert_eq!(PerformanceLevel::from_score(69).as_str(), "Needs Improvement");
        assert_eq!(
            serde_json::to_string(&PerformanceLevel::NeedsImprovement).unwrap(),
            "\"Needs Improvement\""
        );
    }
}
