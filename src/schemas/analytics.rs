use serde::{Deserialize, Serialize};

use crate::services::analytics::StudentAnalytics;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AnalyticsQuery {
    #[serde(default)]
    pub(crate) subject: Option<String>,
    #[serde(default, alias = "timeRange")]
    pub(crate) time_range: Option<String>,
}

impl AnalyticsQuery {
    pub(crate) fn subject(&self) -> Option<&str> {
        self.subject.as_deref().map(str::trim).filter(|subject| !subject.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TestReviewQuery {
    #[serde(default, alias = "includeAiReport")]
    pub(crate) include_ai_report: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentAnalyticsResponse {
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    #[serde(flatten)]
    pub(crate) analytics: StudentAnalytics,
}
