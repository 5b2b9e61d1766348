use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// What the model is asked for: a short summary plus exactly three
/// recommendations. Fields the model failed to label stay empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightReport {
    pub summary: String,
    pub recommendations: [String; 3],
}

/// One row of `daily_recommendations`, as read back from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecommendation {
    pub analysis_date: NaiveDate,
    pub llm_summary: String,
    pub recommendations: [String; 3],
    pub created_at: DateTime<Utc>,
}
