use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One stored trading day, as read back from `daily_stock_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPrice {
    pub date: NaiveDate,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjusted_close: f64,
    pub volume: i64,
    pub dividend_amount: f64,
    pub split_coefficient: f64,
    pub last_updated: DateTime<Utc>,
}
