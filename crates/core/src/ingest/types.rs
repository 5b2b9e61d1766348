use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

/// One day's fields exactly as the quote API transmits them: every number is
/// string-encoded and keyed by its positional label.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDailyBar {
    #[serde(rename = "1. open")]
    pub open: String,
    #[serde(rename = "2. high")]
    pub high: String,
    #[serde(rename = "3. low")]
    pub low: String,
    #[serde(rename = "4. close")]
    pub close: String,
    #[serde(rename = "5. adjusted close")]
    pub adjusted_close: String,
    #[serde(rename = "6. volume")]
    pub volume: String,
    #[serde(rename = "7. dividend amount")]
    pub dividend_amount: String,
    #[serde(rename = "8. split coefficient")]
    pub split_coefficient: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjusted_close: f64,
    pub volume: i64,
    pub dividend_amount: f64,
    pub split_coefficient: f64,
}

/// Daily bars keyed by trading day. The map is ordered, so the latest
/// trading day is simply the last key.
#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    pub bars: BTreeMap<NaiveDate, DailyBar>,
}

impl DailySeries {
    pub fn latest(&self) -> Option<(NaiveDate, &DailyBar)> {
        self.bars.last_key_value().map(|(date, bar)| (*date, bar))
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
