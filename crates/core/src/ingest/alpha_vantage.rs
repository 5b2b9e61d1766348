use crate::config::Settings;
use crate::ingest::error::FetchError;
use crate::ingest::types::{DailyBar, DailySeries, RawDailyBar};
use crate::ingest::MarketDataClient;
use anyhow::Context;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const SERIES_KEY: &str = "Time Series (Daily)";

#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_alpha_vantage_api_key()?.to_string();
        let base_url = std::env::var("ALPHA_VANTAGE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("ALPHA_VANTAGE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build quote API http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl MarketDataClient for AlphaVantageClient {
    fn provider_name(&self) -> &'static str {
        "alpha_vantage"
    }

    async fn fetch_daily(&self, symbol: &str) -> Result<DailySeries, FetchError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("function", "TIME_SERIES_DAILY_ADJUSTED"),
                ("symbol", symbol),
                ("outputsize", "full"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|err| FetchError::Transport(format!("request failed: {err}")))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|err| FetchError::Transport(format!("failed to read response body: {err}")))?;
        if !status.is_success() {
            return Err(FetchError::Transport(format!("HTTP {status}")));
        }

        let payload = serde_json::from_str::<Value>(&text)
            .map_err(|err| FetchError::Malformed(format!("response is not valid JSON: {err}")))?;

        parse_series_payload(&payload)
    }
}

pub fn parse_series_payload(payload: &Value) -> Result<DailySeries, FetchError> {
    if let Some(message) = api_error_message(payload) {
        return Err(FetchError::Api(message));
    }

    let series = payload.get(SERIES_KEY).ok_or(FetchError::MissingSeries)?;
    let entries = series
        .as_object()
        .ok_or_else(|| FetchError::Malformed(format!("{SERIES_KEY:?} is not an object")))?;

    let mut bars = BTreeMap::new();
    for (key, fields) in entries {
        let date = NaiveDate::parse_from_str(key, "%Y-%m-%d")
            .map_err(|_| FetchError::Malformed(format!("invalid date key: {key:?}")))?;
        let raw = serde_json::from_value::<RawDailyBar>(fields.clone())
            .map_err(|err| FetchError::Malformed(format!("{key}: {err}")))?;
        bars.insert(date, parse_bar(date, &raw)?);
    }

    Ok(DailySeries { bars })
}

// "Error Message" is the documented error field; "Note" carries rate-limit
// notices. Both arrive with HTTP 200.
fn api_error_message(payload: &Value) -> Option<String> {
    for key in ["Error Message", "Note"] {
        if let Some(value) = payload.get(key) {
            return Some(
                value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string()),
            );
        }
    }
    None
}

fn parse_bar(date: NaiveDate, raw: &RawDailyBar) -> Result<DailyBar, FetchError> {
    Ok(DailyBar {
        open: parse_price(date, "1. open", &raw.open)?,
        high: parse_price(date, "2. high", &raw.high)?,
        low: parse_price(date, "3. low", &raw.low)?,
        close: parse_price(date, "4. close", &raw.close)?,
        adjusted_close: parse_price(date, "5. adjusted close", &raw.adjusted_close)?,
        volume: raw.volume.trim().parse::<i64>().map_err(|_| {
            FetchError::Malformed(format!(
                "{date}: field \"6. volume\" is not an integer: {:?}",
                raw.volume
            ))
        })?,
        dividend_amount: parse_price(date, "7. dividend amount", &raw.dividend_amount)?,
        split_coefficient: parse_price(date, "8. split coefficient", &raw.split_coefficient)?,
    })
}

fn parse_price(date: NaiveDate, field: &str, raw: &str) -> Result<f64, FetchError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| FetchError::Malformed(format!("{date}: field {field:?} is not a number: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day_fields(open: &str, close: &str, volume: &str) -> Value {
        json!({
            "1. open": open,
            "2. high": "105.0",
            "3. low": "99.0",
            "4. close": close,
            "5. adjusted close": close,
            "6. volume": volume,
            "7. dividend amount": "0.0",
            "8. split coefficient": "1.0",
        })
    }

    #[test]
    fn parses_string_fields_into_typed_bars() {
        let payload = json!({
            "Meta Data": {"2. Symbol": "IBM"},
            "Time Series (Daily)": {
                "2024-01-02": day_fields("100.0", "102.5", "1000000"),
            }
        });

        let series = parse_series_payload(&payload).unwrap();
        let (date, bar) = series.latest().unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bar.open, 100.0);
        assert_eq!(bar.close, 102.5);
        assert_eq!(bar.volume, 1_000_000);
    }

    #[test]
    fn latest_wins_over_earlier_dates_in_the_payload() {
        let payload = json!({
            "Time Series (Daily)": {
                "2023-12-29": day_fields("90.0", "91.0", "500"),
                "2024-01-02": day_fields("100.0", "102.5", "1000000"),
                "2024-01-01": day_fields("95.0", "96.0", "700"),
            }
        });

        let series = parse_series_payload(&payload).unwrap();
        assert_eq!(series.len(), 3);
        let (date, _) = series.latest().unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn error_message_field_is_an_api_error() {
        let payload = json!({
            "Error Message": "Invalid API call. Please retry or visit the documentation."
        });

        let err = parse_series_payload(&payload).unwrap_err();
        assert!(matches!(err, FetchError::Api(_)));
        assert!(err.to_string().contains("Invalid API call"));
    }

    #[test]
    fn rate_limit_note_is_an_api_error() {
        let payload = json!({
            "Note": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."
        });

        let err = parse_series_payload(&payload).unwrap_err();
        assert!(matches!(err, FetchError::Api(_)));
    }

    #[test]
    fn absent_series_key_is_missing_data() {
        let payload = json!({"Meta Data": {"2. Symbol": "IBM"}});

        let err = parse_series_payload(&payload).unwrap_err();
        assert!(matches!(err, FetchError::MissingSeries));
    }

    #[test]
    fn unparsable_numeric_field_is_malformed() {
        let payload = json!({
            "Time Series (Daily)": {
                "2024-01-02": day_fields("100.0", "not-a-number", "1000000"),
            }
        });

        let err = parse_series_payload(&payload).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
        assert!(err.to_string().contains("4. close"));
    }

    #[test]
    fn unparsable_volume_is_malformed() {
        let payload = json!({
            "Time Series (Daily)": {
                "2024-01-02": day_fields("100.0", "102.5", "1.5e6"),
            }
        });

        let err = parse_series_payload(&payload).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
        assert!(err.to_string().contains("6. volume"));
    }

    #[test]
    fn invalid_date_key_is_malformed() {
        let payload = json!({
            "Time Series (Daily)": {
                "02-01-2024": day_fields("100.0", "102.5", "1000000"),
            }
        });

        let err = parse_series_payload(&payload).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn missing_day_field_is_malformed() {
        let payload = json!({
            "Time Series (Daily)": {
                "2024-01-02": {"1. open": "100.0"},
            }
        });

        let err = parse_series_payload(&payload).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }
}
