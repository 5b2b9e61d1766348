use crate::config::Settings;
use crate::domain::insight::InsightReport;
use crate::domain::price::DailyPrice;
use crate::llm::error::LlmError;
use crate::llm::parse;
use crate::llm::LlmClient;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_MAX_TOKENS: u32 = 500;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("OPENAI_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    fn system_prompt() -> &'static str {
        "You are a helpful fintech analyst."
    }

    fn user_prompt(price: &DailyPrice) -> String {
        format!(
            "You are a fintech analyst. Based on the following performance data for {date} for a \
             single stock, provide a short summary and 3 actionable recommendations to improve \
             performance for this stock's investors.\n\n\
             The data represents the daily performance of a stock:\n\
             - Open Price: ${open:.2}\n\
             - High Price: ${high:.2}\n\
             - Low Price: ${low:.2}\n\
             - Close Price: ${close:.2}\n\
             - Adjusted Close Price: ${adjusted_close:.2}\n\
             - Volume: {volume}\n\n\
             Please provide your response in the following format:\n\
             {summary_label} [Your short summary here]\n\
             {rec_1} [First actionable recommendation]\n\
             {rec_2} [Second actionable recommendation]\n\
             {rec_3} [Third actionable recommendation]",
            date = price.date,
            open = price.open,
            high = price.high,
            low = price.low,
            close = price.close,
            adjusted_close = price.adjusted_close,
            volume = format_thousands(price.volume),
            summary_label = parse::SUMMARY_LABEL,
            rec_1 = parse::RECOMMENDATION_LABELS[0],
            rec_2 = parse::RECOMMENDATION_LABELS[1],
            rec_3 = parse::RECOMMENDATION_LABELS[2],
        )
    }

    async fn create_chat_completion(
        &self,
        req: &ChatCompletionRequest,
    ) -> anyhow::Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(req)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read OpenAI response body")?;
        if !status.is_success() {
            return Err(LlmError {
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
            }
            .into());
        }

        serde_json::from_str::<ChatCompletionResponse>(&text)
            .with_context(|| format!("failed to decode OpenAI chat completion: {text}"))
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    async fn generate_insights(&self, price: &DailyPrice) -> anyhow::Result<InsightReport> {
        let req = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Self::system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::user_prompt(price),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let res = self.create_chat_completion(&req).await?;

        if let Some(usage) = &res.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion usage"
            );
        }

        let choice = res.choices.into_iter().next().ok_or_else(|| LlmError {
            stage: "response",
            detail: "completion has no choices".to_string(),
            raw_output: None,
        })?;

        if matches!(choice.finish_reason.as_deref(), Some("length")) {
            tracing::warn!(
                %price.date,
                max_tokens = self.max_tokens,
                "completion truncated at max_tokens; labels may be missing"
            );
        }

        let content = choice.message.content.ok_or_else(|| LlmError {
            stage: "response",
            detail: "completion message has no text content".to_string(),
            raw_output: None,
        })?;

        Ok(parse::parse_insights(&content))
    }
}

fn format_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        format!("-{out}")
    } else {
        out
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,

    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,

    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;

    fn sample_price() -> DailyPrice {
        DailyPrice {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            symbol: "IBM".to_string(),
            open: 100.0,
            high: 105.5,
            low: 99.25,
            close: 102.5,
            adjusted_close: 102.5,
            volume: 1_000_000,
            dividend_amount: 0.0,
            split_coefficient: 1.0,
            last_updated: Utc.with_ymd_and_hms(2024, 1, 2, 22, 0, 0).unwrap(),
        }
    }

    #[test]
    fn user_prompt_embeds_formatted_fields() {
        let prompt = OpenAiClient::user_prompt(&sample_price());

        assert!(prompt.contains("2024-01-02"));
        assert!(prompt.contains("- Open Price: $100.00"));
        assert!(prompt.contains("- High Price: $105.50"));
        assert!(prompt.contains("- Low Price: $99.25"));
        assert!(prompt.contains("- Adjusted Close Price: $102.50"));
        assert!(prompt.contains("- Volume: 1,000,000"));
        assert!(prompt.contains("Summary: [Your short summary here]"));
        assert!(prompt.contains("Recommendation 3: [Third actionable recommendation]"));
    }

    #[test]
    fn format_thousands_groups_digits() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(1_000_000), "1,000,000");
        assert_eq!(format_thousands(123_456_789), "123,456,789");
        assert_eq!(format_thousands(-54_321), "-54,321");
    }

    #[test]
    fn decodes_chat_completion_response() {
        let v = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": {"role": "assistant", "content": "Summary: Strong day"},
                    "finish_reason": "stop"
                }
            ],
            "usage": {"prompt_tokens": 200, "completion_tokens": 40, "total_tokens": 240}
        });

        let res: ChatCompletionResponse = serde_json::from_value(v).unwrap();
        assert_eq!(res.choices.len(), 1);
        assert_eq!(
            res.choices[0].message.content.as_deref(),
            Some("Summary: Strong day")
        );
        assert_eq!(res.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(res.usage.as_ref().unwrap().completion_tokens, 40);
    }

    #[test]
    fn decodes_response_without_usage_or_finish_reason() {
        let v = json!({
            "choices": [
                {"message": {"content": "Summary: ok"}}
            ]
        });

        let res: ChatCompletionResponse = serde_json::from_value(v).unwrap();
        assert!(res.usage.is_none());
        assert!(res.choices[0].finish_reason.is_none());
    }

    #[test]
    fn request_serializes_sampling_parameters() {
        let req = ChatCompletionRequest {
            model: "gpt-4".to_string(),
            messages: vec![ChatMessage {
                role: "system",
                content: "You are a helpful fintech analyst.".to_string(),
            }],
            temperature: 0.7,
            max_tokens: 500,
        };

        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["model"], "gpt-4");
        assert_eq!(v["max_tokens"], 500);
        assert_eq!(v["messages"][0]["role"], "system");
        assert!((v["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }
}
