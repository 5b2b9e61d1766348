pub mod error;
pub mod openai;
pub mod parse;

use crate::domain::insight::InsightReport;
use crate::domain::price::DailyPrice;

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// One completion for one stored trading day. No retries; any transport,
    /// API, or response-shape problem is an error.
    async fn generate_insights(&self, price: &DailyPrice) -> anyhow::Result<InsightReport>;
}
