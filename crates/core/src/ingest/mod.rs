pub mod alpha_vantage;
pub mod error;
pub mod types;

use crate::ingest::error::FetchError;
use crate::ingest::types::DailySeries;

#[async_trait::async_trait]
pub trait MarketDataClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Full daily history for one symbol, parsed into typed bars.
    async fn fetch_daily(&self, symbol: &str) -> Result<DailySeries, FetchError>;
}
