use crate::ingest::MarketDataClient;
use crate::llm::{parse, LlmClient};
use crate::storage;
use anyhow::Context;
use chrono::NaiveDate;

/// What to do when a database write fails mid-run. The historical behavior
/// is best-effort: log the failure and keep going, since a fetched bar can
/// still be analyzed against whatever the table already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    BestEffort,
    Strict,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub analysis_date: NaiveDate,
    pub price_stored: bool,
    pub insights_stored: bool,
}

/// One full run for one symbol: fetch the daily series, store the latest
/// bar, read the latest stored row back, generate insights for it, store
/// them. Stages run strictly in order; the first failure aborts the run,
/// except database writes under [`WritePolicy::BestEffort`].
pub async fn run_daily(
    pool: &sqlx::PgPool,
    market: &dyn MarketDataClient,
    llm: &dyn LlmClient,
    symbol: &str,
    write_policy: WritePolicy,
) -> anyhow::Result<RunSummary> {
    tracing::info!(
        symbol,
        provider = market.provider_name(),
        "fetching daily time series"
    );
    let series = market
        .fetch_daily(symbol)
        .await
        .context("market data fetch failed")?;
    let (fetched_date, bar) = series
        .latest()
        .context("daily time series has no entries")?;
    tracing::info!(%fetched_date, bars = series.len(), "fetched daily time series");

    let price_stored = match storage::prices::upsert_daily_price(pool, symbol, fetched_date, bar)
        .await
    {
        Ok(()) => {
            tracing::info!(%fetched_date, "stored daily price row");
            true
        }
        Err(err) if write_policy == WritePolicy::BestEffort => {
            tracing::warn!(%fetched_date, error = %err, "daily price upsert failed; continuing");
            false
        }
        Err(err) => return Err(err.context("daily price upsert failed")),
    };

    let record = storage::prices::latest_price(pool)
        .await
        .context("latest price read failed")?
        .context("no daily price rows available for analysis")?;
    if record.date != fetched_date {
        tracing::warn!(
            read = %record.date,
            fetched = %fetched_date,
            "latest stored row does not match the fetched bar"
        );
    }

    tracing::info!(
        analysis_date = %record.date,
        provider = llm.provider_name(),
        "generating insights"
    );
    let report = llm
        .generate_insights(&record)
        .await
        .context("insight generation failed")?;

    let unfilled = parse::unfilled_labels(&report);
    if !unfilled.is_empty() {
        tracing::warn!(
            analysis_date = %record.date,
            ?unfilled,
            "model response left labeled fields empty; storing them as-is"
        );
    }

    let insights_stored =
        match storage::recommendations::upsert_recommendation(pool, record.date, &report).await {
            Ok(()) => {
                tracing::info!(analysis_date = %record.date, "stored daily recommendation row");
                true
            }
            Err(err) if write_policy == WritePolicy::BestEffort => {
                tracing::warn!(
                    analysis_date = %record.date,
                    error = %err,
                    "recommendation upsert failed; run ends without stored insights"
                );
                false
            }
            Err(err) => return Err(err.context("recommendation upsert failed")),
        };

    Ok(RunSummary {
        analysis_date: record.date,
        price_stored,
        insights_stored,
    })
}
