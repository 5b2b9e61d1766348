use anyhow::Context;
use clap::Parser;
use daybrief_core::ingest::MarketDataClient;
use daybrief_core::llm::LlmClient;
use daybrief_core::pipeline::{RunSummary, WritePolicy};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Symbol processed when --symbol is not given.
const DEFAULT_SYMBOL: &str = "IBM";

#[derive(Debug, Parser)]
#[command(name = "daybrief_worker")]
struct Args {
    /// Stock symbol to process (one symbol per run).
    #[arg(long, default_value = DEFAULT_SYMBOL)]
    symbol: String,

    /// Fetch and parse the daily series, then exit without touching the
    /// database or the LLM.
    #[arg(long)]
    dry_run: bool,

    /// Abort the run when a database write fails instead of logging and
    /// continuing.
    #[arg(long)]
    strict_writes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = daybrief_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let symbol = args.symbol.trim().to_string();
    anyhow::ensure!(!symbol.is_empty(), "--symbol must be non-empty");

    let market = daybrief_core::ingest::alpha_vantage::AlphaVantageClient::from_settings(&settings)?;

    if args.dry_run {
        let series = market
            .fetch_daily(&symbol)
            .await
            .context("market data fetch failed")?;
        match series.latest() {
            Some((date, bar)) => tracing::info!(
                %symbol,
                %date,
                bars = series.len(),
                close = bar.close,
                volume = bar.volume,
                dry_run = true,
                "fetched daily series; skipping storage and insight stages"
            ),
            None => tracing::warn!(%symbol, dry_run = true, "fetched daily series is empty"),
        }
        return Ok(());
    }

    let llm = daybrief_core::llm::openai::OpenAiClient::from_settings(&settings)?;

    let write_policy = if args.strict_writes {
        WritePolicy::Strict
    } else {
        WritePolicy::BestEffort
    };

    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    let outcome = run_locked(&pool, &market, &llm, &symbol, write_policy).await;
    pool.close().await;

    match outcome {
        Ok(Some(summary)) => {
            tracing::info!(
                %symbol,
                analysis_date = %summary.analysis_date,
                price_stored = summary.price_stored,
                insights_stored = summary.insights_stored,
                "daily pipeline completed"
            );
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(%symbol, error = %err, "daily pipeline aborted");
            Err(err)
        }
    }
}

/// Everything that touches the pool. Returns `None` when another run holds
/// the symbol lock; the caller closes the pool either way.
async fn run_locked(
    pool: &sqlx::PgPool,
    market: &dyn MarketDataClient,
    llm: &dyn LlmClient,
    symbol: &str,
    write_policy: WritePolicy,
) -> anyhow::Result<Option<RunSummary>> {
    daybrief_core::storage::migrate(pool).await?;

    let acquired = daybrief_core::storage::lock::try_acquire_symbol_lock(pool, symbol).await?;
    if !acquired {
        tracing::warn!(%symbol, "symbol lock not acquired; another run in progress");
        return Ok(None);
    }

    let result = daybrief_core::pipeline::run_daily(pool, market, llm, symbol, write_policy).await;
    let _ = daybrief_core::storage::lock::release_symbol_lock(pool, symbol).await;
    result.map(Some)
}

fn init_sentry(settings: &daybrief_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
