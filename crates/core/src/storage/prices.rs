use crate::domain::price::DailyPrice;
use crate::ingest::types::DailyBar;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};

type PriceRow = (
    NaiveDate,
    String,
    f64,
    f64,
    f64,
    f64,
    f64,
    i64,
    f64,
    f64,
    DateTime<Utc>,
);

const PRICE_COLUMNS: &str = "date, symbol, open, high, low, close, adjusted_close, \
     volume, dividend_amount, split_coefficient, last_updated";

pub async fn upsert_daily_price(
    pool: &sqlx::PgPool,
    symbol: &str,
    date: NaiveDate,
    bar: &DailyBar,
) -> anyhow::Result<()> {
    let mut tx = pool.begin().await.context("begin transaction failed")?;

    sqlx::query(
        "INSERT INTO daily_stock_data \
           (date, symbol, open, high, low, close, adjusted_close, volume, dividend_amount, split_coefficient) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (date) DO UPDATE SET \
           open = EXCLUDED.open, \
           high = EXCLUDED.high, \
           low = EXCLUDED.low, \
           close = EXCLUDED.close, \
           adjusted_close = EXCLUDED.adjusted_close, \
           volume = EXCLUDED.volume, \
           dividend_amount = EXCLUDED.dividend_amount, \
           split_coefficient = EXCLUDED.split_coefficient, \
           last_updated = now()",
    )
    .bind(date)
    .bind(symbol)
    .bind(bar.open)
    .bind(bar.high)
    .bind(bar.low)
    .bind(bar.close)
    .bind(bar.adjusted_close)
    .bind(bar.volume)
    .bind(bar.dividend_amount)
    .bind(bar.split_coefficient)
    .execute(&mut *tx)
    .await
    .context("upsert daily_stock_data failed")?;

    tx.commit().await.context("commit transaction failed")?;
    Ok(())
}

pub async fn latest_price(pool: &sqlx::PgPool) -> anyhow::Result<Option<DailyPrice>> {
    let row = sqlx::query_as::<_, PriceRow>(&format!(
        "SELECT {PRICE_COLUMNS} \
         FROM daily_stock_data \
         ORDER BY date DESC \
         LIMIT 1"
    ))
    .fetch_optional(pool)
    .await
    .context("select latest daily_stock_data failed")?;

    Ok(row.map(into_daily_price))
}

pub async fn price_for_date(
    pool: &sqlx::PgPool,
    date: NaiveDate,
) -> anyhow::Result<Option<DailyPrice>> {
    let row = sqlx::query_as::<_, PriceRow>(&format!(
        "SELECT {PRICE_COLUMNS} \
         FROM daily_stock_data \
         WHERE date = $1 \
         LIMIT 1"
    ))
    .bind(date)
    .fetch_optional(pool)
    .await
    .context("select daily_stock_data by date failed")?;

    Ok(row.map(into_daily_price))
}

fn into_daily_price(row: PriceRow) -> DailyPrice {
    let (
        date,
        symbol,
        open,
        high,
        low,
        close,
        adjusted_close,
        volume,
        dividend_amount,
        split_coefficient,
        last_updated,
    ) = row;
    DailyPrice {
        date,
        symbol,
        open,
        high,
        low,
        close,
        adjusted_close,
        volume,
        dividend_amount,
        split_coefficient,
        last_updated,
    }
}
