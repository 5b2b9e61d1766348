use crate::domain::insight::{InsightReport, StoredRecommendation};
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};

pub async fn upsert_recommendation(
    pool: &sqlx::PgPool,
    analysis_date: NaiveDate,
    report: &InsightReport,
) -> anyhow::Result<()> {
    let mut tx = pool.begin().await.context("begin transaction failed")?;

    sqlx::query(
        "INSERT INTO daily_recommendations \
           (analysis_date, llm_summary, recommendation_1, recommendation_2, recommendation_3) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (analysis_date) DO UPDATE SET \
           llm_summary = EXCLUDED.llm_summary, \
           recommendation_1 = EXCLUDED.recommendation_1, \
           recommendation_2 = EXCLUDED.recommendation_2, \
           recommendation_3 = EXCLUDED.recommendation_3, \
           created_at = now()",
    )
    .bind(analysis_date)
    .bind(&report.summary)
    .bind(&report.recommendations[0])
    .bind(&report.recommendations[1])
    .bind(&report.recommendations[2])
    .execute(&mut *tx)
    .await
    .context("upsert daily_recommendations failed")?;

    tx.commit().await.context("commit transaction failed")?;
    Ok(())
}

pub async fn recommendation_for_date(
    pool: &sqlx::PgPool,
    analysis_date: NaiveDate,
) -> anyhow::Result<Option<StoredRecommendation>> {
    let row = sqlx::query_as::<_, (NaiveDate, String, String, String, String, DateTime<Utc>)>(
        "SELECT analysis_date, llm_summary, recommendation_1, recommendation_2, recommendation_3, created_at \
         FROM daily_recommendations \
         WHERE analysis_date = $1 \
         LIMIT 1",
    )
    .bind(analysis_date)
    .fetch_optional(pool)
    .await
    .context("select daily_recommendations by date failed")?;

    let Some((analysis_date, llm_summary, rec_1, rec_2, rec_3, created_at)) = row else {
        return Ok(None);
    };

    Ok(Some(StoredRecommendation {
        analysis_date,
        llm_summary,
        recommendations: [rec_1, rec_2, rec_3],
        created_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> sqlx::PgPool {
        let url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .expect("connect test database");
        crate::storage::migrate(&pool).await.expect("run migrations");
        pool
    }

    #[tokio::test]
    #[ignore] // Needs a live Postgres reachable via DATABASE_URL.
    async fn upsert_overwrites_the_row_for_a_date() {
        let pool = test_pool().await;
        let date = NaiveDate::from_ymd_opt(1988, 7, 8).unwrap();

        let first = InsightReport {
            summary: "First take".to_string(),
            recommendations: [
                "Buy".to_string(),
                "Hold".to_string(),
                "Diversify".to_string(),
            ],
        };
        upsert_recommendation(&pool, date, &first).await.unwrap();

        let second = InsightReport {
            summary: "Second take".to_string(),
            recommendations: [
                "Trim".to_string(),
                String::new(),
                "Set alerts".to_string(),
            ],
        };
        upsert_recommendation(&pool, date, &second).await.unwrap();

        let stored = recommendation_for_date(&pool, date).await.unwrap().unwrap();
        assert_eq!(stored.llm_summary, "Second take");
        assert_eq!(stored.recommendations[0], "Trim");
        assert_eq!(stored.recommendations[1], "");
        assert_eq!(stored.recommendations[2], "Set alerts");
    }
}
