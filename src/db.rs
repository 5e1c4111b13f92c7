use anyhow::Context;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use crate::models::{RawDailyPerformance, ReportScope, StagedDailyPerformance};

pub async fn connect() -> anyhow::Result<PgPool> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the warehouse Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn fetch_raw(pool: &PgPool) -> anyhow::Result<Vec<RawDailyPerformance>> {
    let records = sqlx::query(
        "SELECT date, source, sessions, conversions, revenue, spend \
         FROM marketing_raw.daily_performance",
    )
    .fetch_all(pool)
    .await
    .context("failed to read marketing_raw.daily_performance")?;

    records
        .iter()
        .enumerate()
        .map(|(index, row)| {
            raw_from_row(row)
                .with_context(|| format!("marketing_raw.daily_performance row {}", index + 1))
        })
        .collect()
}

fn raw_from_row(row: &PgRow) -> anyhow::Result<RawDailyPerformance> {
    Ok(RawDailyPerformance {
        date: column(row, "date")?,
        source: column(row, "source")?,
        sessions: column(row, "sessions")?,
        conversions: column(row, "conversions")?,
        revenue: column(row, "revenue")?,
        spend: column(row, "spend")?,
    })
}

/// Decodes one column, naming it in the error when the value is NULL or of
/// an unexpected type.
fn column<'r, T>(row: &'r PgRow, name: &str) -> anyhow::Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name).with_context(|| format!("column {name}"))
}

/// Replaces the contents of the staging table in a single transaction.
pub async fn materialize(pool: &PgPool, rows: &[StagedDailyPerformance]) -> anyhow::Result<u64> {
    let mut tx = pool.begin().await?;

    let cleared = sqlx::query("DELETE FROM analytics.stg_marketing_daily")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tracing::debug!(cleared, "cleared previous staging rows");

    let mut inserted = 0u64;
    for row in rows {
        let result = sqlx::query(
            r#"
            INSERT INTO analytics.stg_marketing_daily
            (date, week_start_date, month_start_date, marketing_source, sessions, conversions,
             revenue, spend, roas, cost_per_conversion, conversion_rate, revenue_per_conversion,
             revenue_per_session, is_organic_channel, is_weekend)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(row.date)
        .bind(row.week_start_date)
        .bind(row.month_start_date)
        .bind(&row.marketing_source)
        .bind(row.sessions)
        .bind(row.conversions)
        .bind(row.revenue)
        .bind(row.spend)
        .bind(row.roas)
        .bind(row.cost_per_conversion)
        .bind(row.conversion_rate)
        .bind(row.revenue_per_conversion)
        .bind(row.revenue_per_session)
        .bind(row.is_organic_channel)
        .bind(row.is_weekend)
        .execute(&mut *tx)
        .await?;

        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

pub async fn fetch_staged(
    pool: &PgPool,
    scope: &ReportScope,
) -> anyhow::Result<Vec<StagedDailyPerformance>> {
    let mut query = String::from(
        "SELECT date, week_start_date, month_start_date, marketing_source, sessions, conversions, \
         revenue, spend, roas, cost_per_conversion, conversion_rate, revenue_per_conversion, \
         revenue_per_session, is_organic_channel, is_weekend \
         FROM analytics.stg_marketing_daily WHERE TRUE",
    );

    let mut placeholder = 0;
    if scope.since.is_some() {
        placeholder += 1;
        query.push_str(&format!(" AND date >= ${placeholder}"));
    }
    if scope.until.is_some() {
        placeholder += 1;
        query.push_str(&format!(" AND date <= ${placeholder}"));
    }
    if scope.source.is_some() {
        placeholder += 1;
        query.push_str(&format!(" AND marketing_source = ${placeholder}"));
    }
    query.push_str(" ORDER BY date DESC, marketing_source");

    let mut rows = sqlx::query(&query);
    if let Some(since) = scope.since {
        rows = rows.bind(since);
    }
    if let Some(until) = scope.until {
        rows = rows.bind(until);
    }
    if let Some(source) = scope.source.as_deref() {
        rows = rows.bind(source);
    }

    let records = rows.fetch_all(pool).await?;
    records
        .iter()
        .enumerate()
        .map(|(index, row)| {
            staged_from_row(row)
                .with_context(|| format!("analytics.stg_marketing_daily row {}", index + 1))
        })
        .collect()
}

fn staged_from_row(row: &PgRow) -> anyhow::Result<StagedDailyPerformance> {
    Ok(StagedDailyPerformance {
        date: column(row, "date")?,
        week_start_date: column(row, "week_start_date")?,
        month_start_date: column(row, "month_start_date")?,
        marketing_source: column(row, "marketing_source")?,
        sessions: column(row, "sessions")?,
        conversions: column(row, "conversions")?,
        revenue: column(row, "revenue")?,
        spend: column(row, "spend")?,
        roas: column(row, "roas")?,
        cost_per_conversion: column(row, "cost_per_conversion")?,
        conversion_rate: column(row, "conversion_rate")?,
        revenue_per_conversion: column(row, "revenue_per_conversion")?,
        revenue_per_session: column(row, "revenue_per_session")?,
        is_organic_channel: column(row, "is_organic_channel")?,
        is_weekend: column(row, "is_weekend")?,
    })
}
