use rust_decimal::Decimal;

use crate::calendar::{self, DateError};
use crate::error::TransformError;
use crate::kpi::{round_money, safe_divide};
use crate::models::{RawDailyPerformance, StagedDailyPerformance};

pub fn transform(
    rows: &[RawDailyPerformance],
) -> Result<Vec<StagedDailyPerformance>, TransformError> {
    let mut staged = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;

    for (index, row) in rows.iter().enumerate() {
        match derive_row(index + 1, row)? {
            Some(output) => staged.push(output),
            None => {
                dropped += 1;
                tracing::debug!(
                    date = %row.date,
                    source = %row.source,
                    sessions = row.sessions,
                    "dropping row without sessions"
                );
            }
        }
    }

    tracing::info!(kept = staged.len(), dropped, "transformed daily performance rows");
    Ok(staged)
}

/// Derives a single output row, or `None` when the row has no sessions.
/// `row_number` is 1-based and only used for error reporting.
///
/// KPIs use the raw revenue and spend, not the rounded columns emitted
/// alongside them.
pub fn derive_row(
    row_number: usize,
    row: &RawDailyPerformance,
) -> Result<Option<StagedDailyPerformance>, TransformError> {
    let invalid_date = |source: DateError| TransformError::InvalidDate {
        row: row_number,
        marketing_source: row.source.clone(),
        value: row.date.clone(),
        source,
    };

    let date = calendar::parse_date(&row.date).map_err(invalid_date)?;
    let week_start_date =
        calendar::week_start(date).ok_or_else(|| invalid_date(DateError::OutOfRange))?;
    let month_start_date =
        calendar::month_start(date).ok_or_else(|| invalid_date(DateError::OutOfRange))?;

    if row.sessions <= 0 {
        return Ok(None);
    }

    let sessions = Decimal::from(row.sessions);
    let conversions = Decimal::from(row.conversions);

    Ok(Some(StagedDailyPerformance {
        date,
        week_start_date,
        month_start_date,
        marketing_source: row.source.clone(),
        sessions: row.sessions,
        conversions: row.conversions,
        revenue: round_money(row.revenue),
        spend: round_money(row.spend),
        roas: safe_divide(row.revenue, row.spend),
        cost_per_conversion: safe_divide(row.spend, conversions),
        conversion_rate: safe_divide(conversions, sessions),
        revenue_per_conversion: safe_divide(row.revenue, conversions),
        revenue_per_session: safe_divide(row.revenue, sessions),
        is_organic_channel: row.spend.is_zero(),
        is_weekend: calendar::is_weekend(date),
    }))
}
