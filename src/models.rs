use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One raw row of `marketing_raw.daily_performance`. The date stays as text
/// until the transformer parses it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawDailyPerformance {
    pub date: String,
    pub source: String,
    pub sessions: i64,
    pub conversions: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub revenue: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub spend: Decimal,
}

/// One row of `analytics.stg_marketing_daily`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedDailyPerformance {
    pub date: NaiveDate,
    pub week_start_date: NaiveDate,
    pub month_start_date: NaiveDate,
    pub marketing_source: String,
    pub sessions: i64,
    pub conversions: i64,
    pub revenue: Decimal,
    pub spend: Decimal,
    pub roas: Option<Decimal>,
    pub cost_per_conversion: Option<Decimal>,
    pub conversion_rate: Option<Decimal>,
    pub revenue_per_conversion: Option<Decimal>,
    pub revenue_per_session: Option<Decimal>,
    pub is_organic_channel: bool,
    pub is_weekend: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSummary {
    pub marketing_source: String,
    pub days: usize,
    pub total_sessions: i64,
    pub total_conversions: i64,
    pub total_revenue: Decimal,
    pub total_spend: Decimal,
    /// Blended: total revenue over total spend.
    pub roas: Option<Decimal>,
    pub roas_tier: Option<RoasTier>,
    /// Mean of the per-day ROAS values that exist.
    pub avg_roas: Option<Decimal>,
    pub avg_conversion_rate: Option<Decimal>,
    pub weekend_days: usize,
    pub organic_days: usize,
}

/// Where a ROAS sits against break-even (1.0x) and the 2.0x target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoasTier {
    BelowBreakEven,
    BelowTarget,
    OnTarget,
}

impl RoasTier {
    pub fn label(self) -> &'static str {
        match self {
            RoasTier::BelowBreakEven => "below break-even",
            RoasTier::BelowTarget => "below target",
            RoasTier::OnTarget => "on target",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionFunnel {
    pub sessions: i64,
    pub conversions: i64,
    /// Conversions as a percentage of sessions, the top of the funnel.
    pub conversion_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub records: usize,
    pub distinct_days: usize,
    pub sources: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverallKpis {
    pub total_spend: Decimal,
    pub total_revenue: Decimal,
    pub total_conversions: i64,
    pub total_sessions: i64,
    pub roas: Option<Decimal>,
    pub roi_pct: Option<Decimal>,
    pub conversion_rate_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub spend: Decimal,
    pub revenue: Decimal,
    pub conversions: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyTrend {
    pub week_start: NaiveDate,
    pub sessions: i64,
    pub conversions: i64,
    pub revenue: Decimal,
    pub spend: Decimal,
    pub roas: Option<Decimal>,
}

/// Date range (inclusive) and optional source used by the reporting commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportScope {
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub source: Option<String>,
}

impl ReportScope {
    pub fn matches(&self, row: &StagedDailyPerformance) -> bool {
        self.since.map_or(true, |since| row.date >= since)
            && self.until.map_or(true, |until| row.date <= until)
            && self
                .source
                .as_deref()
                .map_or(true, |source| row.marketing_source == source)
    }

    pub fn label(&self) -> String {
        let source = self.source.as_deref().unwrap_or("all sources");
        match (self.since, self.until) {
            (Some(since), Some(until)) => format!("{source}, {since} to {until}"),
            (Some(since), None) => format!("{source}, since {since}"),
            (None, Some(until)) => format!("{source}, through {until}"),
            (None, None) => format!("{source}, all dates"),
        }
    }
}
