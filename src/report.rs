use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::kpi::safe_divide;
use crate::models::{
    ConversionFunnel, DailyTrend, DatasetStats, OverallKpis, ReportScope, RoasTier, SourceSummary,
    StagedDailyPerformance, WeeklyTrend,
};

pub const ROAS_BREAK_EVEN: Decimal = Decimal::ONE;
pub const ROAS_TARGET: Decimal = Decimal::TWO;

#[derive(Default)]
struct SourceTotals {
    days: HashSet<NaiveDate>,
    sessions: i64,
    conversions: i64,
    revenue: Decimal,
    spend: Decimal,
    roas_sum: Decimal,
    roas_count: i64,
    conversion_rate_sum: Decimal,
    conversion_rate_count: i64,
    weekend_days: usize,
    organic_days: usize,
}

pub fn roas_tier(roas: Decimal) -> RoasTier {
    if roas < ROAS_BREAK_EVEN {
        RoasTier::BelowBreakEven
    } else if roas < ROAS_TARGET {
        RoasTier::BelowTarget
    } else {
        RoasTier::OnTarget
    }
}

/// Per-source rollup of the staging rows, highest revenue first. Averages skip
/// missing KPIs the way SQL `AVG` does.
pub fn summarize_by_source(rows: &[StagedDailyPerformance]) -> Vec<SourceSummary> {
    let mut map: HashMap<&str, SourceTotals> = HashMap::new();

    for row in rows {
        let entry = map.entry(row.marketing_source.as_str()).or_default();
        entry.days.insert(row.date);
        entry.sessions += row.sessions;
        entry.conversions += row.conversions;
        entry.revenue += row.revenue;
        entry.spend += row.spend;
        if let Some(roas) = row.roas {
            entry.roas_sum += roas;
            entry.roas_count += 1;
        }
        if let Some(rate) = row.conversion_rate {
            entry.conversion_rate_sum += rate;
            entry.conversion_rate_count += 1;
        }
        if row.is_weekend {
            entry.weekend_days += 1;
        }
        if row.is_organic_channel {
            entry.organic_days += 1;
        }
    }

    let mut summaries: Vec<SourceSummary> = map
        .into_iter()
        .map(|(source, totals)| {
            let roas = safe_divide(totals.revenue, totals.spend);
            SourceSummary {
                marketing_source: source.to_string(),
                days: totals.days.len(),
                total_sessions: totals.sessions,
                total_conversions: totals.conversions,
                total_revenue: totals.revenue,
                total_spend: totals.spend,
                roas,
                roas_tier: roas.map(roas_tier),
                avg_roas: safe_divide(totals.roas_sum, Decimal::from(totals.roas_count)),
                avg_conversion_rate: safe_divide(
                    totals.conversion_rate_sum,
                    Decimal::from(totals.conversion_rate_count),
                ),
                weekend_days: totals.weekend_days,
                organic_days: totals.organic_days,
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_revenue
            .cmp(&a.total_revenue)
            .then_with(|| a.marketing_source.cmp(&b.marketing_source))
    });
    summaries
}

pub fn overall_kpis(rows: &[StagedDailyPerformance]) -> OverallKpis {
    let total_spend: Decimal = rows.iter().map(|row| row.spend).sum();
    let total_revenue: Decimal = rows.iter().map(|row| row.revenue).sum();
    let total_conversions: i64 = rows.iter().map(|row| row.conversions).sum();
    let total_sessions: i64 = rows.iter().map(|row| row.sessions).sum();

    OverallKpis {
        total_spend,
        total_revenue,
        total_conversions,
        total_sessions,
        roas: safe_divide(total_revenue, total_spend),
        roi_pct: percent(safe_divide(total_revenue - total_spend, total_spend)),
        conversion_rate_pct: percent(safe_divide(
            Decimal::from(total_conversions),
            Decimal::from(total_sessions),
        )),
    }
}

pub fn conversion_funnel(rows: &[StagedDailyPerformance]) -> ConversionFunnel {
    let sessions: i64 = rows.iter().map(|row| row.sessions).sum();
    let conversions: i64 = rows.iter().map(|row| row.conversions).sum();

    ConversionFunnel {
        sessions,
        conversions,
        conversion_pct: percent(safe_divide(Decimal::from(conversions), Decimal::from(sessions))),
    }
}

pub fn dataset_stats(rows: &[StagedDailyPerformance]) -> DatasetStats {
    let days: HashSet<NaiveDate> = rows.iter().map(|row| row.date).collect();
    let sources: HashSet<&str> = rows.iter().map(|row| row.marketing_source.as_str()).collect();

    DatasetStats {
        records: rows.len(),
        distinct_days: days.len(),
        sources: sources.len(),
    }
}

fn percent(ratio: Option<Decimal>) -> Option<Decimal> {
    ratio.map(|ratio| (ratio * Decimal::ONE_HUNDRED).normalize())
}

pub fn daily_trend(rows: &[StagedDailyPerformance]) -> Vec<DailyTrend> {
    let mut days: BTreeMap<NaiveDate, DailyTrend> = BTreeMap::new();

    for row in rows {
        let entry = days.entry(row.date).or_insert_with(|| DailyTrend {
            date: row.date,
            spend: Decimal::ZERO,
            revenue: Decimal::ZERO,
            conversions: 0,
        });
        entry.spend += row.spend;
        entry.revenue += row.revenue;
        entry.conversions += row.conversions;
    }

    days.into_values().collect()
}

pub fn weekly_trend(rows: &[StagedDailyPerformance]) -> Vec<WeeklyTrend> {
    let mut weeks: BTreeMap<NaiveDate, WeeklyTrend> = BTreeMap::new();

    for row in rows {
        let entry = weeks.entry(row.week_start_date).or_insert_with(|| WeeklyTrend {
            week_start: row.week_start_date,
            sessions: 0,
            conversions: 0,
            revenue: Decimal::ZERO,
            spend: Decimal::ZERO,
            roas: None,
        });
        entry.sessions += row.sessions;
        entry.conversions += row.conversions;
        entry.revenue += row.revenue;
        entry.spend += row.spend;
    }

    weeks
        .into_values()
        .map(|mut week| {
            week.roas = safe_divide(week.revenue, week.spend);
            week
        })
        .collect()
}

pub fn format_ratio(value: Option<Decimal>, suffix: &str) -> String {
    match value {
        Some(value) => format!("{value:.2}{suffix}"),
        None => "n/a".to_string(),
    }
}

pub fn format_tier(tier: Option<RoasTier>) -> &'static str {
    tier.map_or("n/a", RoasTier::label)
}

pub fn build_report(scope: &ReportScope, rows: &[StagedDailyPerformance]) -> String {
    let stats = dataset_stats(rows);
    let kpis = overall_kpis(rows);
    let funnel = conversion_funnel(rows);
    let summaries = summarize_by_source(rows);
    let weeks = weekly_trend(rows);
    let days = daily_trend(rows);

    let mut output = String::new();

    let _ = writeln!(output, "# Marketing Performance Report");
    let _ = writeln!(
        output,
        "Generated for {}: {} records across {} days and {} sources",
        scope.label(),
        stats.records,
        stats.distinct_days,
        stats.sources
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Performance Indicators");

    if rows.is_empty() {
        let _ = writeln!(output, "No staged rows for this window.");
        return output;
    }

    let _ = writeln!(output, "- Total spend: ${:.2}", kpis.total_spend);
    let _ = writeln!(
        output,
        "- Total revenue: ${:.2} ({} ROI)",
        kpis.total_revenue,
        format_ratio(kpis.roi_pct, "%")
    );
    let _ = writeln!(
        output,
        "- Conversions: {} from {} sessions ({} CVR)",
        kpis.total_conversions,
        kpis.total_sessions,
        format_ratio(kpis.conversion_rate_pct, "%")
    );
    let _ = writeln!(output, "- ROAS: {}", format_ratio(kpis.roas, "x"));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Conversion Funnel");
    let _ = writeln!(output, "- Sessions: {} (100%)", funnel.sessions);
    let _ = writeln!(
        output,
        "- Conversions: {} ({} of sessions)",
        funnel.conversions,
        format_ratio(funnel.conversion_pct, "%")
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Source Performance (ROAS target {ROAS_TARGET:.1}x)");
    let _ = writeln!(
        output,
        "| source | days | sessions | conversions | revenue | spend | roas | tier \
         | avg roas | avg cvr | weekend days | organic days |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|---|---|---|");
    for summary in summaries.iter() {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {:.2} | {:.2} | {} | {} | {} | {} | {} | {} |",
            summary.marketing_source,
            summary.days,
            summary.total_sessions,
            summary.total_conversions,
            summary.total_revenue,
            summary.total_spend,
            format_ratio(summary.roas, "x"),
            format_tier(summary.roas_tier),
            format_ratio(summary.avg_roas, "x"),
            format_ratio(percent(summary.avg_conversion_rate), "%"),
            summary.weekend_days,
            summary.organic_days
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Trend");
    for week in weeks.iter() {
        let _ = writeln!(
            output,
            "- Week of {}: {} sessions, {} conversions, revenue ${:.2}, spend ${:.2}, ROAS {}",
            week.week_start,
            week.sessions,
            week.conversions,
            week.revenue,
            week.spend,
            format_ratio(week.roas, "x")
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Spend vs Revenue");
    for day in days.iter() {
        let _ = writeln!(
            output,
            "- {}: spend ${:.2}, revenue ${:.2}, {} conversions",
            day.date, day.spend, day.revenue, day.conversions
        );
    }

    output
}
