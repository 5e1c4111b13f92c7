use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod calendar;
mod db;
mod error;
mod io;
mod kpi;
mod models;
mod report;
mod transform;

use models::{ReportScope, StagedDailyPerformance};

#[derive(Parser)]
#[command(name = "marketing-daily-staging")]
#[command(about = "Builds the stg_marketing_daily staging table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the warehouse schemas
    InitDb,
    /// Transform a raw CSV export into staging rows on disk
    Transform {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = io::OutputFormat::Csv)]
        format: io::OutputFormat,
    },
    /// Rebuild analytics.stg_marketing_daily from marketing_raw.daily_performance
    Materialize {
        /// Transform and report counts without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print per-source performance
    Summary(ScopeArgs),
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct ScopeArgs {
    /// Read raw rows from this CSV instead of the staging table
    #[arg(long)]
    csv: Option<PathBuf>,
    #[arg(long)]
    since: Option<NaiveDate>,
    #[arg(long)]
    until: Option<NaiveDate>,
    #[arg(long)]
    source: Option<String>,
}

impl ScopeArgs {
    fn scope(&self) -> ReportScope {
        ReportScope {
            since: self.since,
            until: self.until,
            source: self.source.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = db::connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Transform { input, out, format } => {
            let raw = io::read_raw_csv(&input)?;
            let staged = transform::transform(&raw)
                .with_context(|| format!("failed to transform {}", input.display()))?;
            io::write_staged_file(&out, &staged, format)?;
            println!(
                "Wrote {} staged rows to {} ({} dropped).",
                staged.len(),
                out.display(),
                raw.len() - staged.len()
            );
        }
        Commands::Materialize { dry_run } => {
            let pool = db::connect().await?;
            let raw = db::fetch_raw(&pool).await?;
            let staged = transform::transform(&raw)
                .context("failed to transform marketing_raw.daily_performance")?;
            let dropped = raw.len() - staged.len();

            if dry_run {
                println!("Dry run: {} rows would be staged ({dropped} dropped).", staged.len());
                return Ok(());
            }

            let inserted = db::materialize(&pool, &staged).await?;
            tracing::info!(inserted, dropped, "materialized analytics.stg_marketing_daily");
            println!(
                "Materialized {inserted} rows into analytics.stg_marketing_daily ({dropped} dropped)."
            );
        }
        Commands::Summary(args) => {
            let scope = args.scope();
            let rows = load_staged(args.csv.as_ref(), &scope).await?;
            let summaries = report::summarize_by_source(&rows);

            if summaries.is_empty() {
                println!("No staged rows for this window.");
                return Ok(());
            }

            let stats = report::dataset_stats(&rows);
            let funnel = report::conversion_funnel(&rows);
            println!(
                "{}: {} records, {} days, {} sources",
                scope.label(),
                stats.records,
                stats.distinct_days,
                stats.sources
            );
            println!(
                "Funnel: {} sessions -> {} conversions ({} of sessions)",
                funnel.sessions,
                funnel.conversions,
                report::format_ratio(funnel.conversion_pct, "%")
            );
            println!("Source performance:");
            for summary in summaries.iter() {
                println!(
                    "- {}: {} days, {} sessions, {} conversions, revenue {:.2}, spend {:.2}, \
                     ROAS {} ({}), avg ROAS {}, avg CVR {}, {} weekend days, {} organic days",
                    summary.marketing_source,
                    summary.days,
                    summary.total_sessions,
                    summary.total_conversions,
                    summary.total_revenue,
                    summary.total_spend,
                    report::format_ratio(summary.roas, "x"),
                    report::format_tier(summary.roas_tier),
                    report::format_ratio(summary.avg_roas, "x"),
                    report::format_ratio(summary.avg_conversion_rate, ""),
                    summary.weekend_days,
                    summary.organic_days
                );
            }
        }
        Commands::Report { scope, out } => {
            let report_scope = scope.scope();
            let rows = load_staged(scope.csv.as_ref(), &report_scope).await?;
            let report = report::build_report(&report_scope, &rows);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// Staging rows either derived on the fly from a raw CSV or read back from the
/// warehouse.
async fn load_staged(
    csv: Option<&PathBuf>,
    scope: &ReportScope,
) -> anyhow::Result<Vec<StagedDailyPerformance>> {
    match csv {
        Some(path) => {
            let raw = io::read_raw_csv(path)?;
            let staged = transform::transform(&raw)
                .with_context(|| format!("failed to transform {}", path.display()))?;
            Ok(staged.into_iter().filter(|row| scope.matches(row)).collect())
        }
        None => {
            let pool = db::connect().await?;
            db::fetch_staged(&pool, scope).await
        }
    }
}
