use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;

use crate::models::{RawDailyPerformance, StagedDailyPerformance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

pub fn read_raw<R: Read>(reader: R) -> anyhow::Result<Vec<RawDailyPerformance>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<RawDailyPerformance>().enumerate() {
        let row = result.with_context(|| format!("failed to read raw row {}", index + 1))?;
        rows.push(row);
    }

    Ok(rows)
}

pub fn read_raw_csv(path: &Path) -> anyhow::Result<Vec<RawDailyPerformance>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_raw(file)
}

pub fn write_staged<W: Write>(
    writer: W,
    rows: &[StagedDailyPerformance],
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(writer);
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(writer, rows)?;
        }
    }
    Ok(())
}

pub fn write_staged_file(
    path: &Path,
    rows: &[StagedDailyPerformance],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_staged(std::io::BufWriter::new(file), rows, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::transform;
    use rust_decimal_macros::dec;

    const RAW: &str = "\
date,source,sessions,conversions,revenue,spend
2024-11-23,Google Ads,100,5,500.005,100.00
2024-11-23,Direct,0,0,0,0
2024-11-22, Direct ,2000,60,4800,0
";

    #[test]
    fn reads_raw_rows_from_csv() {
        let rows = read_raw(RAW.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, "2024-11-23");
        assert_eq!(rows[0].source, "Google Ads");
        assert_eq!(rows[0].revenue, dec!(500.005));
        assert_eq!(rows[0].spend, dec!(100));
        assert_eq!(rows[2].source, "Direct");
    }

    #[test]
    fn rejects_non_numeric_metrics() {
        let input = "date,source,sessions,conversions,revenue,spend\n2024-11-23,Email,many,1,1,1\n";
        let err = read_raw(input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn writes_csv_with_empty_missing_kpis() {
        let staged = transform(&read_raw(RAW.as_bytes()).unwrap()).unwrap();
        let mut buffer = Vec::new();
        write_staged(&mut buffer, &staged, OutputFormat::Csv).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "date,week_start_date,month_start_date,marketing_source,sessions,conversions,revenue,spend,\
roas,cost_per_conversion,conversion_rate,revenue_per_conversion,revenue_per_session,\
is_organic_channel,is_weekend"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-11-23,2024-11-17,2024-11-01,Google Ads,100,5,500.01,100.00,5.00005,20,0.05,100.001,5.00005,false,true"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-11-22,2024-11-17,2024-11-01,Direct,2000,60,4800.00,0.00,,0,0.03,80,2.4,true,false"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn writes_json_with_null_kpis() {
        let staged = transform(&read_raw(RAW.as_bytes()).unwrap()).unwrap();
        let mut buffer = Vec::new();
        write_staged(&mut buffer, &staged, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["marketing_source"], "Direct");
        assert!(rows[1]["roas"].is_null());
        assert_eq!(rows[1]["is_organic_channel"], true);
        assert_eq!(rows[0]["date"], "2024-11-23");
    }
}
