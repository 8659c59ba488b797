//! Output formatting and persistence for computed dashboards.
//!
//! Supports JSON serialization, plain city listings, and CSV append.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::pipeline::Dashboard;

/// Writes a dashboard as pretty-printed JSON.
pub fn write_json<W: Write>(mut writer: W, dashboard: &Dashboard) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, dashboard)?;
    writeln!(writer)?;
    Ok(())
}

/// Writes one city per line.
pub fn write_cities<W: Write>(mut writer: W, cities: &[String]) -> Result<()> {
    for city in cities {
        writeln!(writer, "{city}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Logs the headline numbers of a dashboard.
pub fn log_summary(dashboard: &Dashboard) {
    let s = &dashboard.summary;
    info!(
        city = %dashboard.city,
        status = dashboard.status.as_str(),
        days = s.exposure.days,
        days_over_pm25_10 = s.days_over_pm25_10,
        days_over_pm25_20 = s.days_over_pm25_20,
        days_over_pm25_50 = s.days_over_pm25_50,
        days_over_pm10_20 = s.days_over_pm10_20,
        days_over_pm10_40 = s.days_over_pm10_40,
        days_over_pm10_50 = s.days_over_pm10_50,
        "Exposure summary"
    );
    for metric in &s.wellness {
        info!(
            name = %metric.name,
            qualifying_days = metric.qualifying_days,
            minutes = metric.minutes,
            "Wellness"
        );
    }
}

/// One flat CSV row per computed dashboard.
#[derive(Debug, Serialize)]
pub struct SummaryRow {
    pub generated_at: DateTime<Utc>,
    pub city: String,
    pub status: &'static str,
    pub window_days: u32,
    pub records: usize,
    pub has_hvac: bool,
    pub has_mitigation_product: bool,

    pub days_over_pm25_10: usize,
    pub days_over_pm25_20: usize,
    pub days_over_pm25_50: usize,
    pub days_over_pm10_20: usize,
    pub days_over_pm10_40: usize,
    pub days_over_pm10_50: usize,

    pub mean_pm25: Option<f64>,
    pub mean_pm10: Option<f64>,
    pub peak_pm25: Option<f64>,
    pub peak_pm10: Option<f64>,

    // first wellness rule only
    pub wellness_minutes: Option<f64>,
}

impl SummaryRow {
    pub fn from_dashboard(dashboard: &Dashboard, generated_at: DateTime<Utc>) -> Self {
        let s = &dashboard.summary;
        SummaryRow {
            generated_at,
            city: dashboard.city.clone(),
            status: dashboard.status.as_str(),
            window_days: dashboard.window.days,
            records: s.exposure.days,
            has_hvac: dashboard.preferences.has_hvac,
            has_mitigation_product: dashboard.preferences.has_mitigation_product,
            days_over_pm25_10: s.days_over_pm25_10,
            days_over_pm25_20: s.days_over_pm25_20,
            days_over_pm25_50: s.days_over_pm25_50,
            days_over_pm10_20: s.days_over_pm10_20,
            days_over_pm10_40: s.days_over_pm10_40,
            days_over_pm10_50: s.days_over_pm10_50,
            mean_pm25: s.exposure.mean_pm25,
            mean_pm10: s.exposure.mean_pm10,
            peak_pm25: s.exposure.peak_pm25,
            peak_pm10: s.exposure.peak_pm10,
            wellness_minutes: s.wellness.first().map(|w| w.minutes),
        }
    }
}

/// Appends a [`SummaryRow`] to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &Path, row: &SummaryRow) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(row)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::Pipeline;
    use crate::preferences::Preferences;
    use crate::records::{RawRecord, RawValue};
    use chrono::TimeZone;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn dashboard() -> Dashboard {
        let rows = vec![RawRecord {
            date: Some("2024-01-01".into()),
            city: Some("Toronto".into()),
            pm25: RawValue::Number(15.0),
            pm10: RawValue::Number(25.0),
            ..Default::default()
        }];
        let prefs = Preferences {
            city: "Toronto".into(),
            ..Default::default()
        };
        Pipeline::new(PipelineConfig::default())
            .unwrap()
            .run(&rows, &prefs, &[])
    }

    fn row() -> SummaryRow {
        SummaryRow::from_dashboard(&dashboard(), Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_log_summary_does_not_panic() {
        log_summary(&dashboard());
    }

    #[test]
    fn test_write_json() {
        let mut buf = Vec::new();
        write_json(&mut buf, &dashboard()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["status"], "ready");
        assert_eq!(value["city"], "Toronto");
        assert_eq!(value["summary"]["days_over_pm25_10"], 1);
        assert_eq!(value["series"][0]["label"], "PM 2.5");
    }

    #[test]
    fn test_write_cities_one_per_line() {
        let mut buf = Vec::new();
        write_cities(&mut buf, &["Toronto".to_string(), "New York".to_string()]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Toronto\nNew York\n");

        let mut buf = Vec::new();
        write_cities(&mut buf, &[]).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_summary_row_fields() {
        let row = row();
        assert_eq!(row.status, "ready");
        assert_eq!(row.records, 1);
        assert_eq!(row.mean_pm25, Some(15.0));
        assert_eq!(row.wellness_minutes, Some(0.0));
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("pm_insights_test_header.csv");
        let _ = fs::remove_file(&path);

        append_record(&path, &row()).unwrap();
        append_record(&path, &row()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        // Header line should appear exactly once
        let header_count = content.lines().filter(|l| l.contains("generated_at")).count();
        assert_eq!(header_count, 1);
        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }
}
