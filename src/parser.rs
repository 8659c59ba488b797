//! Decoding of raw feed payloads into [`RawRecord`]s.
//!
//! The same rows arrive in two shapes: a CSV export with the headers
//! `Date, City, PM 2.5, PM 10, Temp, Air Quality` (note the spaces), or a JSON
//! array of objects from an HTTP endpoint, which may use lowercase keys.
//! Either may be gzip-compressed.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord, Trim};
use flate2::read::GzDecoder;
use serde_json::{Map, Value};
use tracing::debug;

use crate::records::{RawRecord, RawValue};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const DATE_KEYS: &[&str] = &["Date", "date"];
const CITY_KEYS: &[&str] = &["City", "city"];
const PM25_KEYS: &[&str] = &["PM 2.5", "PM2.5", "pm25"];
const PM10_KEYS: &[&str] = &["PM 10", "PM10", "pm10"];
const TEMP_KEYS: &[&str] = &["Temp", "temp"];
const AIR_QUALITY_KEYS: &[&str] = &["Air Quality", "airQuality"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Csv,
    Json,
}

impl FeedFormat {
    /// A payload whose first non-whitespace byte is `[` is JSON; anything else is CSV.
    pub fn detect(bytes: &[u8]) -> Self {
        let first = bytes
            .strip_prefix(b"\xef\xbb\xbf")
            .unwrap_or(bytes)
            .iter()
            .find(|b| !b.is_ascii_whitespace());
        match first {
            Some(b'[') => FeedFormat::Json,
            _ => FeedFormat::Csv,
        }
    }
}

/// Decompresses (if needed), sniffs the format and decodes the payload.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<RawRecord>> {
    let bytes = decompress(bytes)?;
    let format = FeedFormat::detect(&bytes);
    debug!(?format, bytes = bytes.len(), "Decoding feed");
    parse_rows(&bytes, format)
}

pub fn parse_rows(bytes: &[u8], format: FeedFormat) -> Result<Vec<RawRecord>> {
    match format {
        FeedFormat::Csv => parse_csv(bytes),
        FeedFormat::Json => parse_json(bytes),
    }
}

/// Decodes a CSV export. Rows the CSV reader cannot decode are skipped.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<RawRecord>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers = reader.headers().context("failed to read CSV headers")?.clone();
    let columns = build_header_map(&headers);

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(record) => rows.push(csv_row(&record, &columns)),
            // +2: 1-based lines, plus the header line.
            Err(e) => debug!(line = idx + 2, error = %e, "Skipping undecodable CSV row"),
        }
    }

    Ok(rows)
}

/// Decodes a JSON array of row objects. Non-object elements become empty rows
/// so they are counted (and then dropped) by normalization.
pub fn parse_json(bytes: &[u8]) -> Result<Vec<RawRecord>> {
    let value: Value = serde_json::from_slice(bytes).context("feed is not valid JSON")?;
    let Value::Array(items) = value else {
        bail!("expected a JSON array of rows");
    };

    Ok(items
        .iter()
        .map(|item| item.as_object().map(json_row).unwrap_or_default())
        .collect())
}

fn decompress(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes));
    }

    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .context("failed to decompress gzip feed")?;
    Ok(Cow::Owned(out))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().trim_start_matches('\u{feff}').to_string(), idx))
        .collect()
}

fn csv_row(record: &StringRecord, columns: &HashMap<String, usize>) -> RawRecord {
    let get = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| columns.get(*k))
            .and_then(|&idx| record.get(idx))
    };
    let text = |keys: &[&str]| get(keys).filter(|s| !s.is_empty()).map(str::to_string);
    // No such column: `RawValue::Absent`, which normalization never reads as zero.
    let value = |keys: &[&str]| get(keys).map(RawValue::from_text).unwrap_or_default();

    RawRecord {
        date: text(DATE_KEYS),
        city: text(CITY_KEYS),
        pm25: value(PM25_KEYS),
        pm10: value(PM10_KEYS),
        temp: value(TEMP_KEYS),
        air_quality: text(AIR_QUALITY_KEYS),
    }
}

fn json_row(object: &Map<String, Value>) -> RawRecord {
    let get = |keys: &[&str]| keys.iter().find_map(|k| object.get(*k));
    let text = |keys: &[&str]| {
        get(keys).and_then(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };
    let value = |keys: &[&str]| get(keys).map(RawValue::from_json).unwrap_or_default();

    RawRecord {
        date: text(DATE_KEYS),
        city: text(CITY_KEYS),
        pm25: value(PM25_KEYS),
        pm10: value(PM10_KEYS),
        temp: value(TEMP_KEYS),
        air_quality: text(AIR_QUALITY_KEYS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const CSV: &str = "Date,City,Temp,Air Quality,PM 2.5,PM 10\n\
                       2024-01-01,Toronto,-3,Good,15,25\n\
                       1/2/2024 0:00:00,Toronto,,Moderate,,10\n";

    #[test]
    fn test_detect_format() {
        assert_eq!(FeedFormat::detect(b"  \n[{\"a\":1}]"), FeedFormat::Json);
        assert_eq!(FeedFormat::detect(b"Date,City\n"), FeedFormat::Csv);
        assert_eq!(FeedFormat::detect(b""), FeedFormat::Csv);
    }

    #[test]
    fn test_parse_csv_keeps_spaced_columns() {
        let rows = parse_feed(CSV.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date.as_deref(), Some("2024-01-01"));
        assert_eq!(rows[0].city.as_deref(), Some("Toronto"));
        assert_eq!(rows[0].pm25, RawValue::Text("15".into()));
        assert_eq!(rows[0].pm10, RawValue::Text("25".into()));
        assert_eq!(rows[0].temp, RawValue::Text("-3".into()));
        assert_eq!(rows[0].air_quality.as_deref(), Some("Good"));

        assert_eq!(rows[1].pm25, RawValue::Missing);
        assert_eq!(rows[1].temp, RawValue::Missing);
    }

    #[test]
    fn test_parse_csv_strips_bom() {
        let rows = parse_csv("\u{feff}Date,City,PM 2.5,PM 10\n2024-01-01,Boston,1,2\n".as_bytes()).unwrap();
        assert_eq!(rows[0].date.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn test_parse_json_numbers_and_strings() {
        let body = r#"[
            {"date": "2024-01-01", "city": "Toronto", "PM 2.5": 15, "PM 10": "25", "temp": "-3", "airQuality": "Good"},
            {"Date": "2024-01-02", "City": "Toronto", "PM 2.5": "", "PM 10": null},
            "not a row"
        ]"#;
        let rows = parse_feed(body.as_bytes()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].pm25, RawValue::Number(15.0));
        assert_eq!(rows[0].pm10, RawValue::Text("25".into()));
        assert_eq!(rows[0].air_quality.as_deref(), Some("Good"));
        assert_eq!(rows[1].city.as_deref(), Some("Toronto"));
        assert_eq!(rows[1].pm25, RawValue::Missing);
        assert_eq!(rows[1].pm10, RawValue::Missing);
        assert_eq!(rows[2], RawRecord::default());
    }

    #[test]
    fn test_absent_column_is_not_a_blank_cell() {
        let rows = parse_feed(b"Date,City,PM 10\n2024-01-01,Toronto,80\n").unwrap();
        assert_eq!(rows[0].pm25, RawValue::Absent);
        assert_eq!(rows[0].pm10, RawValue::Text("80".into()));

        let rows = parse_feed(br#"[{"date": "2024-01-01", "city": "Toronto", "PM 10": 80}]"#).unwrap();
        assert_eq!(rows[0].pm25, RawValue::Absent);
    }

    #[test]
    fn test_parse_json_rejects_non_array() {
        assert!(parse_json(br#"{"error": "Failed to process CSV file"}"#).is_err());
        assert!(parse_json(b"not json").is_err());
    }

    #[test]
    fn test_parse_gzip_payload() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(CSV.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let rows = parse_feed(&compressed).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_empty_payload_yields_no_rows() {
        assert!(parse_feed(b"").unwrap().is_empty());
        assert!(parse_feed(b"[]").unwrap().is_empty());
    }
}
