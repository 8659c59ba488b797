//! Raw row validation.
//!
//! Turns [`RawRecord`]s from any source into [`NormalizedRecord`]s. Rows that
//! cannot be read are dropped (never defaulted), with the reason logged at
//! `debug` level.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RowError;
use crate::records::types::{NormalizedRecord, RawRecord, RawValue};

/// Formats tried, in order, for the primary ISO-8601 parse of naive timestamps.
const ISO_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Older feed exports write `M/D/YYYY H:mm:ss`.
const FALLBACK_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// What to do with a blank pollutant cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValuePolicy {
    /// Read the cell as `0.0` (a sensor without a value counts as clean air).
    #[default]
    Zero,
    /// Drop the whole row.
    Drop,
}

impl FromStr for MissingValuePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(MissingValuePolicy::Zero),
            "drop" => Ok(MissingValuePolicy::Drop),
            other => Err(format!("unknown missing-value policy '{other}'")),
        }
    }
}

/// Normalizes every row that can be read, preserving input order.
pub fn normalize(rows: &[RawRecord], policy: MissingValuePolicy) -> Vec<NormalizedRecord> {
    let mut out = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        match normalize_row(row, policy) {
            Ok(record) => out.push(record),
            Err(e) => debug!(index, error = %e, "Dropping row"),
        }
    }

    if out.len() < rows.len() {
        debug!(
            rows = rows.len(),
            kept = out.len(),
            dropped = rows.len() - out.len(),
            "Normalization dropped rows"
        );
    }

    out
}

/// Validates a single row.
pub fn normalize_row(row: &RawRecord, policy: MissingValuePolicy) -> Result<NormalizedRecord, RowError> {
    let date = row
        .date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or(RowError::MissingDate)?;
    let timestamp = parse_timestamp(date).ok_or_else(|| RowError::InvalidDate(date.to_string()))?;

    let city = row
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(RowError::MissingCity)?;

    let pm25 = parse_pollutant("PM 2.5", &row.pm25, policy)?;
    let pm10 = parse_pollutant("PM 10", &row.pm10, policy)?;

    Ok(NormalizedRecord {
        timestamp,
        city: city.to_string(),
        pm25,
        pm10,
        temp: parse_optional(&row.temp),
    })
}

/// Parses a feed timestamp: ISO-8601 first, then the `M/D/YYYY H:mm:ss`
/// fallback. Naive values are taken as UTC; bare dates as midnight.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    parse_iso(s).or_else(|| {
        NaiveDateTime::parse_from_str(s, FALLBACK_FORMAT)
            .ok()
            .map(|n| n.and_utc())
    })
}

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ISO_DATETIME_FORMATS {
        if let Ok(n) = NaiveDateTime::parse_from_str(s, format) {
            return Some(n.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, ISO_DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

fn parse_pollutant(field: &'static str, value: &RawValue, policy: MissingValuePolicy) -> Result<f64, RowError> {
    let v = match value {
        RawValue::Absent => return Err(RowError::AbsentField { field }),
        RawValue::Missing => {
            return match policy {
                MissingValuePolicy::Zero => Ok(0.0),
                MissingValuePolicy::Drop => Err(RowError::MissingValue { field }),
            };
        }
        RawValue::Number(v) => *v,
        RawValue::Text(text) => text.trim().parse::<f64>().map_err(|_| RowError::NonNumeric {
            field,
            value: text.clone(),
        })?,
    };

    if !v.is_finite() {
        return Err(RowError::NonNumeric {
            field,
            value: v.to_string(),
        });
    }
    if v < 0.0 {
        return Err(RowError::Negative { field, value: v });
    }

    Ok(v)
}

/// Temperature is informational; anything unreadable becomes `None`.
fn parse_optional(value: &RawValue) -> Option<f64> {
    let v = match value {
        RawValue::Absent | RawValue::Missing => return None,
        RawValue::Number(v) => *v,
        RawValue::Text(text) => text.trim().parse::<f64>().ok()?,
    };
    v.is_finite().then_some(v)
}
