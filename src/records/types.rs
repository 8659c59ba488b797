//! Record types flowing through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A loosely typed cell from the source. Feeds deliver pollutant readings as
/// numbers (JSON) or text (CSV), and either may be blank.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawValue {
    /// The row has no such column or key at all.
    #[default]
    Absent,
    /// The column exists but the cell is blank (or JSON `null`).
    Missing,
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Builds a value from CSV text. Whitespace-only cells count as missing.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            RawValue::Missing
        } else {
            RawValue::Text(trimmed.to_string())
        }
    }

    /// Builds a value from a JSON cell.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawValue::Missing,
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(v) => RawValue::Number(v),
                None => RawValue::Text(n.to_string()),
            },
            serde_json::Value::String(s) => RawValue::from_text(s),
            other => RawValue::Text(other.to_string()),
        }
    }
}

/// A single row as delivered by a record source, before any validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub date: Option<String>,
    pub city: Option<String>,
    pub pm25: RawValue,
    pub pm10: RawValue,
    pub temp: RawValue,
    pub air_quality: Option<String>,
}

/// A validated measurement.
///
/// `pm25` and `pm10` are finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub timestamp: DateTime<Utc>,
    pub city: String,
    pub pm25: f64,
    pub pm10: f64,
    pub temp: Option<f64>,
}

/// A measurement with mitigation applied. The original readings stay
/// available through `record`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustedRecord {
    pub record: NormalizedRecord,
    pub adjusted_pm25: f64,
    pub adjusted_pm10: f64,
}

impl AdjustedRecord {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.record.timestamp
    }

    /// Reads one pollutant from one variant of this record.
    pub fn value(&self, pollutant: Pollutant, variant: SeriesVariant) -> f64 {
        match (variant, pollutant) {
            (SeriesVariant::Original, Pollutant::Pm25) => self.record.pm25,
            (SeriesVariant::Original, Pollutant::Pm10) => self.record.pm10,
            (SeriesVariant::Adjusted, Pollutant::Pm25) => self.adjusted_pm25,
            (SeriesVariant::Adjusted, Pollutant::Pm10) => self.adjusted_pm10,
        }
    }

    pub fn adjusted(&self, pollutant: Pollutant) -> f64 {
        self.value(pollutant, SeriesVariant::Adjusted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pollutant {
    Pm25,
    Pm10,
}

impl Pollutant {
    pub const ALL: [Pollutant; 2] = [Pollutant::Pm25, Pollutant::Pm10];

    /// Column name used by the source feed (note the literal space).
    pub fn column(self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM 2.5",
            Pollutant::Pm10 => "PM 10",
        }
    }
}

impl std::fmt::Display for Pollutant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Which reading a chart series plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesVariant {
    Original,
    Adjusted,
}
