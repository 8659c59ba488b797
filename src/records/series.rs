//! Chart-ready series.
//!
//! Everything here is plain data. Renderers own their chart objects; nothing
//! in this module keeps state between calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::types::{AdjustedRecord, Pollutant, SeriesVariant};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: DateTime<Utc>,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub pollutant: Pollutant,
    pub variant: SeriesVariant,
    pub points: Vec<SeriesPoint>,
}

/// Every (variant, pollutant) combination, originals first.
pub const ALL_SERIES: [(SeriesVariant, Pollutant); 4] = [
    (SeriesVariant::Original, Pollutant::Pm25),
    (SeriesVariant::Original, Pollutant::Pm10),
    (SeriesVariant::Adjusted, Pollutant::Pm25),
    (SeriesVariant::Adjusted, Pollutant::Pm10),
];

/// Health concerns a user can ask to see as baselines on the charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HealthConcern {
    SleepQuality,
    NervousSystem,
    RespiratoryIllness,
}

impl HealthConcern {
    /// Baseline concentration in µg/m³.
    pub fn baseline(self) -> f64 {
        match self {
            HealthConcern::SleepQuality => 10.0,
            HealthConcern::NervousSystem => 13.0,
            HealthConcern::RespiratoryIllness => 20.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HealthConcern::SleepQuality => "Sleep quality",
            HealthConcern::NervousSystem => "Nervous system",
            HealthConcern::RespiratoryIllness => "Respiratory illness",
        }
    }
}

/// A horizontal line drawn across one pollutant chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub concern: HealthConcern,
    pub label: &'static str,
    pub pollutant: Pollutant,
    pub value: f64,
}

pub fn series_label(variant: SeriesVariant, pollutant: Pollutant) -> String {
    match variant {
        SeriesVariant::Original => pollutant.column().to_string(),
        SeriesVariant::Adjusted => format!("{} (adjusted)", pollutant.column()),
    }
}

/// One `(timestamp, value)` point per record, in record order.
pub fn build_series(records: &[AdjustedRecord], variant: SeriesVariant, pollutant: Pollutant) -> Vec<SeriesPoint> {
    records
        .iter()
        .map(|r| SeriesPoint {
            x: r.timestamp(),
            y: r.value(pollutant, variant),
        })
        .collect()
}

pub fn build_chart_series(records: &[AdjustedRecord], requests: &[(SeriesVariant, Pollutant)]) -> Vec<ChartSeries> {
    requests
        .iter()
        .map(|&(variant, pollutant)| ChartSeries {
            label: series_label(variant, pollutant),
            pollutant,
            variant,
            points: build_series(records, variant, pollutant),
        })
        .collect()
}

/// Baselines for each selected concern, on both pollutant charts.
/// Duplicated concerns are only emitted once.
pub fn reference_lines(concerns: &[HealthConcern]) -> Vec<ReferenceLine> {
    let mut seen: Vec<HealthConcern> = Vec::new();
    let mut lines = Vec::new();

    for &concern in concerns {
        if seen.contains(&concern) {
            continue;
        }
        seen.push(concern);

        for pollutant in Pollutant::ALL {
            lines.push(ReferenceLine {
                concern,
                label: concern.label(),
                pollutant,
                value: concern.baseline(),
            });
        }
    }

    lines
}
