//! Threshold crossings and derived wellness metrics over adjusted records.

use serde::{Deserialize, Serialize};

use crate::records::types::{AdjustedRecord, Pollutant};
use crate::records::utility::{mean, peak};

/// A `(pollutant, value)` pair. A record crosses it when its adjusted reading
/// is strictly greater than `value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub pollutant: Pollutant,
    pub value: f64,
}

impl Threshold {
    pub const fn new(pollutant: Pollutant, value: f64) -> Self {
        Self { pollutant, value }
    }
}

/// Thresholds backing the named fields of [`MetricsSummary`].
pub const STANDARD_THRESHOLDS: [Threshold; 6] = [
    Threshold::new(Pollutant::Pm25, 10.0),
    Threshold::new(Pollutant::Pm25, 20.0),
    Threshold::new(Pollutant::Pm25, 50.0),
    Threshold::new(Pollutant::Pm10, 20.0),
    Threshold::new(Pollutant::Pm10, 40.0),
    Threshold::new(Pollutant::Pm10, 50.0),
];

/// Credits `minutes_per_day` for every record at or below `max_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessRule {
    pub name: String,
    pub pollutant: Pollutant,
    pub max_value: f64,
    pub minutes_per_day: f64,
}

impl Default for WellnessRule {
    fn default() -> Self {
        Self {
            name: "improved_rest_minutes".to_string(),
            pollutant: Pollutant::Pm25,
            max_value: 10.0,
            minutes_per_day: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdCount {
    pub pollutant: Pollutant,
    pub threshold: f64,
    pub days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WellnessMetric {
    pub name: String,
    pub qualifying_days: usize,
    pub minutes: f64,
}

/// Mean and peak adjusted readings. `None` means the window held no records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExposureStats {
    pub days: usize,
    pub mean_pm25: Option<f64>,
    pub mean_pm10: Option<f64>,
    pub peak_pm25: Option<f64>,
    pub peak_pm10: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub days_over_pm25_10: usize,
    pub days_over_pm25_20: usize,
    pub days_over_pm25_50: usize,
    pub days_over_pm10_20: usize,
    pub days_over_pm10_40: usize,
    pub days_over_pm10_50: usize,

    /// One entry per requested threshold, in request order.
    pub crossings: Vec<ThresholdCount>,
    pub wellness: Vec<WellnessMetric>,
    pub exposure: ExposureStats,
}

/// Number of records whose adjusted `pollutant` exceeds `threshold`.
pub fn count_over(records: &[AdjustedRecord], pollutant: Pollutant, threshold: f64) -> usize {
    records.iter().filter(|r| r.adjusted(pollutant) > threshold).count()
}

pub fn wellness_metric(records: &[AdjustedRecord], rule: &WellnessRule) -> WellnessMetric {
    let qualifying_days = records
        .iter()
        .filter(|r| r.adjusted(rule.pollutant) <= rule.max_value)
        .count();

    WellnessMetric {
        name: rule.name.clone(),
        qualifying_days,
        minutes: qualifying_days as f64 * rule.minutes_per_day,
    }
}

pub fn exposure_stats(records: &[AdjustedRecord]) -> ExposureStats {
    let pm25: Vec<f64> = records.iter().map(|r| r.adjusted_pm25).collect();
    let pm10: Vec<f64> = records.iter().map(|r| r.adjusted_pm10).collect();

    ExposureStats {
        days: records.len(),
        mean_pm25: mean(&pm25),
        mean_pm10: mean(&pm10),
        peak_pm25: peak(&pm25),
        peak_pm10: peak(&pm10),
    }
}

/// Builds the full summary. Each threshold is counted independently, so
/// overlapping or unordered sets are fine.
pub fn aggregate(
    records: &[AdjustedRecord],
    thresholds: &[Threshold],
    wellness: &[WellnessRule],
) -> MetricsSummary {
    let [p25_10, p25_20, p25_50, p10_20, p10_40, p10_50] =
        STANDARD_THRESHOLDS.map(|t| count_over(records, t.pollutant, t.value));

    MetricsSummary {
        days_over_pm25_10: p25_10,
        days_over_pm25_20: p25_20,
        days_over_pm25_50: p25_50,
        days_over_pm10_20: p10_20,
        days_over_pm10_40: p10_40,
        days_over_pm10_50: p10_50,
        crossings: thresholds
            .iter()
            .map(|t| ThresholdCount {
                pollutant: t.pollutant,
                threshold: t.value,
                days: count_over(records, t.pollutant, t.value),
            })
            .collect(),
        wellness: wellness.iter().map(|rule| wellness_metric(records, rule)).collect(),
        exposure: exposure_stats(records),
    }
}
