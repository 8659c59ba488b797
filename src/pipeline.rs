//! Runs one dashboard computation end to end:
//! normalize → select window → adjust → aggregate → build series.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::ConfigError;
use crate::preferences::Preferences;
use crate::records::RawRecord;
use crate::records::adjust::{MitigationFactors, PollutantFactors, adjust};
use crate::records::metrics::{MetricsSummary, aggregate};
use crate::records::normalize::normalize;
use crate::records::series::{ALL_SERIES, ChartSeries, HealthConcern, ReferenceLine, build_chart_series, reference_lines};
use crate::records::window::{Anchor, select_window_at};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStatus {
    Ready,
    /// The feed had no readable rows at all.
    NoData,
    /// Rows exist, but none for the city inside the window.
    NoCityMatch,
}

impl DataStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DataStatus::Ready => "ready",
            DataStatus::NoData => "no_data",
            DataStatus::NoCityMatch => "no_city_match",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowInfo {
    pub days: u32,
    pub anchor: Anchor,
    /// Oldest and newest timestamps that made it into the window.
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub status: DataStatus,
    pub city: String,
    pub preferences: Preferences,
    pub factors: PollutantFactors,
    pub window: WindowInfo,
    pub summary: MetricsSummary,
    pub series: Vec<ChartSeries>,
    pub reference_lines: Vec<ReferenceLine>,
    pub rows_read: usize,
    pub rows_dropped: usize,
}

/// A validated configuration plus the mitigation factors derived from it.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    factors: MitigationFactors,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let factors = MitigationFactors::from_reductions(&config.reductions);
        Ok(Self { config, factors })
    }

    pub fn run(&self, rows: &[RawRecord], prefs: &Preferences, concerns: &[HealthConcern]) -> Dashboard {
        self.run_at(rows, prefs, concerns, Utc::now())
    }

    /// [`Pipeline::run`] with an explicit clock for [`Anchor::Now`].
    pub fn run_at(
        &self,
        rows: &[RawRecord],
        prefs: &Preferences,
        concerns: &[HealthConcern],
        now: DateTime<Utc>,
    ) -> Dashboard {
        let city = self.city_for(prefs);
        let normalized = normalize(rows, self.config.missing_values);
        let windowed = select_window_at(&normalized, &city, self.config.window_days, self.config.anchor, now);
        let adjusted = adjust(&windowed, prefs, &self.factors);

        let status = if normalized.is_empty() {
            DataStatus::NoData
        } else if windowed.is_empty() {
            DataStatus::NoCityMatch
        } else {
            DataStatus::Ready
        };

        let dashboard = Dashboard {
            status,
            preferences: Preferences {
                city: city.clone(),
                ..prefs.clone()
            },
            factors: self.factors.factors_for(prefs),
            window: WindowInfo {
                days: self.config.window_days,
                anchor: self.config.anchor,
                start: windowed.first().map(|r| r.timestamp),
                end: windowed.last().map(|r| r.timestamp),
            },
            summary: aggregate(&adjusted, &self.config.thresholds, &self.config.wellness),
            series: build_chart_series(&adjusted, &ALL_SERIES),
            reference_lines: reference_lines(concerns),
            rows_read: rows.len(),
            rows_dropped: rows.len() - normalized.len(),
            city,
        };

        debug!(
            rows = dashboard.rows_read,
            dropped = dashboard.rows_dropped,
            windowed = windowed.len(),
            "Pipeline stages complete"
        );
        info!(
            city = %dashboard.city,
            status = dashboard.status.as_str(),
            days = dashboard.summary.exposure.days,
            "Dashboard computed"
        );

        dashboard
    }

    fn city_for(&self, prefs: &Preferences) -> String {
        let city = prefs.city.trim();
        if city.is_empty() {
            self.config.default_city.clone().unwrap_or_default()
        } else {
            city.to_string()
        }
    }
}
