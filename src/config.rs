//! Pipeline configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! environment variables (a `.env` file is honoured through `dotenvy`).
//! Nothing is trusted until [`PipelineConfig::validate`] has run, which
//! [`crate::pipeline::Pipeline::new`] does before accepting a config.
//!
//! ```json
//! {
//!   "window_days": 60,
//!   "anchor": "now",
//!   "reductions": { "hvac_pm25": 0.3, "product_pm10": 0.3 }
//! }
//! ```

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::records::metrics::{STANDARD_THRESHOLDS, Threshold, WellnessRule};
use crate::records::normalize::MissingValuePolicy;
use crate::records::window::Anchor;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const MAX_WINDOW_DAYS: u32 = 3650;

pub const ENV_WINDOW_DAYS: &str = "PM_WINDOW_DAYS";
pub const ENV_ANCHOR: &str = "PM_ANCHOR";
pub const ENV_HVAC_PM25: &str = "PM_HVAC_PM25_REDUCTION";
pub const ENV_HVAC_PM10: &str = "PM_HVAC_PM10_REDUCTION";
pub const ENV_PRODUCT_PM25: &str = "PM_PRODUCT_PM25_REDUCTION";
pub const ENV_PRODUCT_PM10: &str = "PM_PRODUCT_PM10_REDUCTION";
pub const ENV_WELLNESS_MAX_PM25: &str = "PM_WELLNESS_MAX_PM25";
pub const ENV_WELLNESS_MINUTES: &str = "PM_WELLNESS_MINUTES";
pub const ENV_MISSING_VALUES: &str = "PM_MISSING_VALUES";

/// Fractional reductions (`0.4` = 40% lower) per intervention and pollutant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    pub hvac_pm25: f64,
    pub hvac_pm10: f64,
    pub product_pm25: f64,
    pub product_pm10: f64,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            hvac_pm25: 0.40,
            hvac_pm10: 0.0,
            product_pm25: 0.25,
            product_pm10: 0.25,
        }
    }
}

impl ReductionConfig {
    fn entries(&self) -> [(&'static str, f64); 4] {
        [
            ("hvac_pm25", self.hvac_pm25),
            ("hvac_pm10", self.hvac_pm10),
            ("product_pm25", self.product_pm25),
            ("product_pm10", self.product_pm10),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub window_days: u32,
    pub anchor: Anchor,
    pub reductions: ReductionConfig,
    pub thresholds: Vec<Threshold>,
    pub wellness: Vec<WellnessRule>,
    pub missing_values: MissingValuePolicy,
    /// City used when the user has no stored preference.
    pub default_city: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            anchor: Anchor::default(),
            reductions: ReductionConfig::default(),
            thresholds: STANDARD_THRESHOLDS.to_vec(),
            wellness: vec![WellnessRule::default()],
            missing_values: MissingValuePolicy::default(),
            default_city: None,
        }
    }
}

impl PipelineConfig {
    /// Loads a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Defaults (or `path`, when given) with environment overrides applied.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        base.with_overrides(|key| dotenvy::var(key).ok())
    }

    /// Applies overrides from `lookup`, keyed by the `PM_*` variable names.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_WINDOW_DAYS) {
            self.window_days = parse_var(ENV_WINDOW_DAYS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_ANCHOR) {
            self.anchor = parse_var(ENV_ANCHOR, &raw)?;
        }
        if let Some(raw) = lookup(ENV_HVAC_PM25) {
            self.reductions.hvac_pm25 = parse_var(ENV_HVAC_PM25, &raw)?;
        }
        if let Some(raw) = lookup(ENV_HVAC_PM10) {
            self.reductions.hvac_pm10 = parse_var(ENV_HVAC_PM10, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PRODUCT_PM25) {
            self.reductions.product_pm25 = parse_var(ENV_PRODUCT_PM25, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PRODUCT_PM10) {
            self.reductions.product_pm10 = parse_var(ENV_PRODUCT_PM10, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MISSING_VALUES) {
            self.missing_values = parse_var(ENV_MISSING_VALUES, &raw)?;
        }

        // The wellness variables tune the first (PM2.5 rest) rule.
        let max_pm25 = lookup(ENV_WELLNESS_MAX_PM25);
        let minutes = lookup(ENV_WELLNESS_MINUTES);
        if max_pm25.is_some() || minutes.is_some() {
            if self.wellness.is_empty() {
                self.wellness.push(WellnessRule::default());
            }
            let rule = &mut self.wellness[0];
            if let Some(raw) = max_pm25 {
                rule.max_value = parse_var(ENV_WELLNESS_MAX_PM25, &raw)?;
            }
            if let Some(raw) = minutes {
                rule.minutes_per_day = parse_var(ENV_WELLNESS_MINUTES, &raw)?;
            }
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_days == 0 || self.window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::WindowOutOfRange {
                value: self.window_days,
                max: MAX_WINDOW_DAYS,
            });
        }

        for (name, value) in self.reductions.entries() {
            if !(value.is_finite() && (0.0..1.0).contains(&value)) {
                return Err(ConfigError::ReductionOutOfRange { name, value });
            }
        }

        for t in &self.thresholds {
            if !(t.value.is_finite() && t.value >= 0.0) {
                return Err(ConfigError::InvalidThreshold {
                    pollutant: t.pollutant.to_string(),
                    value: t.value,
                });
            }
        }

        for rule in &self.wellness {
            let reason = if rule.name.trim().is_empty() {
                Some("name is empty")
            } else if !(rule.max_value.is_finite() && rule.max_value >= 0.0) {
                Some("max_value must be finite and non-negative")
            } else if !(rule.minutes_per_day.is_finite() && rule.minutes_per_day >= 0.0) {
                Some("minutes_per_day must be finite and non-negative")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(ConfigError::InvalidWellnessRule {
                    name: rule.name.clone(),
                    reason: reason.to_string(),
                });
            }
        }

        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
