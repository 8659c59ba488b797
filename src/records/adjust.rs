//! Mitigation multipliers.
//!
//! Each intervention contributes an independent factor per pollutant; factors
//! for interventions that are both present multiply together.

use serde::Serialize;

use crate::config::ReductionConfig;
use crate::preferences::Preferences;
use crate::records::types::{AdjustedRecord, NormalizedRecord};

/// Multipliers in `(0, 1]` for each pollutant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PollutantFactors {
    pub pm25: f64,
    pub pm10: f64,
}

impl PollutantFactors {
    pub const IDENTITY: PollutantFactors = PollutantFactors { pm25: 1.0, pm10: 1.0 };

    fn from_reductions(pm25: f64, pm10: f64) -> Self {
        Self {
            pm25: 1.0 - pm25,
            pm10: 1.0 - pm10,
        }
    }

    pub fn compose(self, other: PollutantFactors) -> PollutantFactors {
        PollutantFactors {
            pm25: self.pm25 * other.pm25,
            pm10: self.pm10 * other.pm10,
        }
    }
}

/// Per-intervention factors resolved from a validated [`ReductionConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MitigationFactors {
    pub hvac: PollutantFactors,
    pub product: PollutantFactors,
}

impl MitigationFactors {
    pub fn from_reductions(reductions: &ReductionConfig) -> Self {
        Self {
            hvac: PollutantFactors::from_reductions(reductions.hvac_pm25, reductions.hvac_pm10),
            product: PollutantFactors::from_reductions(reductions.product_pm25, reductions.product_pm10),
        }
    }

    /// Combined factors for whatever `prefs` has switched on.
    pub fn factors_for(&self, prefs: &Preferences) -> PollutantFactors {
        let mut factors = PollutantFactors::IDENTITY;
        if prefs.has_hvac {
            factors = factors.compose(self.hvac);
        }
        if prefs.has_mitigation_product {
            factors = factors.compose(self.product);
        }
        factors
    }
}

impl Default for MitigationFactors {
    fn default() -> Self {
        Self::from_reductions(&ReductionConfig::default())
    }
}

/// Applies the mitigation in `prefs` to every record. Inputs are untouched.
pub fn adjust(
    records: &[NormalizedRecord],
    prefs: &Preferences,
    factors: &MitigationFactors,
) -> Vec<AdjustedRecord> {
    let f = factors.factors_for(prefs);

    records
        .iter()
        .map(|r| AdjustedRecord {
            record: r.clone(),
            adjusted_pm25: (r.pm25 * f.pm25).max(0.0),
            adjusted_pm10: (r.pm10 * f.pm10).max(0.0),
        })
        .collect()
}
