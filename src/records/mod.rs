//! Particulate-matter record processing.
//!
//! Rows are normalized into typed records, scoped to one city's trailing
//! window, adjusted for the user's mitigation, then reduced to threshold
//! counts, wellness metrics and chart series.

pub mod adjust;
pub mod metrics;
pub mod normalize;
pub mod series;
pub mod types;
pub mod utility;
pub mod window;

pub use types::{AdjustedRecord, NormalizedRecord, Pollutant, RawRecord, RawValue, SeriesVariant};
