//! City scoping and trailing-window selection.

use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::records::types::NormalizedRecord;

/// The instant a window is measured back from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    /// The newest timestamp present for the city.
    #[default]
    LatestInData,
    /// The wall clock at the time of the call.
    Now,
}

impl FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "latest-in-data" | "latest" => Ok(Anchor::LatestInData),
            "now" => Ok(Anchor::Now),
            other => Err(format!("unknown anchor '{other}'")),
        }
    }
}

/// Selects the trailing `window_days` of `city`'s records, oldest first.
pub fn select_window(
    records: &[NormalizedRecord],
    city: &str,
    window_days: u32,
    anchor: Anchor,
) -> Vec<NormalizedRecord> {
    select_window_at(records, city, window_days, anchor, Utc::now())
}

/// [`select_window`] with an explicit clock for the [`Anchor::Now`] mode.
pub fn select_window_at(
    records: &[NormalizedRecord],
    city: &str,
    window_days: u32,
    anchor: Anchor,
    now: DateTime<Utc>,
) -> Vec<NormalizedRecord> {
    let mut selected: Vec<NormalizedRecord> = records
        .iter()
        .filter(|r| same_city(&r.city, city))
        .cloned()
        .collect();

    let end = match anchor {
        Anchor::LatestInData => match selected.iter().map(|r| r.timestamp).max() {
            Some(latest) => latest,
            None => return Vec::new(),
        },
        Anchor::Now => now,
    };
    // A window reaching past the earliest representable instant keeps everything.
    let cutoff = TimeDelta::try_days(i64::from(window_days))
        .and_then(|span| end.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    selected.retain(|r| r.timestamp >= cutoff);
    selected.sort_by_key(|r| r.timestamp);
    selected
}

/// Distinct city names in first-seen order.
pub fn distinct_cities(records: &[NormalizedRecord]) -> Vec<String> {
    let mut cities: Vec<String> = Vec::new();
    for r in records {
        if !cities.iter().any(|c| same_city(c, &r.city)) {
            cities.push(r.city.clone());
        }
    }
    cities
}

fn same_city(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rec(day: u32, city: &str, pm25: f64) -> NormalizedRecord {
        NormalizedRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            city: city.to_string(),
            pm25,
            pm10: pm25 * 2.0,
            temp: None,
        }
    }

    #[test]
    fn test_empty_input_returns_empty() {
        assert!(select_window(&[], "Toronto", 30, Anchor::LatestInData).is_empty());
    }

    #[test]
    fn test_no_city_match_returns_empty() {
        let records = vec![rec(1, "Boston", 1.0)];
        assert!(select_window(&records, "Toronto", 30, Anchor::LatestInData).is_empty());
    }

    #[test]
    fn test_city_compare_is_case_insensitive() {
        let records = vec![rec(1, "toronto", 1.0), rec(2, " TORONTO ", 2.0), rec(3, "Boston", 3.0)];
        let out = select_window(&records, "Toronto", 30, Anchor::LatestInData);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_latest_in_data_cutoff_is_inclusive() {
        // Latest is Jan 31; a 10-day window keeps Jan 21..=31.
        let records: Vec<_> = (1..=31).map(|d| rec(d, "Toronto", d as f64)).collect();
        let out = select_window(&records, "Toronto", 10, Anchor::LatestInData);

        assert_eq!(out.len(), 11);
        assert_eq!(out.first().unwrap().pm25, 21.0);
        assert_eq!(out.last().unwrap().pm25, 31.0);
    }

    #[test]
    fn test_output_is_sorted_ascending() {
        let records = vec![rec(5, "Toronto", 5.0), rec(2, "Toronto", 2.0), rec(9, "Toronto", 9.0)];
        let out = select_window(&records, "Toronto", 30, Anchor::LatestInData);

        assert!(out.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(out.iter().map(|r| r.pm25).collect::<Vec<_>>(), vec![2.0, 5.0, 9.0]);
    }

    #[test]
    fn test_now_anchor_uses_supplied_clock() {
        let records = vec![rec(1, "Toronto", 1.0), rec(20, "Toronto", 20.0)];
        let now = Utc.with_ymd_and_hms(2024, 1, 25, 0, 0, 0).unwrap();

        let out = select_window_at(&records, "Toronto", 7, Anchor::Now, now);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pm25, 20.0);

        let far_future = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(select_window_at(&records, "Toronto", 30, Anchor::Now, far_future).is_empty());
    }

    #[test]
    fn test_oversized_window_keeps_everything() {
        let records = vec![rec(1, "Toronto", 1.0), rec(2, "Toronto", 2.0)];
        assert_eq!(select_window(&records, "Toronto", u32::MAX, Anchor::LatestInData).len(), 2);

        let now = Utc.with_ymd_and_hms(2024, 1, 25, 0, 0, 0).unwrap();
        assert_eq!(select_window_at(&records, "Toronto", 200_000_000, Anchor::Now, now).len(), 2);
    }

    #[test]
    fn test_distinct_cities_first_seen_order() {
        let records = vec![rec(1, "Toronto", 1.0), rec(2, "Boston", 1.0), rec(3, "toronto", 1.0)];
        assert_eq!(distinct_cities(&records), vec!["Toronto", "Boston"]);
    }

    #[test]
    fn test_anchor_from_str() {
        assert_eq!("latest_in_data".parse::<Anchor>(), Ok(Anchor::LatestInData));
        assert_eq!("NOW".parse::<Anchor>(), Ok(Anchor::Now));
        assert!("tomorrow".parse::<Anchor>().is_err());
    }
}
