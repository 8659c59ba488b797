//! User preferences.
//!
//! [`Preferences`] holds the profile fields the pipeline reads.
//! [`PreferenceStore`] is the async trait for looking them up by user.
//! [`JsonFilePreferenceStore`] reads them from a local JSON file and
//! [`RestPreferenceStore`] from a PostgREST-style `user_preferences` table.

mod file;
mod rest;

pub use file::JsonFilePreferenceStore;
pub use rest::RestPreferenceStore;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Opaque identifier of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An empty `city` means "no city preference".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub city: String,
    pub has_hvac: bool,
    pub has_mitigation_product: bool,
}

const CITY_KEYS: &[&str] = &["city", "City"];
const HVAC_KEYS: &[&str] = &["has_HVAC", "has_hvac", "hasHVAC"];
const PRODUCT_KEYS: &[&str] = &[
    "has_mitigation_product",
    "hasMitigationProduct",
    "has_ecologica",
    "has_ecologgica",
];

impl Preferences {
    /// Reads a stored profile object. Unknown fields are ignored and flags
    /// that are absent or unreadable count as `false`. Returns `None` when
    /// `value` is not an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let get = |keys: &[&str]| keys.iter().find_map(|k| object.get(*k));

        let city = get(CITY_KEYS)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        Some(Self {
            city,
            has_hvac: get(HVAC_KEYS).is_some_and(flag),
            has_mitigation_product: get(PRODUCT_KEYS).is_some_and(flag),
        })
    }

    pub fn with_overrides(mut self, overrides: &PreferenceOverrides) -> Self {
        if let Some(city) = &overrides.city {
            self.city = city.trim().to_string();
        }
        if let Some(hvac) = overrides.hvac {
            self.has_hvac = hvac;
        }
        if let Some(product) = overrides.mitigation_product {
            self.has_mitigation_product = product;
        }
        self
    }
}

fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    }
}

/// Per-request values that win over the stored profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceOverrides {
    pub city: Option<String>,
    pub hvac: Option<bool>,
    pub mitigation_product: Option<bool>,
}

/// Looks up stored preferences for a user. `Ok(None)` means the user has no profile.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn load(&self, user: &UserId) -> Result<Option<Preferences>>;
}

/// Loads preferences, treating lookup failures as "no profile".
pub async fn resolve_preferences(store: &dyn PreferenceStore, user: &UserId) -> Option<Preferences> {
    match store.load(user).await {
        Ok(prefs) => {
            debug!(user = %user, found = prefs.is_some(), "Loaded preferences");
            prefs
        }
        Err(e) => {
            warn!(user = %user, error = %e, "Failed to load preferences, using defaults");
            None
        }
    }
}

/// A store that returns the same preferences for every user.
#[derive(Debug, Clone, Default)]
pub struct StaticPreferenceStore(pub Option<Preferences>);

impl StaticPreferenceStore {
    pub fn empty() -> Self {
        Self(None)
    }
}

#[async_trait]
impl PreferenceStore for StaticPreferenceStore {
    async fn load(&self, _user: &UserId) -> Result<Option<Preferences>> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FailingStore;

    #[async_trait]
    impl PreferenceStore for FailingStore {
        async fn load(&self, _user: &UserId) -> Result<Option<Preferences>> {
            anyhow::bail!("connection refused")
        }
    }

    #[test]
    fn test_from_value_reads_profile_columns() {
        let prefs = Preferences::from_value(&json!({
            "user_id": "u1",
            "city": "Toronto",
            "has_HVAC": true,
            "has_ecologica": "yes",
            "concerns": ["sleep"]
        }))
        .unwrap();

        assert_eq!(prefs.city, "Toronto");
        assert!(prefs.has_hvac);
        assert!(prefs.has_mitigation_product);
    }

    #[test]
    fn test_from_value_defaults_missing_and_odd_flags() {
        let prefs = Preferences::from_value(&json!({ "City": " Boston ", "hasHVAC": "maybe", "hasMitigationProduct": 1 })).unwrap();
        assert_eq!(prefs.city, "Boston");
        assert!(!prefs.has_hvac);
        assert!(prefs.has_mitigation_product);

        assert_eq!(Preferences::from_value(&json!({})).unwrap(), Preferences::default());
        assert!(Preferences::from_value(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_overrides_win_over_stored_values() {
        let stored = Preferences {
            city: "Toronto".into(),
            has_hvac: true,
            has_mitigation_product: false,
        };
        let overrides = PreferenceOverrides {
            city: Some("Boston".into()),
            hvac: Some(false),
            mitigation_product: None,
        };

        let prefs = stored.with_overrides(&overrides);
        assert_eq!(prefs.city, "Boston");
        assert!(!prefs.has_hvac);
        assert!(!prefs.has_mitigation_product);
    }

    #[tokio::test]
    async fn test_resolve_swallows_store_errors() {
        let user = UserId::from("u1");
        assert_eq!(resolve_preferences(&FailingStore, &user).await, None);

        let stored = Preferences {
            city: "Toronto".into(),
            ..Default::default()
        };
        let store = StaticPreferenceStore(Some(stored.clone()));
        assert_eq!(resolve_preferences(&store, &user).await, Some(stored));
        assert_eq!(resolve_preferences(&StaticPreferenceStore::empty(), &user).await, None);
    }
}
