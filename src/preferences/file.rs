use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

use super::{PreferenceStore, Preferences, UserId};

/// Preferences for several users, stored as a JSON object keyed by user ID:
/// ```json
/// {
///   "u-123": { "city": "Toronto", "has_HVAC": true, "has_ecologica": false },
///   "u-456": { "city": "Boston" }
/// }
/// ```
///
/// The file is read on every lookup, so edits are picked up and a missing or
/// corrupt file surfaces as a lookup error rather than a startup failure.
pub struct JsonFilePreferenceStore {
    path: PathBuf,
}

impl JsonFilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_entries(&self) -> Result<HashMap<String, Value>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read preferences file {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse preferences file {}", self.path.display()))
    }
}

#[async_trait]
impl PreferenceStore for JsonFilePreferenceStore {
    async fn load(&self, user: &UserId) -> Result<Option<Preferences>> {
        let entries = self.read_entries().await?;
        Ok(entries.get(user.as_str()).and_then(Preferences::from_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::resolve_preferences;
    use std::env;
    use std::fs;

    const JSON: &str = r#"{
        "u-123": { "city": "Toronto", "has_HVAC": true, "has_ecologica": false },
        "u-456": { "city": "Boston" },
        "u-789": "corrupt"
    }"#;

    #[tokio::test]
    async fn test_lookup_by_user() {
        let path = env::temp_dir().join("pm_insights_test_prefs_lookup.json");
        fs::write(&path, JSON).unwrap();
        let store = JsonFilePreferenceStore::new(&path);

        let prefs = store.load(&UserId::from("u-123")).await.unwrap().unwrap();
        assert_eq!(prefs.city, "Toronto");
        assert!(prefs.has_hvac);

        let prefs = store.load(&UserId::from("u-456")).await.unwrap().unwrap();
        assert!(!prefs.has_hvac);

        assert!(store.load(&UserId::from("u-789")).await.unwrap().is_none());
        assert!(store.load(&UserId::from("nobody")).await.unwrap().is_none());

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_or_corrupt_file_resolves_to_defaults() {
        let user = UserId::from("u-123");

        let missing = JsonFilePreferenceStore::new("/nonexistent/pm_insights_prefs.json");
        assert!(missing.load(&user).await.is_err());
        assert_eq!(resolve_preferences(&missing, &user).await, None);

        let path = env::temp_dir().join("pm_insights_test_prefs_corrupt.json");
        fs::write(&path, "{ not json").unwrap();
        let corrupt = JsonFilePreferenceStore::new(&path);
        assert!(corrupt.load(&user).await.is_err());
        assert_eq!(resolve_preferences(&corrupt, &user).await, None);

        fs::remove_file(&path).unwrap();
    }
}
