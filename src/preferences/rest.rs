use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use super::{PreferenceStore, Preferences, UserId};
use crate::fetch::auth::ApiKey;
use crate::fetch::{HttpClient, fetch_bytes};

const TABLE: &str = "user_preferences";

/// Reads the `user_preferences` table through a PostgREST-style endpoint.
pub struct RestPreferenceStore<C> {
    client: C,
    base_url: Url,
}

impl<C: HttpClient> RestPreferenceStore<C> {
    pub fn new(client: C, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("invalid preferences URL '{base_url}'"))?;
        Ok(Self { client, base_url })
    }
}

impl<C: HttpClient> RestPreferenceStore<ApiKey<ApiKey<C>>> {
    /// The hosted service expects the key both as `apikey` and as a bearer token.
    pub fn with_api_key(client: C, base_url: &str, key: &str) -> Result<Self> {
        let client = ApiKey::new(ApiKey::bearer(client, key)?, "apikey", key)?;
        Self::new(client, base_url)
    }
}

/// `GET {base}/user_preferences?user_id=eq.{id}&select=*`
pub fn preferences_url(base_url: &Url, user: &UserId) -> Result<Url> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("preferences URL cannot be a base: {base_url}"))?
        .pop_if_empty()
        .push(TABLE);
    url.query_pairs_mut()
        .clear()
        .append_pair("user_id", &format!("eq.{user}"))
        .append_pair("select", "*");
    Ok(url)
}

/// The endpoint answers with an array of rows; a bare object is accepted too.
fn first_row(body: &Value) -> Option<&Value> {
    match body {
        Value::Array(rows) => rows.first(),
        Value::Object(_) => Some(body),
        _ => None,
    }
}

#[async_trait]
impl<C: HttpClient> PreferenceStore for RestPreferenceStore<C> {
    async fn load(&self, user: &UserId) -> Result<Option<Preferences>> {
        let url = preferences_url(&self.base_url, user)?;
        let bytes = fetch_bytes(&self.client, url.as_str()).await?;
        let body: Value = serde_json::from_slice(&bytes).context("preferences response is not valid JSON")?;
        Ok(first_row(&body).and_then(Preferences::from_value))
    }
}
