//! Where raw rows come from: a local export or an HTTP endpoint.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::parser::parse_feed;
use crate::records::RawRecord;

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    async fn fetch_rows(&self) -> Result<Vec<RawRecord>>;
}

/// A CSV or JSON export on disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    #[tracing::instrument(skip(self), fields(source = %self.path.display()))]
    async fn fetch_rows(&self) -> Result<Vec<RawRecord>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let rows = parse_feed(&bytes)?;
        debug!(rows = rows.len(), "Rows read from file");
        Ok(rows)
    }
}

/// A URL serving the rows as CSV or a JSON array.
pub struct HttpSource<C> {
    client: C,
    url: String,
}

impl<C: HttpClient> HttpSource<C> {
    pub fn new(client: C, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> RecordSource for HttpSource<C> {
    fn describe(&self) -> String {
        self.url.clone()
    }

    #[tracing::instrument(skip(self), fields(source = %self.url))]
    async fn fetch_rows(&self) -> Result<Vec<RawRecord>> {
        let bytes = fetch_bytes(&self.client, &self.url).await?;
        let rows = parse_feed(&bytes)?;
        debug!(rows = rows.len(), "Rows read from endpoint");
        Ok(rows)
    }
}

/// Locations starting with `http` are fetched over HTTP; anything else is a file path.
pub fn source_for(location: &str) -> Result<Box<dyn RecordSource>> {
    if location.starts_with("http") {
        Ok(Box::new(HttpSource::new(BasicClient::new()?, location)))
    } else {
        Ok(Box::new(FileSource::new(location)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubClient;
    use crate::records::RawValue;
    use std::env;
    use std::fs;

    #[tokio::test]
    async fn test_file_source_reads_csv() {
        let path = env::temp_dir().join("pm_insights_test_source.csv");
        fs::write(&path, "Date,City,PM 2.5,PM 10\n2024-01-01,Toronto,15,25\n").unwrap();

        let source = FileSource::new(&path);
        let rows = source.fetch_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].city.as_deref(), Some("Toronto"));

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let source = FileSource::new("/nonexistent/airqualitydata.csv");
        assert!(source.fetch_rows().await.is_err());
    }

    #[tokio::test]
    async fn test_http_source_reads_json_array() {
        let client = StubClient::default();
        client.respond(
            200,
            r#"[{"date": "2024-01-01", "city": "Toronto", "PM 2.5": 15, "PM 10": 25}]"#,
        );
        let source = HttpSource::new(client.clone(), "https://example.test/api/airquality");

        let rows = source.fetch_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pm25, RawValue::Number(15.0));
        assert_eq!(client.requests()[0].url, "https://example.test/api/airquality");
    }

    #[tokio::test]
    async fn test_http_source_error_status_fails() {
        let client = StubClient::default();
        client.respond(503, "");
        let source = HttpSource::new(client, "https://example.test/api/airquality");

        assert!(source.fetch_rows().await.is_err());
    }

    #[test]
    fn test_source_for_picks_by_scheme() {
        assert_eq!(source_for("data/aq.csv").unwrap().describe(), "data/aq.csv");
        assert_eq!(
            source_for("https://example.test/rows").unwrap().describe(),
            "https://example.test/rows"
        );
    }
}
