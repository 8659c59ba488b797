use crate::fetch::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects a credential as an HTTP header.
///
/// Header name and value are validated when the wrapper is built, so
/// requests never fail on a malformed key. The value is marked sensitive and
/// stays out of `Debug` output.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .with_context(|| format!("invalid header name '{header_name}'"))?;
        let mut value = HeaderValue::from_str(key).context("API key is not a valid header value")?;
        value.set_sensitive(true);

        Ok(Self {
            inner,
            header_name,
            value,
        })
    }

    /// `Authorization: Bearer <key>`.
    pub fn bearer(inner: C, key: &str) -> Result<Self> {
        Self::new(inner, AUTHORIZATION.as_str(), &format!("Bearer {key}"))
    }

    fn authorize(&self, req: &mut reqwest::Request) {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.authorize(&mut req);
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> reqwest::Request {
        reqwest::Request::new(reqwest::Method::GET, "https://example.test/rows".parse().unwrap())
    }

    #[test]
    fn test_bearer_sets_authorization_header() {
        let auth = ApiKey::bearer((), "secret").unwrap();
        let mut req = request();
        auth.authorize(&mut req);

        assert_eq!(req.headers()[AUTHORIZATION], "Bearer secret");
        assert!(req.headers()[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_custom_header_name() {
        let auth = ApiKey::new((), "apikey", "anon-key").unwrap();
        let mut req = request();
        auth.authorize(&mut req);

        assert_eq!(req.headers()["apikey"], "anon-key");
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        assert!(ApiKey::new((), "bad header", "k").is_err());
        assert!(ApiKey::new((), "apikey", "line\nbreak").is_err());
    }
}
