//! HTTP acquisition for record feeds and preference stores.
//!
//! Callers depend on the [`HttpClient`] trait so that authentication can be
//! layered on as wrappers (see [`auth`]).

mod basic;
mod client;
pub mod auth;
#[cfg(test)]
pub(crate) mod stub;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use bytes::Bytes;
use tracing::debug;

/// Issues a `GET` for `url` and returns the body. Non-2xx statuses are errors.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid URL '{url}'"))?,
    );

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("GET {url} failed"))?;

    let status = resp.status();
    let resp = resp
        .error_for_status()
        .with_context(|| format!("GET {url} returned {status}"))?;

    let body = resp.bytes().await?;
    debug!(url, bytes = body.len(), "Fetched body");
    Ok(body)
}
