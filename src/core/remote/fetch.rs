//! External JSON Fetch
//!
//! Single-request download of an itinerary published at a URL. No retries:
//! a failure ends that resolution attempt.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use url::Url;

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} failed with status {status}")]
    Status { status: u16, url: String },

    #[error("Response from {url} is not JSON: {reason}")]
    InvalidJson { url: String, reason: String },
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Fetches a JSON document by URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value>;
}

/// `reqwest`-backed fetcher for `http(s)` URLs.
#[derive(Clone)]
pub struct HttpJsonFetcher {
    client: Client,
}

impl HttpJsonFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JsonFetcher for HttpJsonFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "{url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }

        log::debug!("Fetching external trip from {}", parsed);
        let resp = self
            .client
            .get(parsed)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::InvalidJson {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let fetcher = HttpJsonFetcher::new(Duration::from_secs(1)).unwrap();
        let err = fetcher.fetch_json("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_rejects_unparseable_url() {
        let fetcher = HttpJsonFetcher::new(Duration::from_secs(1)).unwrap();
        let err = fetcher.fetch_json("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }
}
