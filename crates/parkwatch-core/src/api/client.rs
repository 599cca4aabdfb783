//! Feed client for fetching JSON resources over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::debug;

use super::ApiError;

/// Anything that can return a JSON document for a URL.
///
/// The fetcher depends on this rather than on `FeedClient` so retry and
/// cache policy can be exercised without a network.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value, ApiError>;
}

/// HTTP implementation of `FeedSource`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct FeedClient {
    client: Client,
    timeout: Duration,
}

impl FeedClient {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("parkwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, timeout })
    }

    /// Headers sent on every request so intermediaries never serve a
    /// cached copy of the feed.
    fn no_cache_headers() -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        headers.insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );
        headers.insert(header::PRAGMA, header::HeaderValue::from_static("no-cache"));
        headers
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl FeedSource for FeedClient {
    async fn fetch_json(&self, url: &str) -> Result<Value, ApiError> {
        debug!(url = url, "Requesting feed");

        let response = self
            .client
            .get(url)
            .headers(Self::no_cache_headers())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Timeout(self.timeout)
                } else {
                    ApiError::NetworkError(e)
                }
            })?;

        let response = Self::check_response(response).await?;

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Body is not JSON: {}", e)))
    }
}
