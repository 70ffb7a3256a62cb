// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::CrawlerConfig;

/// A single network GET, no retries.
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// Fetch the raw body of `url`, failing on transport errors or a
    /// non-success status.
    async fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .build()?;
    Ok(client)
}

/// [`FetchClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetchClient {
    client: reqwest::Client,
}

impl HttpFetchClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build the client from crawler settings.
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }
}

#[async_trait]
impl FetchClient for HttpFetchClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
