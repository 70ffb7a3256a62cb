// src/services/fetcher.rs

//! Retrying fetcher.
//!
//! Every network call goes through [`RetryingFetcher`]: a fixed number of
//! attempts with a fixed pause between them. Exhaustion yields
//! [`AppError::Transport`], which callers treat as losing one item.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::http::FetchClient;

/// Attempt count and fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay())
    }
}

/// Wraps a [`FetchClient`] with bounded retries.
#[derive(Clone)]
pub struct RetryingFetcher {
    client: Arc<dyn FetchClient>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl RetryingFetcher {
    pub fn new(client: Arc<dyn FetchClient>, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            client,
            policy,
            timeout,
        }
    }

    /// Build from crawler settings.
    pub fn from_config(client: Arc<dyn FetchClient>, config: &CrawlerConfig) -> Self {
        Self::new(client, RetryPolicy::from_config(config), config.timeout())
    }

    /// Fetch a page and decode it as UTF-8.
    ///
    /// A body that is not valid UTF-8 counts as a failed attempt.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        self.fetch_with(url, |bytes| {
            String::from_utf8(bytes).map_err(|e| AppError::parse(url, e))
        })
        .await
    }

    /// Fetch raw bytes, e.g. an attachment.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.fetch_with(url, Ok).await
    }

    async fn fetch_with<T, F>(&self, url: &str, decode: F) -> Result<T>
    where
        F: Fn(Vec<u8>) -> Result<T>,
    {
        let attempts = self.policy.max_attempts;
        for attempt in 1..=attempts {
            let outcome = match self.client.get(url, self.timeout).await {
                Ok(bytes) => decode(bytes),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) => {
                    log::warn!("Error fetching {url}, attempt {attempt}/{attempts}: {e}");
                    if attempt < attempts && !self.policy.delay.is_zero() {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        log::warn!("Giving up on {url}: {attempts} attempts failed");
        Err(AppError::transport(url, attempts))
    }
}
