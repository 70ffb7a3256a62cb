// src/services/contents.rs

//! Content crawler service.
//!
//! Fetches and parses post pages with bounded concurrency. A post whose fetch
//! or parse fails is dropped; every other post is unaffected.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::{Config, ContentSnapshot, ListSnapshot, PostDetail, PostRef, SiteConfig};
use crate::services::{PageParser, RetryingFetcher};
use crate::utils::url::is_eligible_post;

/// Summary of a content crawl.
#[derive(Debug, Default)]
pub struct ContentOutcome {
    /// Detail records grouped by category, in listing order
    pub details: ContentSnapshot,
    /// References that passed the eligibility filter and were fetched
    pub submitted: usize,
    /// References rejected before any fetch
    pub filtered_out: usize,
    /// Fetched references that produced no record
    pub failures: usize,
}

/// Service for resolving post references into detail records.
pub struct ContentCrawler {
    site: SiteConfig,
    fetcher: RetryingFetcher,
    parser: Arc<dyn PageParser>,
    concurrency: usize,
    progress_every: usize,
}

impl ContentCrawler {
    /// Create a new content crawler with the given configuration.
    pub fn new(config: &Config, fetcher: RetryingFetcher, parser: Arc<dyn PageParser>) -> Self {
        Self {
            site: config.site.clone(),
            fetcher,
            parser,
            concurrency: config.crawler.max_concurrent.max(1),
            progress_every: config.crawler.progress_every.max(1),
        }
    }

    /// Fetch the detail page of every eligible reference.
    ///
    /// Every category of `refs` appears in the result, possibly empty.
    /// Tasks complete in any order; each writes its own slot and records are
    /// regrouped in input order afterwards.
    pub async fn fetch_details(&self, refs: &ListSnapshot) -> ContentOutcome {
        let mut outcome = ContentOutcome {
            details: ContentSnapshot::with_categories(refs.categories().map(str::to_string)),
            ..ContentOutcome::default()
        };

        let candidates: Vec<&PostRef> = refs.iter().flat_map(|(_, posts)| posts).collect();
        log::info!("Before filter: {} posts", candidates.len());

        let jobs: Vec<&PostRef> = candidates
            .iter()
            .copied()
            .filter(|post| is_eligible_post(&self.site, &post.url))
            .collect();
        outcome.filtered_out = candidates.len() - jobs.len();
        outcome.submitted = jobs.len();
        log::info!("After filter: {} posts", jobs.len());

        let total = jobs.len();
        let mut slots: Vec<Option<PostDetail>> = vec![None; total];
        let mut done = 0;

        let mut detail_stream = stream::iter(jobs.iter().enumerate())
            .map(|(index, post)| async move { (index, self.fetch_detail(post).await) })
            .buffer_unordered(self.concurrency);

        while let Some((index, result)) = detail_stream.next().await {
            done += 1;
            match result {
                Ok(detail) => slots[index] = Some(detail),
                Err(error) if error.is_item_loss() => {
                    outcome.failures += 1;
                    log::warn!("Dropping post {}: {}", jobs[index].url, error);
                }
                Err(error) => {
                    outcome.failures += 1;
                    log::error!("Dropping post {}: {}", jobs[index].url, error);
                }
            }

            if done % self.progress_every == 0 || done == total {
                log::info!("Fetched {done}/{total} posts");
            }
        }
        drop(detail_stream);

        for (post, slot) in jobs.iter().zip(slots) {
            if let Some(detail) = slot {
                outcome.details.push(post.category.as_str(), detail);
            }
        }
        outcome
    }

    async fn fetch_detail(&self, post: &PostRef) -> Result<PostDetail> {
        let body = self.fetcher.fetch_text(&post.url).await?;
        self.parser.parse_detail(&body, &post.url)
    }
}
