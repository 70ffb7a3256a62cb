// src/services/lists.rs

//! List crawler service.
//!
//! Walks the listing pages of each category. Full mode fetches every page
//! with bounded concurrency; incremental mode walks pages strictly in order
//! and stops at the previous run's newest post.

use std::sync::Arc;

use futures::future;
use futures::stream::{self, StreamExt};

use crate::models::{Config, HeadMarker, ListSnapshot, PostRef, SiteConfig};
use crate::services::{PageParser, RetryingFetcher};
use crate::utils::url::{listing_base, page_url};

/// What the category root page told us.
#[derive(Debug, Default)]
struct CategoryRoot {
    page_count: usize,
    refs: Vec<PostRef>,
}

/// Service for enumerating post references per category.
pub struct ListCrawler {
    site: SiteConfig,
    fetcher: RetryingFetcher,
    parser: Arc<dyn PageParser>,
    concurrency: usize,
}

impl ListCrawler {
    /// Create a new list crawler with the given configuration.
    pub fn new(config: &Config, fetcher: RetryingFetcher, parser: Arc<dyn PageParser>) -> Self {
        Self {
            site: config.site.clone(),
            fetcher,
            parser,
            concurrency: config.crawler.max_concurrent.max(1),
        }
    }

    /// Every reference of every category.
    ///
    /// Root pages are probed first, then the remaining pages of all categories
    /// share one bounded pool. Results are reassembled in page order.
    pub async fn crawl_full(&self, categories: &[String]) -> ListSnapshot {
        let roots: Vec<(&str, CategoryRoot)> = stream::iter(categories)
            .map(|category| async move { (category.as_str(), self.probe(category).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut snapshot = ListSnapshot::with_categories(categories.iter().cloned());
        let mut jobs = Vec::new();
        for (category, root) in roots {
            log::info!("{category}: {} pages", root.page_count);
            jobs.extend((1..root.page_count).map(|page| (category, page)));
            snapshot.insert(category, root.refs);
        }

        let mut pages = stream::iter(jobs)
            .map(|(category, page)| async move { (category, self.fetch_page(category, page).await) })
            .buffered(self.concurrency);

        while let Some((category, refs)) = pages.next().await {
            for post in refs {
                snapshot.push(category, post);
            }
        }

        for (category, refs) in snapshot.iter() {
            log::info!("{category}: {} posts", refs.len());
        }
        snapshot
    }

    /// References newer than `head`, newest first.
    ///
    /// Pages are fetched one at a time. Scanning stops at the head URL, which
    /// is not included, and no page after it is requested. If the head never
    /// shows up the whole category is returned.
    pub async fn crawl_category_incremental(
        &self,
        category: &str,
        head: &mut HeadMarker,
    ) -> Vec<PostRef> {
        let mut diff = Vec::new();
        if head.is_reached() {
            return diff;
        }

        let root = self.probe(category).await;
        Self::scan(&mut diff, root.refs, head);

        for page in 1..root.page_count {
            if head.is_reached() {
                break;
            }
            let refs = self.fetch_page(category, page).await;
            Self::scan(&mut diff, refs, head);
        }

        if head.is_reached() {
            log::info!("{category}: {} new posts", diff.len());
        } else {
            log::info!(
                "{category}: previous head not found, taking all {} posts as new",
                diff.len()
            );
        }
        diff
    }

    /// New references of every category since `previous`.
    ///
    /// Categories run concurrently; each one scans its own pages in order.
    pub async fn crawl_incremental(
        &self,
        previous: &ListSnapshot,
        categories: &[String],
    ) -> ListSnapshot {
        let scans = categories.iter().map(|category| async move {
            let mut head = HeadMarker::from_snapshot(previous, category);
            let refs = self.crawl_category_incremental(category, &mut head).await;
            (category.clone(), refs)
        });

        future::join_all(scans).await.into_iter().collect()
    }

    fn scan(diff: &mut Vec<PostRef>, refs: Vec<PostRef>, head: &mut HeadMarker) {
        for post in refs {
            if head.observe(&post.url) {
                break;
            }
            diff.push(post);
        }
    }

    /// Fetch the category root, which carries both the page count and page 0.
    async fn probe(&self, category: &str) -> CategoryRoot {
        let url = page_url(&self.site.base_url, category, 0);
        let body = match self.fetcher.fetch_text(&url).await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Error probing page count {url}: {e}");
                return CategoryRoot::default();
            }
        };

        let Some(page_count) = self.parser.parse_page_count(&body) else {
            log::warn!("Error parsing page count {url}: marker not found");
            return CategoryRoot::default();
        };
        if page_count == 0 {
            return CategoryRoot::default();
        }

        CategoryRoot {
            page_count,
            refs: self.parse_page(&body, category, &url),
        }
    }

    async fn fetch_page(&self, category: &str, page: usize) -> Vec<PostRef> {
        let url = page_url(&self.site.base_url, category, page);
        match self.fetcher.fetch_text(&url).await {
            Ok(body) => self.parse_page(&body, category, &url),
            Err(e) => {
                log::warn!("Error fetching post list {url}: {e}");
                Vec::new()
            }
        }
    }

    fn parse_page(&self, body: &str, category: &str, url: &str) -> Vec<PostRef> {
        let base = listing_base(&self.site.base_url, category);
        self.parser
            .parse_listing(body, category, &base)
            .unwrap_or_else(|e| {
                log::warn!("Error parsing post list {url}: {e}");
                Vec::new()
            })
    }
}
