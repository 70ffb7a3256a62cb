// src/pipeline/harvest.rs

//! Harvest pipeline.
//!
//! Decides once per run between a full crawl and an incremental update, then
//! runs list crawling, merging and content crawling in that order.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Config, ListSnapshot};
use crate::pipeline::diff::{merge_content, merge_lists};
use crate::services::{ContentCrawler, ContentOutcome, ListCrawler, PageParser, RetryingFetcher};
use crate::storage::{Artifact, SnapshotStorage};

/// Mode asked for on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeRequest {
    /// Update when previous snapshots exist, full crawl otherwise
    #[default]
    Auto,
    /// Always crawl everything
    Full,
    /// Update; fail if there is nothing to update
    Update,
}

/// Mode a run actually executes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Full,
    Incremental,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Full => f.write_str("initial"),
            RunMode::Incremental => f.write_str("update"),
        }
    }
}

impl RunMode {
    /// Pick the run mode from the request and what is on disk.
    ///
    /// Incremental mode needs both the list and the content snapshot.
    pub async fn decide(request: ModeRequest, storage: &dyn SnapshotStorage) -> Result<Self> {
        if request == ModeRequest::Full {
            return Ok(RunMode::Full);
        }

        let has_lists = storage.exists(Artifact::PostList).await?;
        let has_contents = storage.exists(Artifact::PostContent).await?;
        match (request, has_lists && has_contents) {
            (_, true) => Ok(RunMode::Incremental),
            (ModeRequest::Update, false) => Err(AppError::config(format!(
                "update requested but {} and {} are not both present",
                Artifact::PostList.file_name(),
                Artifact::PostContent.file_name()
            ))),
            _ => Ok(RunMode::Full),
        }
    }
}

/// Options for one harvest run.
#[derive(Debug, Clone, Copy, Default)]
pub struct HarvestOptions {
    pub mode: ModeRequest,
    /// Delete existing artifacts and crawl everything
    pub force_refetch: bool,
}

/// Summary of a harvest run.
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// References found per category (new ones only in an update)
    pub found: BTreeMap<String, usize>,
    /// Size of the list snapshot after the run
    pub list_total: usize,
    /// Detail records fetched in this run
    pub details_fetched: usize,
    /// References dropped by fetch or parse failures
    pub details_dropped: usize,
    /// References rejected by the URL filter
    pub filtered_out: usize,
    /// Size of the content snapshot after the run
    pub content_total: usize,
}

impl HarvestReport {
    fn new(mode: RunMode, started_at: DateTime<Utc>, found: &ListSnapshot) -> Self {
        Self {
            mode,
            started_at,
            finished_at: started_at,
            found: found
                .iter()
                .map(|(category, refs)| (category.to_string(), refs.len()))
                .collect(),
            list_total: 0,
            details_fetched: 0,
            details_dropped: 0,
            filtered_out: 0,
            content_total: 0,
        }
    }

    fn record_contents(&mut self, outcome: &ContentOutcome) {
        self.details_fetched = outcome.details.total();
        self.details_dropped = outcome.failures;
        self.filtered_out = outcome.filtered_out;
    }

    fn log_summary(&self) {
        log::info!("Harvest ({}) summary:", self.mode);
        for (category, count) in &self.found {
            log::info!("    {category}: {count} posts found");
        }
        log::info!("    list snapshot: {} posts", self.list_total);
        log::info!(
            "    details: {} fetched, {} dropped, {} filtered out",
            self.details_fetched,
            self.details_dropped,
            self.filtered_out
        );
        log::info!("    content snapshot: {} posts", self.content_total);
        log::info!(
            "    elapsed: {}s",
            (self.finished_at - self.started_at).num_seconds()
        );
    }
}

/// Run one harvest: full crawl or incremental update.
pub async fn run_harvest(
    config: &Config,
    storage: &dyn SnapshotStorage,
    fetcher: RetryingFetcher,
    parser: Arc<dyn PageParser>,
    options: HarvestOptions,
) -> Result<HarvestReport> {
    let started_at = Utc::now();

    if options.force_refetch {
        for artifact in Artifact::ALL {
            if storage.remove(artifact).await? {
                log::info!("Removed {}", artifact.file_name());
            }
        }
    }

    let request = if options.force_refetch {
        ModeRequest::Full
    } else {
        options.mode
    };
    let mode = RunMode::decide(request, storage).await?;
    log::info!("Start {mode} fetching");

    let lists = ListCrawler::new(config, fetcher.clone(), Arc::clone(&parser));
    let contents = ContentCrawler::new(config, fetcher, parser);

    let mut report = match mode {
        RunMode::Full => run_full(config, storage, &lists, &contents, started_at).await?,
        RunMode::Incremental => {
            run_incremental(config, storage, &lists, &contents, started_at).await?
        }
    };

    report.finished_at = Utc::now();
    report.log_summary();
    Ok(report)
}

async fn run_full(
    config: &Config,
    storage: &dyn SnapshotStorage,
    lists: &ListCrawler,
    contents: &ContentCrawler,
    started_at: DateTime<Utc>,
) -> Result<HarvestReport> {
    let list_snapshot = lists.crawl_full(&config.site.categories).await;
    storage
        .save_lists(Artifact::PostList, &list_snapshot)
        .await?;

    let mut report = HarvestReport::new(RunMode::Full, started_at, &list_snapshot);
    report.list_total = list_snapshot.total();

    let outcome = contents.fetch_details(&list_snapshot).await;
    storage
        .save_contents(Artifact::PostContent, &outcome.details)
        .await?;

    report.record_contents(&outcome);
    report.content_total = outcome.details.total();
    Ok(report)
}

async fn run_incremental(
    config: &Config,
    storage: &dyn SnapshotStorage,
    lists: &ListCrawler,
    contents: &ContentCrawler,
    started_at: DateTime<Utc>,
) -> Result<HarvestReport> {
    let previous_lists = storage
        .load_lists(Artifact::PostList)
        .await?
        .ok_or_else(|| AppError::config("previous list snapshot disappeared"))?;
    let previous_contents = storage
        .load_contents(Artifact::PostContent)
        .await?
        .ok_or_else(|| AppError::config("previous content snapshot disappeared"))?;

    let list_diff = lists
        .crawl_incremental(&previous_lists, &config.site.categories)
        .await;
    let list_snapshot = merge_lists(&previous_lists, &list_diff);
    storage
        .save_lists(Artifact::PostList, &list_snapshot)
        .await?;
    storage
        .save_lists(Artifact::PostListDiff, &list_diff)
        .await?;

    let mut report = HarvestReport::new(RunMode::Incremental, started_at, &list_diff);
    report.list_total = list_snapshot.total();

    let outcome = contents.fetch_details(&list_diff).await;
    let content_snapshot = merge_content(&previous_contents, &outcome.details);
    storage
        .save_contents(Artifact::PostContentDiff, &outcome.details)
        .await?;
    storage
        .save_contents(Artifact::PostContent, &content_snapshot)
        .await?;

    report.record_contents(&outcome);
    report.content_total = content_snapshot.total();
    Ok(report)
}
