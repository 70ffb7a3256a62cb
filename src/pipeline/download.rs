// src/pipeline/download.rs

//! Attachment download pipeline.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::services::{DownloadOutcome, FileDownloader, RetryingFetcher, collect_attachments};
use crate::storage::{Artifact, SnapshotStorage};

/// Download every attachment referenced by the content snapshot.
pub async fn run_download(
    config: &Config,
    storage: &dyn SnapshotStorage,
    fetcher: RetryingFetcher,
    output_dir: &Path,
) -> Result<DownloadOutcome> {
    let contents = storage
        .load_contents(Artifact::PostContent)
        .await?
        .ok_or_else(|| {
            AppError::config(format!(
                "{} not found, run a harvest first",
                Artifact::PostContent.file_name()
            ))
        })?;

    let urls = collect_attachments(&contents);
    let downloader = FileDownloader::new(config, fetcher, output_dir);
    let outcome = downloader.download_all(&urls).await?;

    log::info!(
        "Files: {} downloaded, {} already present, {} failed",
        outcome.downloaded,
        outcome.skipped,
        outcome.failures
    );
    Ok(outcome)
}
