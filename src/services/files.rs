// src/services/files.rs

//! Attachment downloader.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::{Config, ContentSnapshot};
use crate::services::RetryingFetcher;
use crate::utils::url::attachment_file_name;

/// Summary of a download run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub total: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failures: usize,
}

enum FileStatus {
    Downloaded,
    AlreadyPresent,
}

/// Unique attachment URLs of a content snapshot, in snapshot order.
pub fn collect_attachments(snapshot: &ContentSnapshot) -> Vec<String> {
    let mut seen = HashSet::new();
    snapshot
        .iter()
        .flat_map(|(_, details)| details)
        .flat_map(|detail| detail.files.iter())
        .filter(|url| seen.insert(url.as_str()))
        .cloned()
        .collect()
}

/// Service for saving post attachments to disk.
pub struct FileDownloader {
    base_url: String,
    output_dir: PathBuf,
    fetcher: RetryingFetcher,
    concurrency: usize,
    progress_every: usize,
}

impl FileDownloader {
    pub fn new(config: &Config, fetcher: RetryingFetcher, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: config.site.base_url.clone(),
            output_dir: output_dir.into(),
            fetcher,
            concurrency: config.crawler.max_concurrent.max(1),
            progress_every: config.crawler.progress_every.max(1),
        }
    }

    /// Download every URL not already present in the output directory.
    ///
    /// A failed download is logged and leaves no file behind.
    pub async fn download_all(&self, urls: &[String]) -> Result<DownloadOutcome> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        log::info!("Start fetching {} files", urls.len());

        let mut outcome = DownloadOutcome {
            total: urls.len(),
            ..DownloadOutcome::default()
        };

        // Distinct URLs can flatten to the same file name; the first one wins.
        let mut names = HashSet::new();
        let mut jobs = Vec::with_capacity(urls.len());
        for url in urls {
            let name = attachment_file_name(&self.base_url, url);
            let path = self.output_dir.join(&name);
            if names.insert(name) {
                jobs.push((url, path));
            } else {
                log::warn!(
                    "Skipping file {url}: {} is taken by another attachment",
                    path.display()
                );
                outcome.skipped += 1;
            }
        }

        let mut done = outcome.skipped;
        let mut downloads = stream::iter(jobs)
            .map(|(url, path)| async move { (url, self.download(url, &path).await) })
            .buffer_unordered(self.concurrency);

        while let Some((url, result)) = downloads.next().await {
            done += 1;
            match result {
                Ok(FileStatus::Downloaded) => outcome.downloaded += 1,
                Ok(FileStatus::AlreadyPresent) => outcome.skipped += 1,
                Err(e) => {
                    outcome.failures += 1;
                    log::warn!("Error fetching file {url}: {e}");
                }
            }

            if done % self.progress_every == 0 || done == outcome.total {
                log::info!("Downloaded {done}/{} files", outcome.total);
            }
        }

        Ok(outcome)
    }

    async fn download(&self, url: &str, path: &Path) -> Result<FileStatus> {
        if tokio::fs::try_exists(path).await? {
            return Ok(FileStatus::AlreadyPresent);
        }

        let bytes = self.fetcher.fetch_bytes(url).await?;
        Self::write_atomic(path, &bytes).await?;
        Ok(FileStatus::Downloaded)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".part");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::models::PostDetail;
    use crate::services::RetryPolicy;
    use crate::testing::StubClient;

    fn detail(files: &[&str]) -> PostDetail {
        PostDetail {
            files: files.iter().map(|f| f.to_string()).collect(),
            ..PostDetail::default()
        }
    }

    fn downloader(client: &Arc<StubClient>, dir: &Path) -> FileDownloader {
        let mut config = Config::default();
        config.site.base_url = "http://site".into();
        let fetcher = RetryingFetcher::new(
            client.clone(),
            RetryPolicy::new(3, Duration::ZERO),
            Duration::from_secs(5),
        );
        FileDownloader::new(&config, fetcher, dir)
    }

    #[test]
    fn collect_attachments_dedupes_in_order() {
        let mut snapshot = ContentSnapshot::new();
        snapshot.insert(
            "news",
            vec![
                detail(&["http://site/a/1.pdf", "http://site/a/2.pdf"]),
                detail(&["http://site/a/1.pdf"]),
            ],
        );
        assert_eq!(
            collect_attachments(&snapshot),
            vec!["http://site/a/1.pdf", "http://site/a/2.pdf"]
        );
    }

    #[tokio::test]
    async fn downloads_and_skips_failures() {
        let tmp = TempDir::new().unwrap();
        let client = Arc::new(
            StubClient::new()
                .bytes("http://site/a/1.pdf", b"%PDF".to_vec())
                .fail_always("http://site/a/2.pdf"),
        );
        let urls = vec![
            "http://site/a/1.pdf".to_string(),
            "http://site/a/2.pdf".to_string(),
        ];

        let outcome = downloader(&client, tmp.path())
            .download_all(&urls)
            .await
            .unwrap();

        assert_eq!(outcome.downloaded, 1);
        assert_eq!(outcome.failures, 1);
        assert_eq!(
            std::fs::read(tmp.path().join("a_1.pdf")).unwrap(),
            b"%PDF".to_vec()
        );
        assert!(!tmp.path().join("a_2.pdf").exists());
    }

    #[tokio::test]
    async fn existing_files_are_not_fetched_again() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a_1.pdf"), b"old").unwrap();
        let client = Arc::new(StubClient::new().bytes("http://site/a/1.pdf", b"new".to_vec()));

        let outcome = downloader(&client, tmp.path())
            .download_all(&["http://site/a/1.pdf".to_string()])
            .await
            .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(client.total_calls(), 0);
        assert_eq!(std::fs::read(tmp.path().join("a_1.pdf")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn colliding_file_names_are_downloaded_once() {
        let tmp = TempDir::new().unwrap();
        let client = Arc::new(
            StubClient::new()
                .bytes("http://site/a/b_c.pdf", b"first".to_vec())
                .bytes("http://site/a_b/c.pdf", b"second".to_vec()),
        );
        let urls = vec![
            "http://site/a/b_c.pdf".to_string(),
            "http://site/a_b/c.pdf".to_string(),
        ];

        let outcome = downloader(&client, tmp.path())
            .download_all(&urls)
            .await
            .unwrap();

        assert_eq!(outcome.downloaded, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(client.calls("http://site/a_b/c.pdf"), 0);
        assert_eq!(
            std::fs::read(tmp.path().join("a_b_c.pdf")).unwrap(),
            b"first".to_vec()
        );
        assert!(!tmp.path().join("a_b_c.pdf.part").exists());
    }
}
