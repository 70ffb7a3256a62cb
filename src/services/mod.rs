//! Service layer for the harvester.
//!
//! This module contains the business logic for:
//! - Retried network access (`RetryingFetcher`)
//! - Page parsing (`PageParser`, `WhutParser`)
//! - Listing enumeration (`ListCrawler`)
//! - Post detail fetching (`ContentCrawler`)
//! - Attachment download (`FileDownloader`)

mod contents;
mod fetcher;
mod files;
mod lists;
mod parser;

pub use contents::{ContentCrawler, ContentOutcome};
pub use fetcher::{RetryPolicy, RetryingFetcher};
pub use files::{DownloadOutcome, FileDownloader, collect_attachments};
pub use lists::ListCrawler;
pub use parser::{PageParser, WhutParser};
