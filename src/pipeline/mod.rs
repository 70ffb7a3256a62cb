//! Pipeline entry points.
//!
//! - `run_harvest`: Full crawl or incremental update of all categories
//! - `run_download`: Fetch attachments referenced by the content snapshot

pub mod diff;
pub mod download;
pub mod harvest;

pub use diff::{merge_content, merge_lists, merge_snapshots};
pub use download::run_download;
pub use harvest::{HarvestOptions, HarvestReport, ModeRequest, RunMode, run_harvest};
