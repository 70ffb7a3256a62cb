//! Storage abstractions for snapshot persistence.
//!
//! A run reads the previous snapshots once and writes new ones once. Nothing
//! is appended in place.
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! ├── post_list.json            # List snapshot
//! ├── post_list.diff.json       # New references of the last update
//! ├── post_content.json         # Content snapshot
//! ├── post_content.diff.json    # New details of the last update
//! └── file/                     # Downloaded attachments
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ContentSnapshot, ListSnapshot};

// Re-export for convenience
pub use local::LocalStorage;

/// The four persisted artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    PostList,
    PostListDiff,
    PostContent,
    PostContentDiff,
}

impl Artifact {
    pub const ALL: [Artifact; 4] = [
        Artifact::PostList,
        Artifact::PostListDiff,
        Artifact::PostContent,
        Artifact::PostContentDiff,
    ];

    /// File name relative to the data directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::PostList => "post_list.json",
            Artifact::PostListDiff => "post_list.diff.json",
            Artifact::PostContent => "post_content.json",
            Artifact::PostContentDiff => "post_content.diff.json",
        }
    }
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Whether an artifact has been written before.
    async fn exists(&self, artifact: Artifact) -> Result<bool>;

    /// Load a list-level artifact, `None` if it was never written.
    async fn load_lists(&self, artifact: Artifact) -> Result<Option<ListSnapshot>>;

    /// Load a content-level artifact, `None` if it was never written.
    async fn load_contents(&self, artifact: Artifact) -> Result<Option<ContentSnapshot>>;

    /// Replace a list-level artifact atomically.
    async fn save_lists(&self, artifact: Artifact, snapshot: &ListSnapshot) -> Result<()>;

    /// Replace a content-level artifact atomically.
    async fn save_contents(&self, artifact: Artifact, snapshot: &ContentSnapshot) -> Result<()>;

    /// Delete an artifact. Returns whether it existed.
    async fn remove(&self, artifact: Artifact) -> Result<bool>;
}
