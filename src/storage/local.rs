//! Local filesystem storage implementation.
//!
//! Each artifact is a pretty-printed JSON object mapping category to records.
//! Writes go to a temporary file first and are renamed into place, so a
//! crashed run never leaves a half-written snapshot.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{ContentSnapshot, ListSnapshot};
use crate::storage::{Artifact, SnapshotStorage};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Full path of an artifact.
    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.root_dir.join(artifact.file_name())
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, artifact: Artifact, bytes: &[u8]) -> Result<()> {
        let path = self.path(artifact);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, artifact: Artifact, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(artifact, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, artifact: Artifact) -> Result<Option<Vec<u8>>> {
        let path = self.path(artifact);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, artifact: Artifact) -> Result<Option<T>> {
        match self.read_bytes(artifact).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SnapshotStorage for LocalStorage {
    async fn exists(&self, artifact: Artifact) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path(artifact)).await?)
    }

    async fn load_lists(&self, artifact: Artifact) -> Result<Option<ListSnapshot>> {
        let snapshot: Option<ListSnapshot> = self.read_json(artifact).await?;
        Ok(snapshot.map(|mut snapshot| {
            snapshot.assign_categories();
            snapshot
        }))
    }

    async fn load_contents(&self, artifact: Artifact) -> Result<Option<ContentSnapshot>> {
        self.read_json(artifact).await
    }

    async fn save_lists(&self, artifact: Artifact, snapshot: &ListSnapshot) -> Result<()> {
        self.write_json(artifact, snapshot).await?;
        log::info!(
            "Saved {} posts in {} categories to {}",
            snapshot.total(),
            snapshot.category_count(),
            self.path(artifact).display()
        );
        Ok(())
    }

    async fn save_contents(&self, artifact: Artifact, snapshot: &ContentSnapshot) -> Result<()> {
        self.write_json(artifact, snapshot).await?;
        log::info!(
            "Saved {} post details in {} categories to {}",
            snapshot.total(),
            snapshot.category_count(),
            self.path(artifact).display()
        );
        Ok(())
    }

    async fn remove(&self, artifact: Artifact) -> Result<bool> {
        match tokio::fs::remove_file(self.path(artifact)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}
