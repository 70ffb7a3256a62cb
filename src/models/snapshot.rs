//! Per-category snapshots and the incremental head marker.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Located, PostDetail, PostRef};

/// Ordered records per category, newest first.
///
/// The first record of each category is the newest post known when the
/// snapshot was taken. Incremental crawling relies on that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot<T> {
    categories: BTreeMap<String, Vec<T>>,
}

/// Listing-level snapshot (`post_list.json`).
pub type ListSnapshot = Snapshot<PostRef>;

/// Detail-level snapshot (`post_content.json`).
pub type ContentSnapshot = Snapshot<PostDetail>;

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            categories: BTreeMap::new(),
        }
    }
}

impl<T> Snapshot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a snapshot with an empty entry for every category.
    pub fn with_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: categories
                .into_iter()
                .map(|c| (c.into(), Vec::new()))
                .collect(),
        }
    }

    /// Records for a category, empty if the category is unknown.
    pub fn get(&self, category: &str) -> &[T] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace the records of a category.
    pub fn insert(&mut self, category: impl Into<String>, records: Vec<T>) {
        self.categories.insert(category.into(), records);
    }

    /// Append one record to a category, creating it if needed.
    pub fn push(&mut self, category: impl Into<String>, record: T) {
        self.categories
            .entry(category.into())
            .or_default()
            .push(record);
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// Category names in key order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.categories
            .iter()
            .map(|(category, records)| (category.as_str(), records.as_slice()))
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Total number of records across categories.
    pub fn total(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// True when no category holds any record.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl ListSnapshot {
    /// Give every reference stored without a category the category it is
    /// filed under.
    pub fn assign_categories(&mut self) {
        for (category, refs) in self.categories.iter_mut() {
            for post in refs.iter_mut().filter(|post| post.category.is_empty()) {
                post.category.clone_from(category);
            }
        }
    }
}

impl<T> IntoIterator for Snapshot<T> {
    type Item = (String, Vec<T>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.categories.into_iter()
    }
}

impl<T> FromIterator<(String, Vec<T>)> for Snapshot<T> {
    fn from_iter<I: IntoIterator<Item = (String, Vec<T>)>>(iter: I) -> Self {
        Self {
            categories: iter.into_iter().collect(),
        }
    }
}

/// Stopping sentinel for one category's incremental scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeadMarker {
    url: Option<String>,
    reached: bool,
}

impl HeadMarker {
    /// Marker anchored on the newest URL of the previous run.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            reached: false,
        }
    }

    /// Marker for a category with no previous content. It is never reached,
    /// so the whole category is taken as new.
    pub fn unanchored() -> Self {
        Self::default()
    }

    /// Derive the marker for `category` from the first entry of a snapshot.
    pub fn from_snapshot<T: Located>(snapshot: &Snapshot<T>, category: &str) -> Self {
        snapshot
            .get(category)
            .first()
            .map(|head| Self::new(head.url()))
            .unwrap_or_else(Self::unanchored)
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn is_reached(&self) -> bool {
        self.reached
    }

    /// Check a scanned URL against the marker.
    ///
    /// Returns true once the boundary has been reached, including on the call
    /// that reaches it.
    pub fn observe(&mut self, url: &str) -> bool {
        if !self.reached && self.url.as_deref() == Some(url) {
            self.reached = true;
        }
        self.reached
    }
}
