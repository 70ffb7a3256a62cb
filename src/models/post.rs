//! Post reference and post detail data structures.

use serde::{Deserialize, Serialize};

/// Anything stored in a snapshot that can be located by URL.
pub trait Located {
    /// Identity URL of the record.
    fn url(&self) -> &str;
}

/// A post reference taken from a category listing page.
///
/// Identity is `(category, url)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PostRef {
    /// Category the listing page belongs to. Older list files omit it; the
    /// snapshot key fills it in on load.
    #[serde(default)]
    pub category: String,

    /// Absolute URL of the post detail page
    pub url: String,

    /// Link text shown on the listing page
    pub title: String,
}

impl PostRef {
    pub fn new(
        category: impl Into<String>,
        url: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            url: url.into(),
            title: title.into(),
        }
    }
}

impl Located for PostRef {
    fn url(&self) -> &str {
        &self.url
    }
}

/// A post detail record parsed from a post page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PostDetail {
    /// Absolute URL of the post page
    pub url: String,

    /// Post title
    pub title: String,

    /// Publishing office or person
    pub author: String,

    /// Publication date as printed on the page
    pub date: String,

    /// Plain-text body
    pub content: String,

    /// Image sources in document order
    #[serde(default)]
    pub images: Vec<String>,

    /// Attachment URLs in document order
    #[serde(default)]
    pub files: Vec<String>,
}

impl Located for PostDetail {
    fn url(&self) -> &str {
        &self.url
    }
}
