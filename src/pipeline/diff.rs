//! Snapshot merging.
//!
//! A new snapshot is the previous one with the increment prepended to each
//! category. Previous entries are never reordered or dropped, and categories
//! from either side are kept.

use crate::models::{ContentSnapshot, ListSnapshot, Snapshot};

/// Prepend `diff` to `old`, category by category.
///
/// `diff` entries must already be newest first, otherwise the head of the
/// result no longer is the newest post.
pub fn merge_snapshots<T: Clone>(old: &Snapshot<T>, diff: &Snapshot<T>) -> Snapshot<T> {
    let mut merged = Snapshot::new();

    for category in old.categories().chain(diff.categories()) {
        if merged.contains_category(category) {
            continue;
        }
        let records: Vec<T> = diff
            .get(category)
            .iter()
            .chain(old.get(category))
            .cloned()
            .collect();
        merged.insert(category, records);
    }

    merged
}

/// Merge new post references into the list snapshot.
pub fn merge_lists(old: &ListSnapshot, diff: &ListSnapshot) -> ListSnapshot {
    merge_snapshots(old, diff)
}

/// Merge freshly fetched details into the content snapshot.
pub fn merge_content(old: &ContentSnapshot, fresh: &ContentSnapshot) -> ContentSnapshot {
    merge_snapshots(old, fresh)
}
