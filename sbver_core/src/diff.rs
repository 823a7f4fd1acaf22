//! Change detection between two scans.

use crate::tree::TreeEntry;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A file that is new or whose content changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// Entry from the previous snapshot, `None` for a newly added file.
    pub previous: Option<TreeEntry>,
    pub current: TreeEntry,
}

impl Change {
    pub fn is_added(&self) -> bool {
        self.previous.is_none()
    }
}

/// Differences between the previous snapshot and a fresh scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Added or modified entries, in the order of the fresh scan.
    pub changed: Vec<Change>,
    /// Entries only present in the previous snapshot, in snapshot order.
    pub removed: Vec<TreeEntry>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Compare `old` and `new` by path.
///
/// An empty `old` is a first run: nothing is reported and `new` simply
/// becomes the baseline.
pub fn diff(old: &[TreeEntry], new: &[TreeEntry]) -> ChangeSet {
    if old.is_empty() {
        return ChangeSet::default();
    }

    let previous: HashMap<&Path, &TreeEntry> =
        old.iter().map(|e| (e.path.as_path(), e)).collect();

    let changed = new
        .iter()
        .filter_map(|current| match previous.get(current.path.as_path()) {
            Some(prev) if prev.hash == current.hash => None,
            prev => Some(Change {
                previous: prev.map(|p| (*p).clone()),
                current: current.clone(),
            }),
        })
        .collect();

    let present: HashSet<&Path> = new.iter().map(|e| e.path.as_path()).collect();
    let removed = old
        .iter()
        .filter(|e| !present.contains(e.path.as_path()))
        .cloned()
        .collect();

    ChangeSet { changed, removed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash;
    use crate::tree::EntryKind;

    fn entry(path: &str, content: &str) -> TreeEntry {
        TreeEntry::new(path, EntryKind::File, Some(Hash::hash_bytes(content.as_bytes())))
    }

    #[test]
    fn test_first_run_reports_nothing() {
        let new = vec![entry("/p/a.rs", "a"), entry("/p/b.rs", "b")];
        assert!(diff(&[], &new).is_empty());
    }

    #[test]
    fn test_identical_scans_report_nothing() {
        let old = vec![entry("/p/a.rs", "a"), entry("/p/b.rs", "b")];
        assert!(diff(&old, &old).is_empty());
    }

    #[test]
    fn test_modified_added_and_removed() {
        let old = vec![
            entry("/p/keep.rs", "same"),
            entry("/p/edit.rs", "v1"),
            entry("/p/gone.rs", "bye"),
        ];
        let new = vec![
            entry("/p/new.rs", "hello"),
            entry("/p/keep.rs", "same"),
            entry("/p/edit.rs", "v2"),
        ];

        let changes = diff(&old, &new);

        let changed: Vec<&str> = changes
            .changed
            .iter()
            .map(|c| c.current.name.as_str())
            .collect();
        assert_eq!(changed, vec!["new.rs", "edit.rs"]);
        assert!(changes.changed[0].is_added());
        assert_eq!(changes.changed[1].previous.as_ref().unwrap().hash, old[1].hash);

        assert_eq!(changes.removed.len(), 1);
        assert_eq!(changes.removed[0].name, "gone.rs");
    }

    #[test]
    fn test_hash_appearing_counts_as_change() {
        let old = vec![TreeEntry::new("/p/a.rs", EntryKind::File, None)];
        let new = vec![entry("/p/a.rs", "a")];
        assert_eq!(diff(&old, &new).changed.len(), 1);
    }

    use proptest::prelude::*;

    proptest! {
        /// Diffing a scan against itself never reports a change
        #[test]
        fn prop_diff_self_is_empty(contents in prop::collection::vec("[a-z]{0,8}", 0..30)) {
            let entries: Vec<TreeEntry> = contents
                .iter()
                .enumerate()
                .map(|(i, c)| entry(&format!("/p/f{}.rs", i), c))
                .collect();
            prop_assert!(diff(&entries, &entries).is_empty());
        }
    }
}
