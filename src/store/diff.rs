//! Tree-diff collaborator: ordered changes between two tree sources.
//!
//! A merge diffs the base against each side. The base may be a real tree
//! (a commit's snapshot) or, for a virtual ancestor, an index acting as a
//! pseudo-tree, so the diff walks a [`TreeSource`] sum type with a single
//! contract: flatten to an ordered `path → blob` view, then compare.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MergeError;
use crate::model::index::Index;
use crate::model::types::{ObjectId, Stage};
use crate::store::Store;

// ---------------------------------------------------------------------------
// TreeSource
// ---------------------------------------------------------------------------

/// Either a stored tree or an index snapshot standing in for one.
#[derive(Clone, Debug)]
pub enum TreeSource {
    /// A tree object in the store.
    Tree(ObjectId),
    /// An index snapshot acting as a pseudo-tree (virtual merge base).
    Snapshot(Index),
}

// ---------------------------------------------------------------------------
// Change
// ---------------------------------------------------------------------------

/// The kind of change a path underwent between two tree sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Present only in the `to` source.
    Insert,
    /// Present only in the `from` source.
    Delete,
    /// Present in both with different content.
    Modify,
}

/// One path's change between two tree sources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change {
    /// Repository-relative path.
    pub path: String,
    /// Change kind.
    pub action: Action,
    /// Blob id in the `from` source, for `Delete` and `Modify`.
    pub from: Option<ObjectId>,
    /// Blob id in the `to` source, for `Insert` and `Modify`.
    pub to: Option<ObjectId>,
}

// ---------------------------------------------------------------------------
// tree_diff
// ---------------------------------------------------------------------------

/// Compute the ordered list of changes turning `from` into `to`.
///
/// Changes come back sorted by path. Unchanged paths are omitted.
///
/// # Errors
/// Returns an error if a referenced tree cannot be read.
pub fn tree_diff<S: Store>(
    store: &S,
    from: &TreeSource,
    to: &TreeSource,
) -> Result<Vec<Change>, MergeError> {
    let from_map = flatten(store, from)?;
    let to_map = flatten(store, to)?;

    let mut changes = Vec::new();

    for (path, from_id) in &from_map {
        match to_map.get(path) {
            None => changes.push(Change {
                path: path.clone(),
                action: Action::Delete,
                from: Some(from_id.clone()),
                to: None,
            }),
            Some(to_id) if to_id != from_id => changes.push(Change {
                path: path.clone(),
                action: Action::Modify,
                from: Some(from_id.clone()),
                to: Some(to_id.clone()),
            }),
            Some(_) => {}
        }
    }

    for (path, to_id) in &to_map {
        if !from_map.contains_key(path) {
            changes.push(Change {
                path: path.clone(),
                action: Action::Insert,
                from: None,
                to: Some(to_id.clone()),
            });
        }
    }

    changes.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(changes)
}

/// Flatten a tree source into an ordered `path → blob id` view.
///
/// Index snapshots use the `Merged` entry per path, falling back to the
/// `Ours` entry for conflicted paths, the same slot a virtual ancestor's
/// blobs are read from.
fn flatten<S: Store>(
    store: &S,
    source: &TreeSource,
) -> Result<BTreeMap<String, ObjectId>, MergeError> {
    match source {
        TreeSource::Tree(id) => {
            let tree = store.tree(id)?;
            Ok(tree
                .entries()
                .iter()
                .map(|e| (e.path.clone(), e.id.clone()))
                .collect())
        }
        TreeSource::Snapshot(index) => {
            let mut map = BTreeMap::new();
            for entry in index.entries() {
                match entry.stage {
                    Stage::Merged => {
                        map.insert(entry.path.clone(), entry.id.clone());
                    }
                    Stage::Ours => {
                        map.entry(entry.path.clone()).or_insert_with(|| entry.id.clone());
                    }
                    Stage::Ancestor | Stage::Theirs => {}
                }
            }
            Ok(map)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::index::IndexEntry;
    use crate::model::object::{Tree, TreeEntry};
    use crate::model::types::FileMode;
    use crate::store::memory::MemoryStore;

    fn oid(c: char) -> ObjectId {
        ObjectId::new(&c.to_string().repeat(40)).unwrap()
    }

    fn put_tree(store: &mut MemoryStore, entries: &[(&str, char)]) -> ObjectId {
        let tree = Tree::from_entries(
            entries
                .iter()
                .map(|(path, c)| TreeEntry {
                    path: (*path).to_owned(),
                    id: oid(*c),
                    mode: FileMode::Regular,
                })
                .collect(),
        );
        store.put_tree(tree).unwrap()
    }

    #[test]
    fn identical_trees_produce_no_changes() {
        let mut store = MemoryStore::new();
        let t = put_tree(&mut store, &[("a.txt", '1'), ("b.txt", '2')]);
        let changes =
            tree_diff(&store, &TreeSource::Tree(t.clone()), &TreeSource::Tree(t)).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn insert_delete_modify_are_classified() {
        let mut store = MemoryStore::new();
        let from = put_tree(&mut store, &[("dropped", '1'), ("changed", '2'), ("kept", '3')]);
        let to = put_tree(&mut store, &[("changed", '4'), ("kept", '3'), ("new", '5')]);

        let changes =
            tree_diff(&store, &TreeSource::Tree(from), &TreeSource::Tree(to)).unwrap();

        let summary: Vec<(&str, Action)> = changes
            .iter()
            .map(|c| (c.path.as_str(), c.action))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("changed", Action::Modify),
                ("dropped", Action::Delete),
                ("new", Action::Insert),
            ]
        );

        let modify = &changes[0];
        assert_eq!(modify.from, Some(oid('2')));
        assert_eq!(modify.to, Some(oid('4')));
    }

    #[test]
    fn changes_are_sorted_by_path() {
        let mut store = MemoryStore::new();
        let from = put_tree(&mut store, &[]);
        let to = put_tree(&mut store, &[("z", '1'), ("a", '2'), ("m", '3')]);

        let changes = tree_diff(&store, &TreeSource::Tree(from), &TreeSource::Tree(to)).unwrap();
        let paths: Vec<_> = changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "m", "z"]);
    }

    #[test]
    fn snapshot_uses_merged_entries() {
        let mut store = MemoryStore::new();
        let empty = put_tree(&mut store, &[]);

        let mut index = Index::new();
        index.add(IndexEntry::merged("a.txt", oid('1')));

        let changes = tree_diff(
            &store,
            &TreeSource::Tree(empty),
            &TreeSource::Snapshot(index),
        )
        .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, Action::Insert);
        assert_eq!(changes[0].to, Some(oid('1')));
    }

    #[test]
    fn snapshot_conflicted_path_reads_ours_stage() {
        let mut store = MemoryStore::new();
        let empty = put_tree(&mut store, &[]);

        let mut index = Index::new();
        index.add_conflict_entries("hot.txt", &oid('a'), &oid('b'), &oid('c'));

        let changes = tree_diff(
            &store,
            &TreeSource::Tree(empty),
            &TreeSource::Snapshot(index),
        )
        .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].to, Some(oid('b')), "ours stage wins for conflicts");
    }

    #[test]
    fn missing_tree_errors() {
        let store = MemoryStore::new();
        let err = tree_diff(
            &store,
            &TreeSource::Tree(oid('f')),
            &TreeSource::Snapshot(Index::new()),
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::ObjectNotFound { .. }));
    }
}
