//! Object records: trees and commits.
//!
//! Trees are flat, sorted manifests mapping repository-relative paths to
//! blob ids, the content-addressed snapshot of a whole working tree.
//! Commits bind a tree to its parents and signatures. Both have a canonical
//! text encoding that feeds the content hash, so identical snapshots always
//! share an id.

use serde::{Deserialize, Serialize};

use super::index::Index;
use super::types::{FileMode, ObjectId, Signature, Stage};

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// One tree record: a path bound to blob content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Repository-relative path, `/`-separated.
    pub path: String,
    /// Blob id of the content.
    pub id: ObjectId,
    /// File mode.
    pub mode: FileMode,
}

/// A snapshot manifest: the full set of paths in a committed working tree,
/// sorted by path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from entries; entries are sorted by path and later
    /// duplicates win.
    #[must_use]
    pub fn from_entries(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries.dedup_by(|later, earlier| {
            if later.path == earlier.path {
                std::mem::swap(later, earlier);
                true
            } else {
                false
            }
        });
        Self { entries }
    }

    /// Build a tree from a fully merged index.
    ///
    /// Conflict-stage entries are ignored; callers that must refuse
    /// unresolved indexes check [`Index::is_fully_merged`] first.
    #[must_use]
    pub fn from_index(index: &Index) -> Self {
        let entries = index
            .entries()
            .iter()
            .filter(|e| e.stage == Stage::Merged)
            .map(|e| TreeEntry {
                path: e.path.clone(),
                id: e.id.clone(),
                mode: e.mode,
            })
            .collect();
        Self::from_entries(entries)
    }

    /// All entries, sorted by path.
    #[must_use]
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Look up the entry for `path`.
    #[must_use]
    pub fn entry(&self, path: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Returns `true` if the tree holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical text encoding used for content addressing.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"tree\0");
        for entry in &self.entries {
            out.extend_from_slice(entry.mode.octal().as_bytes());
            out.push(b' ');
            out.extend_from_slice(entry.id.as_str().as_bytes());
            out.push(b' ');
            out.extend_from_slice(entry.path.as_bytes());
            out.push(b'\n');
        }
        out
    }

    /// Content id of this tree.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        ObjectId::for_bytes(&self.encode())
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// A commit: a tree snapshot with parent links and signatures.
///
/// `author.time` is the priority key for the merge-base walker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Root tree id.
    pub tree: ObjectId,
    /// Parent commit ids, first parent first.
    pub parents: Vec<ObjectId>,
    /// Author identity and authored timestamp.
    pub author: Signature,
    /// Committer identity and commit timestamp.
    pub committer: Signature,
    /// Commit message.
    pub message: String,
}

impl Commit {
    /// Canonical text encoding used for content addressing.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"commit\0");
        out.extend_from_slice(format!("tree {}\n", self.tree).as_bytes());
        for parent in &self.parents {
            out.extend_from_slice(format!("parent {parent}\n").as_bytes());
        }
        out.extend_from_slice(format!("author {}\n", self.author).as_bytes());
        out.extend_from_slice(format!("committer {}\n", self.committer).as_bytes());
        out.push(b'\n');
        out.extend_from_slice(self.message.as_bytes());
        out
    }

    /// Content id of this commit.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        ObjectId::for_bytes(&self.encode())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::index::IndexEntry;

    fn oid(c: char) -> ObjectId {
        ObjectId::new(&c.to_string().repeat(40)).unwrap()
    }

    fn sig(time: i64) -> Signature {
        Signature::new("Test", "test@example.com", time)
    }

    #[test]
    fn tree_from_entries_sorts_and_dedups() {
        let tree = Tree::from_entries(vec![
            TreeEntry {
                path: "b.txt".into(),
                id: oid('2'),
                mode: FileMode::Regular,
            },
            TreeEntry {
                path: "a.txt".into(),
                id: oid('1'),
                mode: FileMode::Regular,
            },
            TreeEntry {
                path: "a.txt".into(),
                id: oid('3'),
                mode: FileMode::Regular,
            },
        ]);
        let paths: Vec<_> = tree.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
        // later duplicate wins
        assert_eq!(tree.entry("a.txt").unwrap().id, oid('3'));
    }

    #[test]
    fn tree_entry_lookup() {
        let tree = Tree::from_entries(vec![TreeEntry {
            path: "src/lib.rs".into(),
            id: oid('a'),
            mode: FileMode::Regular,
        }]);
        assert!(tree.entry("src/lib.rs").is_some());
        assert!(tree.entry("missing").is_none());
    }

    #[test]
    fn tree_id_is_content_addressed() {
        let a = Tree::from_entries(vec![TreeEntry {
            path: "f".into(),
            id: oid('1'),
            mode: FileMode::Regular,
        }]);
        let b = Tree::from_entries(vec![TreeEntry {
            path: "f".into(),
            id: oid('1'),
            mode: FileMode::Regular,
        }]);
        assert_eq!(a.id(), b.id());

        let c = Tree::from_entries(vec![TreeEntry {
            path: "f".into(),
            id: oid('2'),
            mode: FileMode::Regular,
        }]);
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn empty_tree_has_stable_id() {
        assert_eq!(Tree::new().id(), Tree::default().id());
        assert!(Tree::new().is_empty());
    }

    #[test]
    fn tree_from_index_skips_conflict_stages() {
        let mut idx = Index::new();
        idx.add(IndexEntry::merged("clean.txt", oid('1')));
        idx.add_conflict_entries("hot.txt", &oid('a'), &oid('b'), &oid('c'));

        let tree = Tree::from_index(&idx);
        assert_eq!(tree.entries().len(), 1);
        assert_eq!(tree.entries()[0].path, "clean.txt");
    }

    #[test]
    fn commit_id_depends_on_contents() {
        let base = Commit {
            tree: oid('e'),
            parents: vec![oid('1')],
            author: sig(100),
            committer: sig(100),
            message: "one".into(),
        };
        let mut other = base.clone();
        assert_eq!(base.id(), other.id());

        other.message = "two".into();
        assert_ne!(base.id(), other.id());

        let mut reparented = base.clone();
        reparented.parents = vec![oid('2')];
        assert_ne!(base.id(), reparented.id());
    }

    #[test]
    fn commit_encode_lists_parents_in_order() {
        let commit = Commit {
            tree: oid('e'),
            parents: vec![oid('1'), oid('2')],
            author: sig(1),
            committer: sig(2),
            message: "merge".into(),
        };
        let text = String::from_utf8_lossy(&commit.encode()).into_owned();
        let first = text.find(&format!("parent {}", oid('1'))).unwrap();
        let second = text.find(&format!("parent {}", oid('2'))).unwrap();
        assert!(first < second);
    }
}
