//! The multi-stage index: a flat collection of entries keyed by `(path, stage)`.
//!
//! The index is the staging area between the working tree and the next
//! commit. During a merge it also records unresolved conflicts: a path has
//! either exactly one [`Stage::Merged`] entry, or one-to-three entries at
//! stages `{Ancestor, Ours, Theirs}` and no `Merged` entry.
//!
//! Rather than spreading conflict state across several collections, the
//! index is a single `Vec<IndexEntry>` kept sorted by `(path, stage)` with
//! query helpers on top. Resolving a path is simply erasing all of its
//! entries and appending one `Merged` entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{FileMode, ObjectId, Stage};

// ---------------------------------------------------------------------------
// IndexEntry
// ---------------------------------------------------------------------------

/// One index record: a path bound to blob content at a given stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Repository-relative path, `/`-separated.
    pub path: String,
    /// Blob id of the content.
    pub id: ObjectId,
    /// File mode.
    pub mode: FileMode,
    /// Stage tag; anything other than [`Stage::Merged`] marks a conflict.
    pub stage: Stage,
}

impl IndexEntry {
    /// Create a regular-file entry at [`Stage::Merged`].
    #[must_use]
    pub fn merged(path: impl Into<String>, id: ObjectId) -> Self {
        Self {
            path: path.into(),
            id,
            mode: FileMode::Regular,
            stage: Stage::Merged,
        }
    }

    /// Create a regular-file entry at the given stage.
    #[must_use]
    pub fn staged(path: impl Into<String>, id: ObjectId, stage: Stage) -> Self {
        Self {
            path: path.into(),
            id,
            mode: FileMode::Regular,
            stage,
        }
    }
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// The staging area, including in-conflict multi-stage entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    entries: Vec<IndexEntry>,
}

impl Index {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, sorted by `(path, stage)`.
    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Number of entries (counting each stage separately).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the index holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries for `path`, at any stage.
    #[must_use]
    pub fn entries_for(&self, path: &str) -> Vec<&IndexEntry> {
        self.entries.iter().filter(|e| e.path == path).collect()
    }

    /// The entry for `path` at `stage`, if present.
    #[must_use]
    pub fn entry(&self, path: &str, stage: Stage) -> Option<&IndexEntry> {
        self.entries
            .iter()
            .find(|e| e.path == path && e.stage == stage)
    }

    /// Insert an entry, replacing any existing entry at the same
    /// `(path, stage)` key.
    pub fn add(&mut self, entry: IndexEntry) {
        self.entries
            .retain(|e| !(e.path == entry.path && e.stage == entry.stage));
        self.entries.push(entry);
        self.sort();
    }

    /// Remove every entry for `path`, at any stage.
    pub fn remove_path(&mut self, path: &str) {
        self.entries.retain(|e| e.path != path);
    }

    /// Resolve `path` to merged content: erase all of its entries and
    /// record a single [`Stage::Merged`] entry.
    pub fn set_merged(&mut self, path: &str, id: ObjectId, mode: FileMode) {
        self.remove_path(path);
        self.entries.push(IndexEntry {
            path: path.to_owned(),
            id,
            mode,
            stage: Stage::Merged,
        });
        self.sort();
    }

    /// Record an unresolved conflict for `path`.
    ///
    /// Replaces all existing entries for the path with one entry per
    /// non-placeholder slot: `(ancestor, ours, theirs)` at stages 1/2/3.
    /// Zero-hash slots are skipped, so an add/add conflict stages exactly
    /// `{Ours, Theirs}` and a modify/delete stages `{Ancestor, Ours}`.
    pub fn add_conflict_entries(
        &mut self,
        path: &str,
        ancestor: &ObjectId,
        ours: &ObjectId,
        theirs: &ObjectId,
    ) {
        self.remove_path(path);
        for (id, stage) in [
            (ancestor, Stage::Ancestor),
            (ours, Stage::Ours),
            (theirs, Stage::Theirs),
        ] {
            if !id.is_zero() {
                self.entries.push(IndexEntry {
                    path: path.to_owned(),
                    id: id.clone(),
                    mode: FileMode::Regular,
                    stage,
                });
            }
        }
        self.sort();
    }

    /// Paths with entries at a stage other than [`Stage::Merged`], each with
    /// its conflict entries.
    #[must_use]
    pub fn unmerged(&self) -> BTreeMap<String, Vec<IndexEntry>> {
        let mut out: BTreeMap<String, Vec<IndexEntry>> = BTreeMap::new();
        for entry in &self.entries {
            if entry.stage != Stage::Merged {
                out.entry(entry.path.clone()).or_default().push(entry.clone());
            }
        }
        out
    }

    /// Returns `true` if no entry is in conflict.
    #[must_use]
    pub fn is_fully_merged(&self) -> bool {
        self.entries.iter().all(|e| e.stage == Stage::Merged)
    }

    fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| a.path.cmp(&b.path).then(a.stage.cmp(&b.stage)));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
