//! The worktree facade: index/working-tree plumbing shared by the merge
//! orchestrator and commit finalization.
//!
//! A [`Worktree`] owns its storage and work-filesystem collaborators plus
//! the transient per-merge blob cache. The merge driver and commit
//! finalization live in sibling modules; this one carries the shared
//! plumbing: resolving refs, staging and unstaging files, hard resets, and
//! the uncommitted-change guard.

mod commit;
mod merge;

pub use commit::CommitOptions;

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};

use crate::error::MergeError;
use crate::model::index::{Index, IndexEntry};
use crate::model::object::Tree;
use crate::model::types::{BranchName, FileMode, ObjectId, Stage};
use crate::store::{Store, WorkFs};

/// Transient `path → (stage, blob)` cache built during a merge and consulted
/// by [`Worktree::read_file_by_stage`]. Lives from merge start until abort
/// or the next commit.
pub(crate) type BlobCache = BTreeMap<String, Vec<(Stage, ObjectId)>>;

// ---------------------------------------------------------------------------
// Worktree
// ---------------------------------------------------------------------------

/// A checked-out working tree bound to a store.
pub struct Worktree<S: Store, F: WorkFs> {
    pub(crate) store: S,
    pub(crate) fs: F,
    pub(crate) blobs: BlobCache,
}

impl<S: Store, F: WorkFs> Worktree<S, F> {
    /// Create a worktree over the given collaborators.
    pub fn new(store: S, fs: F) -> Self {
        Self {
            store,
            fs,
            blobs: BlobCache::new(),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The underlying store, mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The underlying work filesystem.
    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// The current index.
    ///
    /// # Errors
    /// Returns storage failures.
    pub fn index(&self) -> Result<Index, MergeError> {
        self.store.index()
    }

    /// Resolve `HEAD` to a commit id, or `None` on an unborn branch.
    ///
    /// # Errors
    /// Returns storage failures.
    pub fn head(&self) -> Result<Option<ObjectId>, MergeError> {
        let branch = self.store.head_branch()?;
        self.store.reference(branch.as_str())
    }

    /// Resolve a branch name to its commit id.
    ///
    /// # Errors
    /// [`MergeError::BranchNotFound`] if the branch is unset.
    pub fn resolve_branch(&self, branch: &BranchName) -> Result<ObjectId, MergeError> {
        self.store
            .reference(branch.as_str())?
            .ok_or_else(|| MergeError::BranchNotFound {
                name: branch.to_string(),
            })
    }

    /// Point the branch `HEAD` is on at `id`.
    ///
    /// # Errors
    /// Returns storage failures.
    pub fn update_head(&mut self, id: &ObjectId) -> Result<(), MergeError> {
        let branch = self.store.head_branch()?;
        self.store.set_reference(branch.as_str(), id.clone())
    }

    /// Hash a worktree file into the store and stage it at
    /// [`Stage::Merged`], replacing any conflict entries for the path.
    ///
    /// # Errors
    /// [`MergeError::EntryNotFound`] if the file is missing.
    pub fn add(&mut self, path: &str) -> Result<(), MergeError> {
        let data = self.fs.read_all(path).map_err(|e| not_found_as_entry(e, path))?;
        let id = self.store.put_blob(data)?;
        let mut index = self.store.index()?;
        index.set_merged(path, id, FileMode::Regular);
        self.store.set_index(index)
    }

    /// Remove a file from the worktree and every index entry for it.
    ///
    /// # Errors
    /// [`MergeError::EntryNotFound`] if the file is missing.
    pub fn remove(&mut self, path: &str) -> Result<(), MergeError> {
        self.fs.remove(path).map_err(|e| not_found_as_entry(e, path))?;
        let mut index = self.store.index()?;
        index.remove_path(path);
        self.store.set_index(index)
    }

    /// Hard reset: make the index and the working tree exactly match the
    /// given commit's tree.
    ///
    /// # Errors
    /// Returns storage or I/O failures.
    pub fn reset_hard(&mut self, commit_id: &ObjectId) -> Result<(), MergeError> {
        let commit = self.store.commit(commit_id)?;
        let tree = self.store.tree(&commit.tree)?;

        self.set_index_from_tree(&tree)?;

        for entry in tree.entries() {
            let data = self.store.blob(&entry.id)?;
            self.fs.write_file(&entry.path, &data)?;
        }
        for path in self.fs.paths()? {
            if tree.entry(&path).is_none() {
                self.fs.remove(&path)?;
            }
        }
        Ok(())
    }

    /// Reset only the index to the given tree, leaving the worktree alone.
    ///
    /// # Errors
    /// Returns storage failures.
    pub fn reset_index_to_tree(&mut self, tree_id: &ObjectId) -> Result<(), MergeError> {
        let tree = self.store.tree(tree_id)?;
        self.set_index_from_tree(&tree)
    }

    fn set_index_from_tree(&mut self, tree: &Tree) -> Result<(), MergeError> {
        let mut index = Index::new();
        for entry in tree.entries() {
            index.add(IndexEntry {
                path: entry.path.clone(),
                id: entry.id.clone(),
                mode: entry.mode,
                stage: Stage::Merged,
            });
        }
        self.store.set_index(index)
    }

    /// Entries from the index with stages other than [`Stage::Merged`],
    /// grouped by path.
    ///
    /// # Errors
    /// Returns storage failures.
    pub fn conflict_entries(&self) -> Result<BTreeMap<String, Vec<IndexEntry>>, MergeError> {
        Ok(self.store.index()?.unmerged())
    }

    /// Read a file's content for the given stage.
    ///
    /// [`Stage::Merged`] reads the worktree file; the conflict stages read
    /// the blobs cached during the merge.
    ///
    /// # Errors
    /// [`MergeError::EntryNotFound`] if no content exists for the stage.
    pub fn read_file_by_stage(
        &self,
        path: &str,
        stage: Stage,
    ) -> Result<Box<dyn Read>, MergeError> {
        if stage == Stage::Merged {
            return self
                .fs
                .open(path)
                .map_err(|e| not_found_as_entry(e, path));
        }

        let cached = self
            .blobs
            .get(path)
            .ok_or_else(|| MergeError::EntryNotFound {
                path: path.to_owned(),
            })?;
        let id = cached
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, id)| id.clone())
            .ok_or_else(|| MergeError::EntryNotFound {
                path: path.to_owned(),
            })?;

        let data = self.store.blob(&id)?;
        Ok(Box::new(Cursor::new(data)))
    }

    /// The `MERGE_MSG` content with `#`-prefixed comment lines stripped.
    ///
    /// # Errors
    /// Returns storage failures.
    pub fn merge_message(&self) -> Result<String, MergeError> {
        let raw = self.store.merge_msg()?.unwrap_or_default();
        let stripped: Vec<&str> = raw
            .lines()
            .filter(|line| !line.starts_with('#'))
            .collect();
        Ok(stripped.join("\n").trim_end().to_owned())
    }

    /// The raw `MERGE_MSG` content, comment lines included.
    ///
    /// # Errors
    /// Returns storage failures.
    pub fn merge_message_file_content(&self) -> Result<String, MergeError> {
        Ok(self.store.merge_msg()?.unwrap_or_default())
    }

    // -----------------------------------------------------------------------
    // Internal plumbing
    // -----------------------------------------------------------------------

    /// Record a blob in the per-merge cache, replacing any previous blob at
    /// the same `(path, stage)`.
    pub(crate) fn cache_blob(&mut self, path: &str, stage: Stage, id: ObjectId) {
        let stages = self.blobs.entry(path.to_owned()).or_default();
        if let Some(slot) = stages.iter_mut().find(|(s, _)| *s == stage) {
            slot.1 = id;
        } else {
            stages.push((stage, id));
        }
    }

    /// Any staged change (HEAD tree vs index), or any unstaged non-delete
    /// change (index vs worktree, untracked files included)?
    pub(crate) fn has_uncommitted_changes(&self, head: &ObjectId) -> Result<bool, MergeError> {
        use crate::store::diff::{tree_diff, TreeSource};

        let commit = self.store.commit(head)?;
        let index = self.store.index()?;

        let staged = tree_diff(
            &self.store,
            &TreeSource::Tree(commit.tree),
            &TreeSource::Snapshot(index.clone()),
        )?;
        if !staged.is_empty() {
            return Ok(true);
        }

        for entry in index.entries() {
            match self.fs.read_all(&entry.path) {
                Ok(data) => {
                    if ObjectId::for_blob(&data) != entry.id {
                        return Ok(true);
                    }
                }
                // Deletions are excluded from the guard.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        for path in self.fs.paths()? {
            if index.entries_for(&path).is_empty() {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Write a blob's content to the worktree without staging it.
    pub(crate) fn checkout_blob(&mut self, path: &str, id: &ObjectId) -> Result<(), MergeError> {
        let data = self.store.blob(id)?;
        self.fs.write_file(path, &data)?;
        Ok(())
    }
}

fn not_found_as_entry(err: io::Error, path: &str) -> MergeError {
    if err.kind() == io::ErrorKind::NotFound {
        MergeError::EntryNotFound {
            path: path.to_owned(),
        }
    } else {
        MergeError::Io(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
