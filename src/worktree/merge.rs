//! The merge orchestrator.
//!
//! Drives a full branch merge: fast-forward check, in-progress and
//! uncommitted-change guards, merge-base discovery (synthesizing a virtual
//! ancestor when history is criss-crossed), diff-of-diffs classification of
//! every touched path, per-path resolution (three-way file merge, conflict
//! markers, or one-sided propagation), multi-stage index bookkeeping, and
//! the `MERGE_HEAD` / `ORIG_HEAD` / `MERGE_MSG` lifecycle, including abort.
//!
//! Ordering guarantees: common ancestors are computed (read-only) before
//! any marker is written, so a refused merge leaves no state behind;
//! `MERGE_HEAD` and `ORIG_HEAD` are both written before the index or
//! worktree is touched, virtual-ancestor synthesis included.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::debug;

use crate::error::MergeError;
use crate::merge::bases::{common_ancestors, is_ancestor};
use crate::merge::file_merge::{merge_blobs, write_conflict_file};
use crate::merge::message::summarize;
use crate::merge::{MergeOutcome, MergeStatus, MergingResult, StatusCode};
use crate::merge::{DiffType, MSG_MERGE_IN_PROGRESS, MSG_UNCOMMITTED_CHANGES};
use crate::model::index::Index;
use crate::model::object::Commit;
use crate::model::types::{BranchName, ObjectId, Stage};
use crate::store::diff::{tree_diff, Action, Change, TreeSource};
use crate::store::{Store, WorkFs, MERGE_HEAD, ORIG_HEAD};
use crate::worktree::Worktree;

/// Maximum virtual-ancestor recursion depth. Past this, the oldest merge
/// base is used directly instead of synthesizing further.
const MAX_VIRTUAL_DEPTH: usize = 8;

// ---------------------------------------------------------------------------
// MergingCommit
// ---------------------------------------------------------------------------

/// One side (or base) of a merge in progress.
///
/// A real merging commit is just a commit; a virtual one additionally
/// carries an index snapshot standing in for its nonexistent tree.
#[derive(Clone, Debug)]
struct MergingCommit {
    id: ObjectId,
    commit: Commit,
    index: Option<Index>,
    is_virtual: bool,
}

impl MergingCommit {
    /// The tree-diff source for this side: the index snapshot for a
    /// virtual ancestor, the commit tree otherwise.
    fn tree_source(&self) -> TreeSource {
        match (&self.index, self.is_virtual) {
            (Some(index), true) => TreeSource::Snapshot(index.clone()),
            _ => TreeSource::Tree(self.commit.tree.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Merge orchestration
// ---------------------------------------------------------------------------

impl<S: Store, F: WorkFs> Worktree<S, F> {
    /// Merge the named branch into `HEAD`.
    ///
    /// Returns the outcome status with its display message. Refusals
    /// (`InProgress`, `UncommittedChanges`, `NoCommonAncestor`) leave the
    /// index, worktree, and references untouched.
    ///
    /// # Errors
    /// Returns collaborator failures: unresolved `HEAD`, unknown branch,
    /// unreadable objects, or I/O errors.
    pub fn merge(&mut self, branch: &BranchName) -> Result<MergeOutcome, MergeError> {
        let ours = self.head()?.ok_or(MergeError::HeadNotFound)?;
        let theirs = self.resolve_branch(branch)?;

        debug!(ours = %ours.short(), theirs = %theirs.short(), branch = %branch, "merge requested");

        if is_ancestor(&self.store, &ours, &theirs)? {
            self.update_head(&theirs)?;
            self.reset_hard(&theirs)?;
            return Ok(MergeOutcome::new(
                MergeStatus::FastForwarded,
                format!("Fast-forward\nHEAD is now at {}", theirs.short()),
            ));
        }

        self.non_fast_forward_merge(&ours, &theirs, branch)
    }

    /// Abort an in-progress merge and reconstruct the pre-merge state:
    /// remove `MERGE_HEAD` and `MERGE_MSG`, hard-reset to `ORIG_HEAD`,
    /// remove `ORIG_HEAD`, and drop the blob cache.
    ///
    /// # Errors
    /// [`MergeError::RefNotFound`] if `ORIG_HEAD` is absent (no merge to
    /// abort), or collaborator failures.
    pub fn abort_merge(&mut self) -> Result<(), MergeError> {
        if self.store.reference(MERGE_HEAD)?.is_some() {
            self.store.remove_reference(MERGE_HEAD)?;
        }
        self.store.remove_merge_msg()?;

        let orig = self
            .store
            .reference(ORIG_HEAD)?
            .ok_or_else(|| MergeError::RefNotFound {
                name: ORIG_HEAD.to_owned(),
            })?;

        self.reset_hard(&orig)?;
        self.store.remove_reference(ORIG_HEAD)?;
        self.blobs.clear();
        Ok(())
    }

    fn non_fast_forward_merge(
        &mut self,
        ours: &ObjectId,
        theirs: &ObjectId,
        branch: &BranchName,
    ) -> Result<MergeOutcome, MergeError> {
        if self.store.reference(MERGE_HEAD)?.is_some() {
            return Ok(MergeOutcome::new(
                MergeStatus::InProgress,
                MSG_MERGE_IN_PROGRESS,
            ));
        }

        if self.has_uncommitted_changes(ours)? {
            return Ok(MergeOutcome::new(
                MergeStatus::UncommittedChanges,
                MSG_UNCOMMITTED_CHANGES,
            ));
        }

        // Read-only: a missing ancestor refuses the merge before anything
        // is written.
        let bases = common_ancestors(&self.store, ours, theirs)?;
        if bases.is_empty() {
            return Ok(MergeOutcome::new(
                MergeStatus::NoCommonAncestor,
                format!(
                    "fatal: no common parent for {} and {}",
                    ours.short(),
                    theirs.short()
                ),
            ));
        }

        // Both markers land before the index or worktree is mutated.
        self.store.set_reference(MERGE_HEAD, theirs.clone())?;
        self.store.set_reference(ORIG_HEAD, ours.clone())?;
        self.blobs.clear();

        let base = self.parent_from_bases(bases, 1)?;
        let ours_mc = self.merging_commit(ours)?;
        let theirs_mc = self.merging_commit(theirs)?;

        let (_, results) = self.merge_commits(Some(base), &ours_mc, &theirs_mc, 0)?;

        let summary = summarize(&results, branch);
        self.store.set_merge_msg(summary.merge_msg)?;

        debug!(
            paths = results.len(),
            conflicted = summary.has_conflicts,
            "merge classified"
        );

        if summary.has_conflicts {
            Ok(MergeOutcome::new(MergeStatus::Conflicted, summary.console))
        } else {
            Ok(MergeOutcome::new(MergeStatus::CommitNeeded, summary.console))
        }
    }

    // -----------------------------------------------------------------------
    // Merge base / virtual ancestor
    // -----------------------------------------------------------------------

    fn merging_commit(&self, id: &ObjectId) -> Result<MergingCommit, MergeError> {
        Ok(MergingCommit {
            id: id.clone(),
            commit: self.store.commit(id)?,
            index: None,
            is_virtual: false,
        })
    }

    fn compute_parent(
        &mut self,
        one: &ObjectId,
        two: &ObjectId,
        level: usize,
    ) -> Result<MergingCommit, MergeError> {
        let bases = common_ancestors(&self.store, one, two)?;
        if bases.is_empty() {
            return Err(MergeError::NoCommonParent {
                one: one.clone(),
                two: two.clone(),
            });
        }
        self.parent_from_bases(bases, level)
    }

    fn parent_from_bases(
        &mut self,
        bases: Vec<ObjectId>,
        level: usize,
    ) -> Result<MergingCommit, MergeError> {
        if bases.len() == 1 {
            return self.merging_commit(&bases[0]);
        }

        if level > MAX_VIRTUAL_DEPTH {
            return self.merging_commit(&self.oldest_of(&bases)?);
        }

        self.create_virtual_parent(&bases, level)
    }

    fn oldest_of(&self, bases: &[ObjectId]) -> Result<ObjectId, MergeError> {
        let mut oldest = bases[0].clone();
        let mut oldest_time = self.store.commit(&oldest)?.author.time;
        for id in &bases[1..] {
            let time = self.store.commit(id)?.author.time;
            if time < oldest_time {
                oldest = id.clone();
                oldest_time = time;
            }
        }
        Ok(oldest)
    }

    /// Fold multiple merge bases into one synthetic ancestor by recursively
    /// merging them. Conflicts inside the fold do not propagate outward;
    /// the (possibly conflicted) index snapshot still acts as the common
    /// ancestor's tree.
    fn create_virtual_parent(
        &mut self,
        bases: &[ObjectId],
        level: usize,
    ) -> Result<MergingCommit, MergeError> {
        debug!(bases = bases.len(), level, "synthesizing virtual ancestor");

        let mut level = level;
        let mut base = self.merging_commit(&bases[0])?;

        for other_id in &bases[1..] {
            level += 1;
            let other = self.merging_commit(other_id)?;
            let (new_base, _) = self.merge_commits(None, &base, &other, level)?;
            base = new_base;
        }

        base.is_virtual = true;
        base.index = Some(self.store.index()?);
        Ok(base)
    }

    // -----------------------------------------------------------------------
    // Core merge of two sides against a base
    // -----------------------------------------------------------------------

    /// Merge `ours` and `theirs` against `base` (computing the base when
    /// `None`), mutating the index and worktree. The index is first reset
    /// to ours' tree so the merge starts identical to ours.
    fn merge_commits(
        &mut self,
        base: Option<MergingCommit>,
        ours: &MergingCommit,
        theirs: &MergingCommit,
        level: usize,
    ) -> Result<(MergingCommit, BTreeMap<String, MergingResult>), MergeError> {
        let base = match base {
            Some(base) => base,
            None => self.compute_parent(&ours.id, &theirs.id, level + 1)?,
        };

        match (&ours.index, ours.is_virtual) {
            (Some(index), true) => self.store.set_index(index.clone())?,
            _ => self.reset_index_to_tree(&ours.commit.tree)?,
        }

        let d1 = tree_diff(&self.store, &base.tree_source(), &ours.tree_source())?;
        let d2 = tree_diff(&self.store, &base.tree_source(), &theirs.tree_source())?;

        let results = self.classify_changes(&base, ours, theirs, &d1, &d2)?;
        Ok((base, results))
    }

    /// Pair the two sides' changes by path and resolve each pairing.
    fn classify_changes(
        &mut self,
        base: &MergingCommit,
        ours: &MergingCommit,
        theirs: &MergingCommit,
        d1: &[Change],
        d2: &[Change],
    ) -> Result<BTreeMap<String, MergingResult>, MergeError> {
        let ours_statuses = statuses_of(d1);
        let theirs_statuses = statuses_of(d2);

        let mut results = BTreeMap::new();

        for (path, &s1) in &ours_statuses {
            let Some(&s2) = theirs_statuses.get(path) else {
                // Ours-only change: the index already mirrors ours.
                results.insert(
                    path.clone(),
                    MergingResult {
                        ours_status: Some(s1),
                        theirs_status: None,
                        diff_type: DiffType::NoConflict,
                    },
                );
                continue;
            };

            let diff_type = match (s1, s2) {
                (StatusCode::Modified, StatusCode::Modified) => {
                    self.merge_both_modified(path, base, ours, theirs)?
                }
                (StatusCode::Added, StatusCode::Added) => {
                    self.merge_both_added(path, ours, theirs)?
                }
                (StatusCode::Deleted, StatusCode::Deleted) => DiffType::BothDeleted,
                (StatusCode::Modified, StatusCode::Deleted) => {
                    self.merge_modified_deleted(path, base, ours)?
                }
                (StatusCode::Deleted, StatusCode::Modified) => {
                    self.merge_deleted_modified(path, base, theirs)?
                }
                // A path absent in base cannot be modified or deleted on
                // the other side; whatever remains is one-sided in effect.
                _ => DiffType::NoConflict,
            };

            results.insert(
                path.clone(),
                MergingResult {
                    ours_status: Some(s1),
                    theirs_status: Some(s2),
                    diff_type,
                },
            );
        }

        for (path, &s2) in &theirs_statuses {
            if ours_statuses.contains_key(path) {
                continue;
            }

            match s2 {
                // Theirs-only modification of a base-absent path cannot
                // happen; handled as an add for safety.
                StatusCode::Added | StatusCode::Modified => {
                    let id = self.blob_of(theirs, path)?;
                    self.checkout_blob(path, &id)?;
                    self.add(path)?;
                }
                StatusCode::Deleted => {
                    // During virtual-ancestor folds the worktree tracks the
                    // outer ours, so the file may already be gone.
                    match self.remove(path) {
                        Ok(()) | Err(MergeError::EntryNotFound { .. }) => {}
                        Err(err) => return Err(err),
                    }
                }
            }

            results.insert(
                path.clone(),
                MergingResult {
                    ours_status: None,
                    theirs_status: Some(s2),
                    diff_type: DiffType::NoConflict,
                },
            );
        }

        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Per-pairing resolution
    // -----------------------------------------------------------------------

    fn merge_both_modified(
        &mut self,
        path: &str,
        base: &MergingCommit,
        ours: &MergingCommit,
        theirs: &MergingCommit,
    ) -> Result<DiffType, MergeError> {
        let base_id = self.blob_of(base, path)?;
        self.cache_blob(path, Stage::Ancestor, base_id.clone());
        let ours_id = self.blob_of(ours, path)?;
        self.cache_blob(path, Stage::Ours, ours_id.clone());
        let theirs_id = self.blob_of(theirs, path)?;
        self.cache_blob(path, Stage::Theirs, theirs_id.clone());

        let conflicts = self.merge_file(path, &base_id, &ours_id, &theirs_id)?;
        if conflicts == 0 {
            Ok(DiffType::BothModifiedNoConflict)
        } else {
            Ok(DiffType::BothModifiedWithConflicts)
        }
    }

    fn merge_both_added(
        &mut self,
        path: &str,
        ours: &MergingCommit,
        theirs: &MergingCommit,
    ) -> Result<DiffType, MergeError> {
        let ours_id = self.blob_of(ours, path)?;
        let theirs_id = self.blob_of(theirs, path)?;

        // Identical content added on both sides is a clean add; the index
        // already carries it from the reset to ours.
        if ours_id == theirs_id {
            return Ok(DiffType::NoConflict);
        }

        self.cache_blob(path, Stage::Ours, ours_id.clone());
        self.cache_blob(path, Stage::Theirs, theirs_id.clone());

        self.write_both_added_file(path, &ours_id, &theirs_id)?;
        self.stage_conflict(path, &ObjectId::zero(), &ours_id, &theirs_id)?;
        Ok(DiffType::BothAdded)
    }

    fn merge_modified_deleted(
        &mut self,
        path: &str,
        base: &MergingCommit,
        ours: &MergingCommit,
    ) -> Result<DiffType, MergeError> {
        let base_id = self.blob_of(base, path)?;
        self.cache_blob(path, Stage::Ancestor, base_id.clone());
        let ours_id = self.blob_of(ours, path)?;
        self.cache_blob(path, Stage::Ours, ours_id.clone());

        self.stage_conflict(path, &base_id, &ours_id, &ObjectId::zero())?;
        Ok(DiffType::ModifiedDeleted)
    }

    fn merge_deleted_modified(
        &mut self,
        path: &str,
        base: &MergingCommit,
        theirs: &MergingCommit,
    ) -> Result<DiffType, MergeError> {
        let base_id = self.blob_of(base, path)?;
        self.cache_blob(path, Stage::Ancestor, base_id.clone());
        let theirs_id = self.blob_of(theirs, path)?;
        self.cache_blob(path, Stage::Theirs, theirs_id.clone());

        // Theirs' content survives in the worktree; the index records the
        // conflict.
        self.checkout_blob(path, &theirs_id)?;
        self.stage_conflict(path, &base_id, &ObjectId::zero(), &theirs_id)?;
        Ok(DiffType::DeletedModified)
    }

    // -----------------------------------------------------------------------
    // File-level plumbing
    // -----------------------------------------------------------------------

    /// Three-way-merge one file into a temp buffer, atomically rename it
    /// over the path, and stage the result (merged entry on success,
    /// conflict entries otherwise). Returns the unresolved-hunk count.
    fn merge_file(
        &mut self,
        path: &str,
        base_id: &ObjectId,
        ours_id: &ObjectId,
        theirs_id: &ObjectId,
    ) -> Result<usize, MergeError> {
        let base = self.store.blob(base_id)?;
        let ours = self.store.blob(ours_id)?;
        let theirs = self.store.blob(theirs_id)?;

        let temp = temp_name();
        let mut sink = self.fs.create(&temp)?;
        let merged = merge_blobs(&base, &ours, &theirs, &mut sink);
        drop(sink);

        let conflicts = match merged {
            Ok(conflicts) => conflicts,
            Err(err) => {
                let _ = self.fs.remove(&temp);
                return Err(err.into());
            }
        };

        self.fs.rename(&temp, path)?;

        if conflicts == 0 {
            self.add(path)?;
        } else {
            self.stage_conflict(path, base_id, ours_id, theirs_id)?;
        }

        Ok(conflicts)
    }

    /// Write the add/add conflict file (whole-file markers) over `path`.
    fn write_both_added_file(
        &mut self,
        path: &str,
        ours_id: &ObjectId,
        theirs_id: &ObjectId,
    ) -> Result<(), MergeError> {
        let ours = self.store.blob(ours_id)?;
        let theirs = self.store.blob(theirs_id)?;

        let temp = temp_name();
        let mut sink = self.fs.create(&temp)?;
        let written = write_conflict_file(&ours, &theirs, &mut sink);
        drop(sink);

        if let Err(err) = written {
            let _ = self.fs.remove(&temp);
            return Err(err.into());
        }

        self.fs.rename(&temp, path)?;
        Ok(())
    }

    fn stage_conflict(
        &mut self,
        path: &str,
        ancestor: &ObjectId,
        ours: &ObjectId,
        theirs: &ObjectId,
    ) -> Result<(), MergeError> {
        let mut index = self.store.index()?;
        index.add_conflict_entries(path, ancestor, ours, theirs);
        self.store.set_index(index)
    }

    /// A side's blob for `path`. Virtual ancestors read their index
    /// snapshot (merged entry, else ours), falling back to the commit tree
    /// for paths the snapshot never saw.
    fn blob_of(&self, side: &MergingCommit, path: &str) -> Result<ObjectId, MergeError> {
        if side.is_virtual {
            if let Some(index) = &side.index {
                let entries = index.entries_for(path);
                if !entries.is_empty() {
                    return entries
                        .iter()
                        .find(|e| e.stage == Stage::Merged)
                        .or_else(|| entries.iter().find(|e| e.stage == Stage::Ours))
                        .map(|e| e.id.clone())
                        .ok_or_else(|| MergeError::EntryNotFound {
                            path: path.to_owned(),
                        });
                }
            }
        }

        let tree = self.store.tree(&side.commit.tree)?;
        tree.entry(path)
            .map(|e| e.id.clone())
            .ok_or_else(|| MergeError::EntryNotFound {
                path: path.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn statuses_of(changes: &[Change]) -> BTreeMap<String, StatusCode> {
    changes
        .iter()
        .map(|change| {
            let status = match change.action {
                Action::Insert => StatusCode::Added,
                Action::Delete => StatusCode::Deleted,
                Action::Modify => StatusCode::Modified,
            };
            (change.path.clone(), status)
        })
        .collect()
}

fn temp_name() -> String {
    format!("temp_{}", rand::rng().random::<u64>())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
