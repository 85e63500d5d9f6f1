//! Merge-commit finalization.
//!
//! Stores the current index as a tree and commits it. During a merge,
//! `MERGE_HEAD` becomes the second parent and an empty message falls back
//! to the `MERGE_MSG` draft; a successful commit clears `MERGE_HEAD`,
//! `ORIG_HEAD`, `MERGE_MSG`, and the blob cache. Committing is refused
//! while any index entry is still in conflict.

use crate::error::MergeError;
use crate::model::object::{Commit, Tree};
use crate::model::types::{ObjectId, Signature};
use crate::store::{Store, WorkFs, MERGE_HEAD, ORIG_HEAD};
use crate::worktree::Worktree;

/// Options for [`Worktree::commit`].
#[derive(Clone, Debug)]
pub struct CommitOptions {
    /// Author identity; the authored timestamp orders the commit in
    /// merge-base walks.
    pub author: Signature,
    /// Committer identity; defaults to the author.
    pub committer: Option<Signature>,
}

impl CommitOptions {
    /// Options with the given author and no separate committer.
    #[must_use]
    pub fn new(author: Signature) -> Self {
        Self {
            author,
            committer: None,
        }
    }
}

impl<S: Store, F: WorkFs> Worktree<S, F> {
    /// Store the current index contents as a new commit and advance
    /// `HEAD`.
    ///
    /// # Errors
    /// [`MergeError::UnmergedPaths`] if any index entry is still in
    /// conflict, or collaborator failures.
    pub fn commit(&mut self, message: &str, opts: &CommitOptions) -> Result<ObjectId, MergeError> {
        let merge_head = self.store.reference(MERGE_HEAD)?;

        let mut parents = Vec::new();
        if let Some(head) = self.head()? {
            parents.push(head);
        }

        let mut message = message.to_owned();
        if let Some(merge_head) = &merge_head {
            parents.push(merge_head.clone());
            if message.is_empty() {
                message = self.merge_message()?;
            }
        }

        let index = self.store.index()?;
        let unmerged: Vec<String> = index.unmerged().keys().cloned().collect();
        if !unmerged.is_empty() {
            return Err(MergeError::UnmergedPaths { paths: unmerged });
        }

        let tree = Tree::from_index(&index);
        let tree_id = self.store.put_tree(tree)?;

        let author = opts.author.clone();
        let committer = opts.committer.clone().unwrap_or_else(|| author.clone());
        let commit_id = self.store.put_commit(Commit {
            tree: tree_id,
            parents,
            author,
            committer,
            message,
        })?;

        self.update_head(&commit_id)?;

        if merge_head.is_some() {
            self.store.remove_reference(MERGE_HEAD)?;
        }
        self.store.remove_merge_msg()?;
        if self.store.reference(ORIG_HEAD)?.is_some() {
            self.store.remove_reference(ORIG_HEAD)?;
        }
        self.blobs.clear();

        Ok(commit_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
