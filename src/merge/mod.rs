//! Merge engine vocabulary and algorithms.
//!
//! - [`bases`]: merge-base discovery over the commit graph.
//! - [`file_merge`]: three-way reconciliation of one file's contents.
//! - [`message`]: console summary and `MERGE_MSG` construction.
//!
//! The orchestrator that drives these lives in [`crate::worktree`]; this
//! module owns the shared result vocabulary: how a path's two-sided change
//! is classified ([`DiffType`]) and how a whole merge ends
//! ([`MergeStatus`]).

pub mod bases;
pub mod file_merge;
pub mod message;

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MergeStatus / MergeOutcome
// ---------------------------------------------------------------------------

/// How a call to [`crate::worktree::Worktree::merge`] ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    /// Ours was already an ancestor of theirs; `HEAD` was advanced without
    /// creating a merge commit.
    FastForwarded,
    /// The merge completed without conflicts; a merge commit is needed to
    /// conclude it.
    CommitNeeded,
    /// The merge left at least one conflicted path in the index.
    Conflicted,
    /// Refused: staged or unstaged changes would be overwritten.
    UncommittedChanges,
    /// Refused: `MERGE_HEAD` exists, a previous merge is unconcluded.
    InProgress,
    /// The two commits share no common ancestor.
    NoCommonAncestor,
}

impl MergeStatus {
    /// Returns `true` for the refusal statuses that leave no state behind.
    #[must_use]
    pub const fn is_refusal(&self) -> bool {
        matches!(
            self,
            Self::UncommittedChanges | Self::InProgress | Self::NoCommonAncestor
        )
    }
}

impl fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FastForwarded => write!(f, "fast-forwarded"),
            Self::CommitNeeded => write!(f, "commit needed"),
            Self::Conflicted => write!(f, "conflicted"),
            Self::UncommittedChanges => write!(f, "uncommitted changes"),
            Self::InProgress => write!(f, "merge in progress"),
            Self::NoCommonAncestor => write!(f, "no common ancestor"),
        }
    }
}

/// The result of a merge: the status plus the human-readable message that
/// goes with it (console summary, refusal text, or fast-forward note).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOutcome {
    /// How the merge ended.
    pub status: MergeStatus,
    /// Display text for the caller. Refusals carry fixed English strings.
    pub message: String,
}

impl MergeOutcome {
    pub(crate) fn new(status: MergeStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Fixed refusal texts
// ---------------------------------------------------------------------------

/// Text returned with [`MergeStatus::InProgress`].
pub const MSG_MERGE_IN_PROGRESS: &str = "fatal: You have not concluded your merge (MERGE_HEAD exists). Please, commit your changes before you merge.";

/// Text returned with [`MergeStatus::UncommittedChanges`].
pub const MSG_UNCOMMITTED_CHANGES: &str = "error: Your local changes to the files would be overwritten by merge.\nPlease commit your changes or stash them before you merge.\nAborting";

/// Text returned with [`MergeStatus::CommitNeeded`].
pub const MSG_COMMIT_NEEDED: &str = "Create merge commit to continue merge process";

/// Trailer appended to the summary with [`MergeStatus::Conflicted`].
pub const MSG_MERGE_FAILED: &str =
    "Automatic merge failed; fix conflicts and then commit the result.";

// ---------------------------------------------------------------------------
// StatusCode: one side's change to a path
// ---------------------------------------------------------------------------

/// What one side did to a path relative to the merge base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    /// Path absent in base, present on this side.
    Added,
    /// Path present in base, content changed on this side.
    Modified,
    /// Path present in base, removed on this side.
    Deleted,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

// ---------------------------------------------------------------------------
// DiffType: per-path merge classification
// ---------------------------------------------------------------------------

/// How a path's changes on the two sides combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffType {
    /// The change appears on one side only and is applied verbatim.
    NoConflict,
    /// Modified on both sides; the three-way merge left unresolved hunks.
    BothModifiedWithConflicts,
    /// Modified on both sides; the three-way merge converged cleanly.
    BothModifiedNoConflict,
    /// Added on both sides with differing content; markers were written.
    BothAdded,
    /// Removed on both sides; nothing to do.
    BothDeleted,
    /// Modified on ours, deleted on theirs.
    ModifiedDeleted,
    /// Deleted on ours, modified on theirs.
    DeletedModified,
}

impl DiffType {
    /// Returns `true` if this classification leaves conflict entries in the
    /// index.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::BothModifiedWithConflicts | Self::BothAdded | Self::ModifiedDeleted
                | Self::DeletedModified
        )
    }
}

// ---------------------------------------------------------------------------
// MergingResult
// ---------------------------------------------------------------------------

/// The per-path outcome of classification: what each side did, and how the
/// two changes combined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergingResult {
    /// Ours-side change, if the path was touched on ours.
    pub ours_status: Option<StatusCode>,
    /// Theirs-side change, if the path was touched on theirs.
    pub theirs_status: Option<StatusCode>,
    /// Combined classification.
    pub diff_type: DiffType,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
