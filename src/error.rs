//! Unified error type for merge-core operations.
//!
//! [`MergeError`] covers collaborator failures: missing references or
//! objects, unreadable entries, and I/O. Merge *outcomes* (fast-forward,
//! commit-needed, conflicted, and the precondition refusals) are not
//! errors; they are [`crate::merge::MergeStatus`] values, because the caller
//! must take an explicit next action either way.
//!
//! Messages carry fixed English strings for cross-tool compatibility.

use std::fmt;

use crate::model::types::ObjectId;

// ---------------------------------------------------------------------------
// MergeError
// ---------------------------------------------------------------------------

/// A collaborator failure during a merge-core operation.
#[derive(Debug)]
pub enum MergeError {
    /// `HEAD` could not be resolved to a commit.
    HeadNotFound,

    /// The named branch does not exist.
    BranchNotFound {
        /// The branch name that was requested.
        name: String,
    },

    /// A named reference was expected but missing (e.g. `ORIG_HEAD` during
    /// an abort with no merge in progress).
    RefNotFound {
        /// The reference name.
        name: String,
    },

    /// An object id did not resolve in the store.
    ObjectNotFound {
        /// The missing id.
        id: ObjectId,
    },

    /// A file was not found in the worktree, blob cache, or tree.
    EntryNotFound {
        /// The requested path.
        path: String,
    },

    /// Two commits being folded into a virtual ancestor share no history.
    NoCommonParent {
        /// First commit.
        one: ObjectId,
        /// Second commit.
        two: ObjectId,
    },

    /// Commit was refused because the index still holds conflict entries.
    UnmergedPaths {
        /// The conflicted paths.
        paths: Vec<String>,
    },

    /// An I/O error from the work filesystem.
    Io(std::io::Error),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeadNotFound => write!(f, "fatal: HEAD does not point at a commit"),
            Self::BranchNotFound { name } => {
                write!(f, "fatal: '{name}' does not point to a commit")
            }
            Self::RefNotFound { name } => write!(f, "fatal: reference '{name}' not found"),
            Self::ObjectNotFound { id } => write!(f, "fatal: object {id} not found"),
            Self::EntryNotFound { path } => write!(f, "fatal: path '{path}' not found"),
            Self::NoCommonParent { one, two } => {
                write!(f, "fatal: no common parent for {one} and {two}")
            }
            Self::UnmergedPaths { paths } => {
                for path in paths {
                    writeln!(f, "U\t{path}")?;
                }
                write!(
                    f,
                    "error: commit is not possible because you have unmerged files.\n\
                     hint: Fix them up in the work tree, and then use 'git add/rm <file>'\n\
                     hint: as appropriate to mark resolution and make a commit.\n\
                     fatal: Exiting because of an unresolved conflict."
                )
            }
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MergeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
