//! Console summary and `MERGE_MSG` construction.
//!
//! After classification, the orchestrator reports two texts: the summary
//! returned to the caller (one line per interesting path, plus a final
//! status line) and the `MERGE_MSG` draft persisted for the eventual merge
//! commit. Paths are walked in sorted order so both texts are
//! deterministic. The `# Conflicts:` header appears only when conflicts
//! actually occurred.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::merge::{DiffType, MergingResult, MSG_COMMIT_NEEDED, MSG_MERGE_FAILED};
use crate::model::types::BranchName;

/// The two texts produced from a classified merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeSummary {
    /// Whether any path ended in conflict.
    pub has_conflicts: bool,
    /// Human-readable summary returned to the caller.
    pub console: String,
    /// `MERGE_MSG` content to persist.
    pub merge_msg: String,
}

/// Build the console summary and `MERGE_MSG` content for a classified
/// merge against branch `theirs`.
#[must_use]
pub fn summarize(
    results: &BTreeMap<String, MergingResult>,
    theirs: &BranchName,
) -> MergeSummary {
    let theirs = theirs.short();

    let mut console = String::new();
    let mut conflict_paths: Vec<&str> = Vec::new();

    for (path, result) in results {
        match result.diff_type {
            DiffType::BothAdded => {
                let _ = writeln!(console, "Auto-merging {path}");
                let _ = writeln!(console, "CONFLICT (add/add): Merge conflict in {path}");
                conflict_paths.push(path);
            }
            DiffType::BothModifiedWithConflicts => {
                let _ = writeln!(console, "Auto-merging {path}");
                let _ = writeln!(console, "CONFLICT (content): Merge conflict in {path}");
                conflict_paths.push(path);
            }
            DiffType::BothModifiedNoConflict => {
                let _ = writeln!(console, "Auto-merging {path}");
            }
            DiffType::ModifiedDeleted => {
                let _ = writeln!(
                    console,
                    "(modify/delete): {path} modified in HEAD and deleted in {theirs}."
                );
                conflict_paths.push(path);
            }
            DiffType::DeletedModified => {
                let _ = writeln!(
                    console,
                    "(delete/modify): {path} deleted in HEAD and modified in {theirs}."
                );
                conflict_paths.push(path);
            }
            DiffType::NoConflict | DiffType::BothDeleted => {}
        }
    }

    let has_conflicts = !conflict_paths.is_empty();

    let merge_msg = if has_conflicts {
        let mut msg = format!("Merge branch '{theirs}'\n\n");
        msg.push_str("# Conflicts:\n");
        for path in &conflict_paths {
            let _ = writeln!(msg, "#\t{path}");
        }
        msg
    } else {
        format!(
            "Merge branch '{theirs}'\n\n\
             # Please enter a commit message to explain why this merge is necessary,\n\
             # especially if it merges an updated upstream into a topic branch.\n\
             #\n\
             # Lines starting with '#' will be ignored, and an empty message aborts\n\
             # the commit."
        )
    };

    if has_conflicts {
        let _ = writeln!(console, "{MSG_MERGE_FAILED}");
    } else {
        let _ = writeln!(console, "{MSG_COMMIT_NEEDED}");
    }

    MergeSummary {
        has_conflicts,
        console,
        merge_msg,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
