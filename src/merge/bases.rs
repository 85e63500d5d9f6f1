//! Merge-base discovery: a priority-queue walk over the commit graph.
//!
//! [`common_ancestors`] returns every *best* common ancestor of two commits:
//! reachable from both, and not a strict ancestor of another returned
//! commit. The walk pops commits newest-authored-first; each carries a
//! flag byte recording which inputs reach it. A commit reached by both
//! inputs is emitted once and its ancestry is painted stale so dominated
//! ancestors are never reported.
//!
//! The graph is a DAG referenced by hash, so flags live in a hash-keyed
//! map (accumulated by OR across re-visits) and the queue holds lightweight
//! `(timestamp, id)` entries, with no pointer cycles. An O(1) side-count of
//! non-stale queued entries answers the "is the walk still interesting"
//! test without scanning.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::trace;

use crate::error::MergeError;
use crate::model::types::ObjectId;
use crate::store::Store;

/// Reached from the first input.
pub(crate) const FLAG_PARENT1: u8 = 1 << 0;
/// Reached from the second input.
pub(crate) const FLAG_PARENT2: u8 = 1 << 1;
/// Ancestry already dominated by an emitted result.
pub(crate) const FLAG_STALE: u8 = 1 << 2;
/// Already emitted as a result.
pub(crate) const FLAG_RESULT: u8 = 1 << 3;

// ---------------------------------------------------------------------------
// Queue entry
// ---------------------------------------------------------------------------

/// A queued commit: authored timestamp snapshot plus id.
///
/// Ordered newest-first; equal timestamps tie-break on id bytes so the walk
/// is deterministic (the result set is order-insensitive either way).
#[derive(Clone, Debug, PartialEq, Eq)]
struct QueueEntry {
    time: i64,
    id: ObjectId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

struct Walker {
    heap: BinaryHeap<QueueEntry>,
    queued: HashSet<ObjectId>,
    flags: HashMap<ObjectId, u8>,
    /// Count of queued entries whose flags lack `FLAG_STALE`.
    interesting: usize,
}

impl Walker {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            queued: HashSet::new(),
            flags: HashMap::new(),
            interesting: 0,
        }
    }

    /// Push a commit with additional flags. If it is already queued, the
    /// flags are OR-ed into its record instead of inserting a duplicate.
    fn push(&mut self, id: ObjectId, time: i64, add: u8) {
        let entry = self.flags.entry(id.clone()).or_insert(0);
        let before = *entry;
        *entry |= add;
        let after = *entry;

        if self.queued.contains(&id) {
            // A queued non-stale entry that just went stale stops counting.
            if before & FLAG_STALE == 0 && after & FLAG_STALE != 0 {
                self.interesting -= 1;
            }
            return;
        }

        self.queued.insert(id.clone());
        self.heap.push(QueueEntry { time, id });
        if after & FLAG_STALE == 0 {
            self.interesting += 1;
        }
    }

    /// Pop the newest queued commit with its accumulated flags.
    fn pop(&mut self) -> Option<(ObjectId, u8)> {
        let entry = self.heap.pop()?;
        self.queued.remove(&entry.id);
        let flags = self.flags.get(&entry.id).copied().unwrap_or(0);
        if flags & FLAG_STALE == 0 {
            self.interesting -= 1;
        }
        Some((entry.id, flags))
    }

    /// Mark a popped commit as emitted.
    fn mark_result(&mut self, id: &ObjectId) {
        if let Some(flags) = self.flags.get_mut(id) {
            *flags |= FLAG_RESULT;
        }
    }

    fn is_interesting(&self) -> bool {
        self.interesting > 0
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute the best common ancestors of `one` and `two`.
///
/// Returns the ancestors in emission order (newest first); an empty result
/// means the commits share no history. The result is symmetric in its
/// arguments as a set.
///
/// # Errors
/// Returns an error if a commit cannot be read from the store.
pub fn common_ancestors<S: Store>(
    store: &S,
    one: &ObjectId,
    two: &ObjectId,
) -> Result<Vec<ObjectId>, MergeError> {
    let mut walker = Walker::new();

    let c1 = store.commit(one)?;
    let c2 = store.commit(two)?;
    walker.push(one.clone(), c1.author.time, FLAG_PARENT1);
    walker.push(two.clone(), c2.author.time, FLAG_PARENT2);

    let mut results = Vec::new();

    while walker.is_interesting() {
        let Some((id, all_flags)) = walker.pop() else {
            break;
        };
        let mut flags = all_flags & (FLAG_PARENT1 | FLAG_PARENT2 | FLAG_STALE);

        if flags == FLAG_PARENT1 | FLAG_PARENT2 {
            if all_flags & FLAG_RESULT == 0 {
                walker.mark_result(&id);
                trace!(ancestor = %id.short(), "merge base found");
                results.push(id.clone());
            }
            flags |= FLAG_STALE;
        }

        let commit = store.commit(&id)?;
        for parent in &commit.parents {
            let parent_commit = store.commit(parent)?;
            walker.push(parent.clone(), parent_commit.author.time, flags);
        }
    }

    Ok(results)
}

/// Is `ancestor` reachable from `descendant` (inclusive)?
///
/// Drives the fast-forward check: a merge where ours is an ancestor of
/// theirs resolves by advancing `HEAD`.
///
/// # Errors
/// Returns an error if a commit cannot be read from the store.
pub fn is_ancestor<S: Store>(
    store: &S,
    ancestor: &ObjectId,
    descendant: &ObjectId,
) -> Result<bool, MergeError> {
    let mut stack = vec![descendant.clone()];
    let mut seen = HashSet::new();

    while let Some(id) = stack.pop() {
        if &id == ancestor {
            return Ok(true);
        }
        if !seen.insert(id.clone()) {
            continue;
        }
        let commit = store.commit(&id)?;
        stack.extend(commit.parents.iter().cloned());
    }

    Ok(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
