//! Collaborator contracts: object/reference/index storage and the work
//! filesystem.
//!
//! The merge engine is written against these traits; the crate ships an
//! in-memory implementation ([`memory`]) used by the test suite and a
//! directory-rooted work filesystem ([`disk`]). Everything is synchronous
//! and blocking; the engine is single-threaded by design.

pub mod diff;
pub mod disk;
pub mod memory;

use std::io::{self, Read, Write};

use crate::error::MergeError;
use crate::model::index::Index;
use crate::model::object::{Commit, Tree};
use crate::model::types::{BranchName, ObjectId};

/// Reference name recording the other side of an in-progress merge.
pub const MERGE_HEAD: &str = "MERGE_HEAD";

/// Reference name recording the pre-merge `HEAD` for aborts.
pub const ORIG_HEAD: &str = "ORIG_HEAD";

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Object, reference, index, and merge-message storage.
///
/// Objects are content-addressed: the `put_*` methods return the id derived
/// from the content, and storing the same content twice is a no-op.
pub trait Store {
    /// Read a blob's bytes.
    ///
    /// # Errors
    /// [`MergeError::ObjectNotFound`] if the id does not resolve to a blob.
    fn blob(&self, id: &ObjectId) -> Result<Vec<u8>, MergeError>;

    /// Store a blob, returning its content id.
    ///
    /// # Errors
    /// Returns storage-level failures.
    fn put_blob(&mut self, data: Vec<u8>) -> Result<ObjectId, MergeError>;

    /// Read a tree.
    ///
    /// # Errors
    /// [`MergeError::ObjectNotFound`] if the id does not resolve to a tree.
    fn tree(&self, id: &ObjectId) -> Result<Tree, MergeError>;

    /// Store a tree, returning its content id.
    ///
    /// # Errors
    /// Returns storage-level failures.
    fn put_tree(&mut self, tree: Tree) -> Result<ObjectId, MergeError>;

    /// Read a commit.
    ///
    /// # Errors
    /// [`MergeError::ObjectNotFound`] if the id does not resolve to a commit.
    fn commit(&self, id: &ObjectId) -> Result<Commit, MergeError>;

    /// Store a commit, returning its content id.
    ///
    /// # Errors
    /// Returns storage-level failures.
    fn put_commit(&mut self, commit: Commit) -> Result<ObjectId, MergeError>;

    /// Resolve a reference name to a commit id, or `None` if unset.
    ///
    /// # Errors
    /// Returns storage-level failures.
    fn reference(&self, name: &str) -> Result<Option<ObjectId>, MergeError>;

    /// Set a reference.
    ///
    /// # Errors
    /// Returns storage-level failures.
    fn set_reference(&mut self, name: &str, id: ObjectId) -> Result<(), MergeError>;

    /// Remove a reference; removing an absent reference is a no-op.
    ///
    /// # Errors
    /// Returns storage-level failures.
    fn remove_reference(&mut self, name: &str) -> Result<(), MergeError>;

    /// The branch `HEAD` currently points at.
    ///
    /// # Errors
    /// Returns storage-level failures.
    fn head_branch(&self) -> Result<BranchName, MergeError>;

    /// Read the index.
    ///
    /// # Errors
    /// Returns storage-level failures.
    fn index(&self) -> Result<Index, MergeError>;

    /// Replace the index.
    ///
    /// # Errors
    /// Returns storage-level failures.
    fn set_index(&mut self, index: Index) -> Result<(), MergeError>;

    /// Read the raw `MERGE_MSG` content, or `None` if unset.
    ///
    /// # Errors
    /// Returns storage-level failures.
    fn merge_msg(&self) -> Result<Option<String>, MergeError>;

    /// Set the `MERGE_MSG` content.
    ///
    /// # Errors
    /// Returns storage-level failures.
    fn set_merge_msg(&mut self, msg: String) -> Result<(), MergeError>;

    /// Remove `MERGE_MSG`; removing an absent message is a no-op.
    ///
    /// # Errors
    /// Returns storage-level failures.
    fn remove_merge_msg(&mut self) -> Result<(), MergeError>;
}

// ---------------------------------------------------------------------------
// WorkFs
// ---------------------------------------------------------------------------

/// The working-tree filesystem.
///
/// Paths are repository-relative and `/`-separated. Implementations use
/// interior mutability where needed; the engine is single-threaded.
pub trait WorkFs {
    /// Create (or truncate) a file and return a writer for it.
    ///
    /// # Errors
    /// Returns I/O failures.
    fn create(&self, path: &str) -> io::Result<Box<dyn Write>>;

    /// Open a file for reading.
    ///
    /// # Errors
    /// `NotFound` if the path does not exist, or other I/O failures.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>>;

    /// Atomically rename `from` over `to`.
    ///
    /// # Errors
    /// `NotFound` if `from` does not exist, or other I/O failures.
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Remove a file.
    ///
    /// # Errors
    /// `NotFound` if the path does not exist, or other I/O failures.
    fn remove(&self, path: &str) -> io::Result<()>;

    /// All file paths currently present, sorted.
    ///
    /// # Errors
    /// Returns I/O failures.
    fn paths(&self) -> io::Result<Vec<String>>;

    /// Read a whole file.
    ///
    /// # Errors
    /// `NotFound` if the path does not exist, or other I/O failures.
    fn read_all(&self, path: &str) -> io::Result<Vec<u8>> {
        let mut reader = self.open(path)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Write a whole file.
    ///
    /// # Errors
    /// Returns I/O failures.
    fn write_file(&self, path: &str, data: &[u8]) -> io::Result<()> {
        let mut writer = self.create(path)?;
        writer.write_all(data)?;
        writer.flush()
    }
}
