//! Core data model: identifiers, index entries, and object records.

pub mod index;
pub mod object;
pub mod types;

pub use index::{Index, IndexEntry};
pub use object::{Commit, Tree, TreeEntry};
pub use types::{BranchName, FileMode, ObjectId, Signature, Stage};
