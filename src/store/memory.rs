//! In-memory reference implementation of the storage collaborators.
//!
//! [`MemoryStore`] keeps content-addressed objects, references, the index,
//! and `MERGE_MSG` in plain maps. [`MemoryWorkFs`] is a working tree backed
//! by a shared `path → bytes` map; clones share the same files, so a test
//! can hold one handle while the worktree owns another.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Cursor, Read, Write};
use std::rc::Rc;

use crate::error::MergeError;
use crate::model::index::Index;
use crate::model::object::{Commit, Tree};
use crate::model::types::{BranchName, ObjectId};
use crate::store::{Store, WorkFs};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
enum Object {
    Blob(Vec<u8>),
    Tree(Tree),
    Commit(Commit),
}

/// Content-addressed in-memory storage.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    objects: HashMap<ObjectId, Object>,
    refs: BTreeMap<String, ObjectId>,
    head: BranchName,
    index: Index,
    merge_msg: Option<String>,
}

impl MemoryStore {
    /// Create an empty store with `HEAD` on `main`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            refs: BTreeMap::new(),
            head: BranchName::new("main").expect("static branch name is valid"),
            index: Index::new(),
            merge_msg: None,
        }
    }

    /// Point `HEAD` at a different branch.
    pub fn set_head_branch(&mut self, name: BranchName) {
        self.head = name;
    }

    /// Names of all currently set references, sorted.
    #[must_use]
    pub fn reference_names(&self) -> Vec<String> {
        self.refs.keys().cloned().collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn blob(&self, id: &ObjectId) -> Result<Vec<u8>, MergeError> {
        match self.objects.get(id) {
            Some(Object::Blob(data)) => Ok(data.clone()),
            _ => Err(MergeError::ObjectNotFound { id: id.clone() }),
        }
    }

    fn put_blob(&mut self, data: Vec<u8>) -> Result<ObjectId, MergeError> {
        let id = ObjectId::for_blob(&data);
        self.objects.insert(id.clone(), Object::Blob(data));
        Ok(id)
    }

    fn tree(&self, id: &ObjectId) -> Result<Tree, MergeError> {
        match self.objects.get(id) {
            Some(Object::Tree(tree)) => Ok(tree.clone()),
            _ => Err(MergeError::ObjectNotFound { id: id.clone() }),
        }
    }

    fn put_tree(&mut self, tree: Tree) -> Result<ObjectId, MergeError> {
        let id = tree.id();
        self.objects.insert(id.clone(), Object::Tree(tree));
        Ok(id)
    }

    fn commit(&self, id: &ObjectId) -> Result<Commit, MergeError> {
        match self.objects.get(id) {
            Some(Object::Commit(commit)) => Ok(commit.clone()),
            _ => Err(MergeError::ObjectNotFound { id: id.clone() }),
        }
    }

    fn put_commit(&mut self, commit: Commit) -> Result<ObjectId, MergeError> {
        let id = commit.id();
        self.objects.insert(id.clone(), Object::Commit(commit));
        Ok(id)
    }

    fn reference(&self, name: &str) -> Result<Option<ObjectId>, MergeError> {
        Ok(self.refs.get(name).cloned())
    }

    fn set_reference(&mut self, name: &str, id: ObjectId) -> Result<(), MergeError> {
        self.refs.insert(name.to_owned(), id);
        Ok(())
    }

    fn remove_reference(&mut self, name: &str) -> Result<(), MergeError> {
        self.refs.remove(name);
        Ok(())
    }

    fn head_branch(&self) -> Result<BranchName, MergeError> {
        Ok(self.head.clone())
    }

    fn index(&self) -> Result<Index, MergeError> {
        Ok(self.index.clone())
    }

    fn set_index(&mut self, index: Index) -> Result<(), MergeError> {
        self.index = index;
        Ok(())
    }

    fn merge_msg(&self) -> Result<Option<String>, MergeError> {
        Ok(self.merge_msg.clone())
    }

    fn set_merge_msg(&mut self, msg: String) -> Result<(), MergeError> {
        self.merge_msg = Some(msg);
        Ok(())
    }

    fn remove_merge_msg(&mut self) -> Result<(), MergeError> {
        self.merge_msg = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryWorkFs
// ---------------------------------------------------------------------------

type SharedFiles = Rc<RefCell<BTreeMap<String, Vec<u8>>>>;

/// An in-memory working tree. Clones share the same file map.
#[derive(Clone, Debug, Default)]
pub struct MemoryWorkFs {
    files: SharedFiles,
}

impl MemoryWorkFs {
    /// Create an empty working tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `path` exists.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
    }

    /// Snapshot of a file's bytes, if present. Test convenience.
    #[must_use]
    pub fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }
}

/// A writer that streams into the shared file map.
struct MemoryFile {
    path: String,
    files: SharedFiles,
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut files = self.files.borrow_mut();
        files
            .get_mut(&self.path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, self.path.clone()))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WorkFs for MemoryWorkFs {
    fn create(&self, path: &str) -> io::Result<Box<dyn Write>> {
        self.files.borrow_mut().insert(path.to_owned(), Vec::new());
        Ok(Box::new(MemoryFile {
            path: path.to_owned(),
            files: Rc::clone(&self.files),
        }))
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        let files = self.files.borrow();
        let data = files
            .get(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_owned()))?;
        Ok(Box::new(Cursor::new(data.clone())))
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let mut files = self.files.borrow_mut();
        let data = files
            .remove(from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, from.to_owned()))?;
        files.insert(to.to_owned(), data);
        Ok(())
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        self.files
            .borrow_mut()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_owned()))
    }

    fn paths(&self) -> io::Result<Vec<String>> {
        Ok(self.files.borrow().keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
