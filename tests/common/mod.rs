//! Shared test helpers for merge integration tests.
//!
//! [`TestRepo`] wraps a [`Worktree`] over the in-memory collaborators and
//! provides a small porcelain for building histories: write/stage/commit,
//! branch and checkout, and direct commit-graph construction for shapes
//! (like criss-cross merges) that porcelain alone cannot produce.

use braid::merge::MergeOutcome;
use braid::model::object::{Commit, Tree, TreeEntry};
use braid::model::types::{BranchName, FileMode, ObjectId, Signature};
use braid::store::memory::{MemoryStore, MemoryWorkFs};
use braid::store::{Store, WorkFs};
use braid::worktree::{CommitOptions, Worktree};

pub struct TestRepo {
    pub wt: Worktree<MemoryStore, MemoryWorkFs>,
    pub files: MemoryWorkFs,
    clock: i64,
}

impl TestRepo {
    /// A fresh repository with `HEAD` on `main` and an empty worktree.
    pub fn new() -> Self {
        let files = MemoryWorkFs::new();
        Self {
            wt: Worktree::new(MemoryStore::new(), files.clone()),
            files,
            clock: 1_000,
        }
    }

    fn tick(&mut self) -> i64 {
        self.clock += 10;
        self.clock
    }

    fn signature(&mut self) -> Signature {
        Signature::new("Test", "test@example.com", self.tick())
    }

    /// Write a worktree file.
    pub fn write(&self, path: &str, content: &str) {
        self.files.write_file(path, content.as_bytes()).unwrap();
    }

    /// Write and stage a worktree file.
    pub fn stage(&mut self, path: &str, content: &str) {
        self.write(path, content);
        self.wt.add(path).unwrap();
    }

    /// Commit the current index.
    pub fn commit(&mut self, message: &str) -> ObjectId {
        let opts = CommitOptions::new(self.signature());
        self.wt.commit(message, &opts).unwrap()
    }

    /// Create a branch pointing at the current `HEAD`.
    pub fn branch(&mut self, name: &str) {
        let head = self.wt.head().unwrap().expect("HEAD must exist to branch");
        self.set_branch(name, &head);
    }

    /// Point a branch at an arbitrary commit.
    pub fn set_branch(&mut self, name: &str, id: &ObjectId) {
        self.wt.store_mut().set_reference(name, id.clone()).unwrap();
    }

    /// Switch `HEAD` to a branch and hard-reset onto it.
    pub fn checkout(&mut self, name: &str) {
        let target = self
            .wt
            .resolve_branch(&branch_name(name))
            .expect("branch must exist to checkout");
        self.wt.store_mut().set_head_branch(branch_name(name));
        self.wt.reset_hard(&target).unwrap();
    }

    /// Merge a branch into `HEAD`.
    pub fn merge(&mut self, name: &str) -> MergeOutcome {
        self.wt.merge(&branch_name(name)).unwrap()
    }

    /// Construct a commit directly from a file listing and explicit
    /// parents, bypassing the index and worktree. Used to build graph
    /// shapes porcelain cannot (criss-cross, disjoint roots).
    pub fn commit_files(
        &mut self,
        files: &[(&str, &str)],
        parents: &[&ObjectId],
        message: &str,
    ) -> ObjectId {
        let store = self.wt.store_mut();
        let mut entries = Vec::new();
        for (path, content) in files {
            let id = store.put_blob(content.as_bytes().to_vec()).unwrap();
            entries.push(TreeEntry {
                path: (*path).to_owned(),
                id,
                mode: FileMode::Regular,
            });
        }
        let tree = store.put_tree(Tree::from_entries(entries)).unwrap();
        let signature = self.signature();
        self.wt
            .store_mut()
            .put_commit(Commit {
                tree,
                parents: parents.iter().map(|p| (*p).clone()).collect(),
                author: signature.clone(),
                committer: signature,
                message: message.to_owned(),
            })
            .unwrap()
    }

    /// Current content of a worktree file, if present.
    pub fn read(&self, path: &str) -> Option<String> {
        self.files
            .bytes(path)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }
}

pub fn branch_name(name: &str) -> BranchName {
    BranchName::new(name).unwrap()
}
