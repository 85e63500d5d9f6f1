//! Directory-rooted work filesystem.
//!
//! Maps the repository-relative, `/`-separated paths of the [`WorkFs`]
//! contract onto a root directory on the real filesystem. Parent
//! directories are created on demand; empty directories left behind by
//! removals are not pruned.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::store::WorkFs;

/// A working tree rooted at a directory.
#[derive(Clone, Debug)]
pub struct DiskWorkFs {
    root: PathBuf,
}

impl DiskWorkFs {
    /// Create a work filesystem rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let mut full = self.root.clone();
        for part in path.split('/') {
            full.push(part);
        }
        full
    }

    fn collect_paths(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            if entry.file_type()?.is_dir() {
                self.collect_paths(&entry.path(), &rel, out)?;
            } else {
                out.push(rel);
            }
        }
        Ok(())
    }
}

impl WorkFs for DiskWorkFs {
    fn create(&self, path: &str) -> io::Result<Box<dyn Write>> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Box::new(fs::File::create(full)?))
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(fs::File::open(self.resolve(path))?))
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let to_full = self.resolve(to);
        if let Some(parent) = to_full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(self.resolve(from), to_full)
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        fs::remove_file(self.resolve(path))
    }

    fn paths(&self) -> io::Result<Vec<String>> {
        let mut out = Vec::new();
        if self.root.exists() {
            self.collect_paths(&self.root, "", &mut out)?;
        }
        out.sort();
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
