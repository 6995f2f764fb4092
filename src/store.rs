//! Document persistence behind a small trait so the pipeline's caches and
//! checkpoint can run against the filesystem or an in-memory fake.
//!
//! Writes always replace the whole document. The file store writes to a
//! sibling temp file and renames it over the target, so a crash mid-write
//! leaves the previous version intact.

use crate::error::Result;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub trait DocumentStore {
    /// Read a document; `None` when it does not exist yet.
    fn read(&self, name: &str) -> Result<Option<String>>;

    /// Replace a document.
    fn write(&self, name: &str, contents: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl DocumentStore for FileStore {
    fn read(&self, name: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_of(name)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, name: &str, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let target = self.path_of(name);
        let tmp = self.root.join(format!(".{}.tmp", name));
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }
}

/// In-memory store for tests; counts writes so callers can assert cadence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RefCell<HashMap<String, String>>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.docs.borrow().get(name).cloned()
    }

    pub fn insert(&self, name: &str, contents: &str) {
        self.docs.borrow_mut().insert(name.to_string(), contents.to_string());
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, name: &str) -> Result<Option<String>> {
        Ok(self.get(name))
    }

    fn write(&self, name: &str, contents: &str) -> Result<()> {
        self.insert(name, contents);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip_and_missing() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("out"));

        assert!(store.read("absent.json").unwrap().is_none());

        store.write("doc.json", "{\"a\":1}").unwrap();
        assert_eq!(store.read("doc.json").unwrap().as_deref(), Some("{\"a\":1}"));

        store.write("doc.json", "{}").unwrap();
        assert_eq!(store.read("doc.json").unwrap().as_deref(), Some("{}"));
        assert!(!store.root().join(".doc.json.tmp").exists());
    }

    #[test]
    fn test_memory_store_counts_writes() {
        let store = MemoryStore::new();
        store.write("a", "1").unwrap();
        store.write("a", "2").unwrap();
        assert_eq!(store.writes(), 2);
        assert_eq!(store.read("a").unwrap().as_deref(), Some("2"));
    }
}
