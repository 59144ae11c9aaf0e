//! In-memory collaborators for exercising the dispatcher without a disk.

use crate::store::FileStore;
use anyhow::Context;
use bytes::Bytes;
use std::collections::HashMap;

/// File store backed by a map from request path to content.
///
/// ```rust
/// use stubhttp_core::{store::FileStore, testing::MemoryStore};
///
/// let store = MemoryStore::default().file("/feed.xml", "<feed/>");
/// assert_eq!(store.resolve("/feed.xml").unwrap(), "<feed/>");
/// assert!(store.resolve("/other.xml").is_err());
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    files: HashMap<String, Bytes>,
}

impl MemoryStore {
    pub fn file(mut self, path: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

impl FileStore for MemoryStore {
    fn resolve(&self, path: &str) -> anyhow::Result<Bytes> {
        self.files
            .get(path)
            .cloned()
            .with_context(|| format!("no such file: {}", path))
    }
}
