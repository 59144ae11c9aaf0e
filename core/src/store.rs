//! Collaborators the dispatcher uses to serve content: where bytes come from
//! and what type they are.

use anyhow::{bail, Context};
use bytes::Bytes;
use new_mime_guess::MimeGuess;
use std::{
    fs,
    path::{Component, Path, PathBuf},
};

/// Source of the files served by default fetches.
pub trait FileStore: Send + Sync {
    /// Returns the content stored under a request path such as `/feed.xml`.
    /// Any error is reported to the client as not found.
    fn resolve(&self, path: &str) -> anyhow::Result<Bytes>;
}

/// Guesses the content type of a request path.
pub trait MimeLookup: Send + Sync {
    fn guess_type(&self, path: &str) -> Option<String>;
}

/// Serves files below a directory on the local disk.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a request path onto the root directory. Paths that would climb
    /// out of the root are refused.
    fn local_path(&self, path: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));

        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => bail!("path escapes served root: {}", path),
            }
        }

        Ok(self.root.join(relative))
    }
}

impl FileStore for DirectoryStore {
    fn resolve(&self, path: &str) -> anyhow::Result<Bytes> {
        let local = self.local_path(path)?;
        let content =
            fs::read(&local).with_context(|| format!("could not read {}", local.display()))?;

        Ok(Bytes::from(content))
    }
}

/// Content types guessed from the file extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuessMime;

impl MimeLookup for GuessMime {
    fn guess_type(&self, path: &str) -> Option<String> {
        MimeGuess::from_path(path).first().map(|v| v.to_string())
    }
}
