//! Artifact Writer Collaborator
//!
//! The orchestrator only ever needs `write(path, bytes)`. Paths are relative
//! to the configured output root; the filesystem writer creates parent
//! directories, the in-memory writer backs the test suite.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where emitted artifacts go. Implementations must tolerate concurrent
/// calls with distinct paths; the orchestrator never writes one path twice.
pub trait ArtifactWriter {
    fn write(&mut self, path: &Path, contents: &[u8]) -> std::io::Result<()>;
}

/// Writes artifacts under a root directory
#[derive(Debug)]
pub struct FsWriter {
    root: PathBuf,
}

impl FsWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactWriter for FsWriter {
    fn write(&mut self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, contents)
    }
}

/// Collects artifacts in memory, keyed by relative path
#[derive(Debug, Default)]
pub struct MemoryWriter {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&[u8]> {
        self.files.get(path.as_ref()).map(|v| v.as_slice())
    }

    pub fn get_str(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.get(path).and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.keys()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &BTreeMap<PathBuf, Vec<u8>> {
        &self.files
    }
}

impl ArtifactWriter for MemoryWriter {
    fn write(&mut self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        self.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }
}
