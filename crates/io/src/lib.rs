//! Resource loaders: fetch score files and other binary resources by path.
//!
//! Loaders are created through the environment's loader registry, so the
//! surrounding setup picks the implementation that fits the host.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Errors from loading a resource.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("resource not found: {0}")]
    NotFound(String),
}

/// Loads raw bytes for a resource path.
pub trait FileLoader {
    fn load_binary(&self, path: &str) -> Result<Vec<u8>, LoadError>;
}

/// Reads from the local filesystem, relative to an optional base directory.
#[derive(Debug, Clone, Default)]
pub struct FsFileLoader {
    base: Option<PathBuf>,
}

impl FsFileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: impl AsRef<Path>) -> Self {
        Self {
            base: Some(base.as_ref().to_path_buf()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.base {
            Some(base) => base.join(path),
            None => PathBuf::from(path),
        }
    }
}

impl FileLoader for FsFileLoader {
    fn load_binary(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        let full = self.resolve(path);
        tracing::debug!(path = %full.display(), "loading resource");
        match std::fs::read(&full) {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(LoadError::NotFound(full.display().to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory resources, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileLoader {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryFileLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), data.into());
    }
}

impl FileLoader for MemoryFileLoader {
    fn load_binary(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(path.to_owned()))
    }
}

pub fn crate_info() -> &'static str {
    "tabscore-io v0.1.0"
}
