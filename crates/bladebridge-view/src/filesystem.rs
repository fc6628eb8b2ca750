//! Filesystem adapter
//!
//! Every read goes to the underlying storage; nothing is cached here.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{Result, ViewError};

/// Storage operations the view pipeline needs
pub trait Filesystem {
    /// Whether a file exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Modification time of `path`
    fn last_modified(&self, path: &Path) -> Result<SystemTime>;

    /// Raw contents of `path`
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write `contents` to `path`, creating intermediate directories
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Contents of `path` as UTF-8 text
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| {
            ViewError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    /// Canonical form of `path`, or `path` itself when it cannot be resolved
    fn canonicalize(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }
}

/// `Filesystem` backed by the local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    /// Create a local filesystem adapter
    pub fn new() -> Self {
        Self
    }
}

impl Filesystem for LocalFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn last_modified(&self, path: &Path) -> Result<SystemTime> {
        fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .map_err(|e| ViewError::io(path, e))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| ViewError::io(path, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ViewError::io(parent, e))?;
            }
        }
        fs::write(path, contents).map_err(|e| ViewError::io(path, e))
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }
}
