//! Destination directory bookkeeping.

use std::fs;
use std::path::{Path, PathBuf};

use crate::clipper::sanitize_filename;
use crate::constants::clipper::CLIPS_DIR;
use crate::error::{Error, Result};

/// Where downloads, clips and manifests go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    root: PathBuf,
}

impl Destination {
    /// Use `root`, creating it when absent.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        ensure_dir(&root)?;
        Ok(Self { root })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path for a downloaded file.
    pub fn path_for(&self, basename: &str) -> PathBuf {
        self.root.join(basename)
    }

    /// `<root>/clips/<group>`, created if needed.
    pub fn clips_dir(&self, group: &str) -> Result<PathBuf> {
        let dir = self.root.join(CLIPS_DIR).join(sanitize_filename(group));
        ensure_dir(&dir)?;
        Ok(dir)
    }
}

/// Create `path` as a directory; an existing non-directory is an error.
///
/// Concurrent creation of the same directory is not an error.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.exists() && !path.is_dir() {
        return Err(Error::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    fs::create_dir_all(path).map_err(|source| Error::DirectoryCreate {
        path: path.to_path_buf(),
        source,
    })
}
