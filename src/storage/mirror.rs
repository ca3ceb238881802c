//! Offline mirror lookup.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::object::ObjectRef;
use crate::error::{Error, Result};

/// A local tree laid out as `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct Mirror {
    root: PathBuf,
}

impl Mirror {
    /// Mirror rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where `object` would live in the mirror.
    pub fn path_for(&self, object: &ObjectRef) -> PathBuf {
        let mut path = self.root.join(&object.bucket);
        for part in object.key.split('/').filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path
    }

    /// Copy the mirrored object to `dest` if present.
    ///
    /// Returns `Ok(None)` when the mirror has no copy.
    pub fn fetch(&self, object: &ObjectRef, dest: &Path) -> Result<Option<u64>> {
        let source = self.path_for(object);
        if !source.is_file() {
            return Ok(None);
        }

        debug!("mirror hit: {}", source.display());
        std::fs::copy(&source, dest)
            .map(Some)
            .map_err(|e| Error::DownloadFailed {
                url: object.gs_url(),
                source: Box::new(e),
            })
    }
}
