//! Temporary on-disk artifacts owned by a fitted model.
//!
//! A model that writes files during fitting (checkpoints, intermediate
//! state) acquires an [`ArtifactDir`] and stores it in its fitted state. The
//! directory is removed when that state is dropped, i.e. when the model is
//! dropped or refitted.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Private temporary directory, deleted on drop.
#[derive(Debug)]
pub struct ArtifactDir {
    dir: TempDir,
}

impl ArtifactDir {
    /// Create a fresh directory under the system temp location.
    pub fn create(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        debug!(path = %dir.path().display(), "artifact directory created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Serialize `value` as pretty JSON into `name`, returning the file path.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, serde_json::to_vec_pretty(value)?)?;
        Ok(path)
    }

    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let bytes = fs::read(self.dir.path().join(name))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
