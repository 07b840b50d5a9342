// src/workspace/mod.rs

//! The `temp/` working directory a run checks out into.
//!
//! A workspace is owned by exactly one run: [`Workspace::prepare`] wipes
//! whatever a previous run left behind, and [`Workspace::remove`] is only
//! called after a successful run so failures stay inspectable.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::Result;
use crate::fs::FileSystem;

/// Name of the workspace directory under the base directory.
pub const WORKSPACE_DIR_NAME: &str = "temp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Workspace located at `<base>/temp`.
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            root: base.as_ref().join(WORKSPACE_DIR_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve a path relative to the workspace root.
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Make sure the workspace exists and is empty.
    pub fn prepare(&self, fs: &dyn FileSystem) -> Result<()> {
        if fs.is_dir(&self.root) {
            debug!(path = ?self.root, "removing leftover workspace");
            fs.remove_dir_all(&self.root)?;
        } else if fs.exists(&self.root) {
            debug!(path = ?self.root, "removing leftover file in place of workspace");
            fs.remove_file(&self.root)?;
        }
        fs.create_dir_all(&self.root)?;
        info!(path = ?self.root, "workspace ready");
        Ok(())
    }

    /// Delete the workspace and everything in it.
    pub fn remove(&self, fs: &dyn FileSystem) -> Result<()> {
        fs.remove_dir_all(&self.root)?;
        info!(path = ?self.root, "workspace removed");
        Ok(())
    }
}
