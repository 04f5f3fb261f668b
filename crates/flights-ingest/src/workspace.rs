//! Per-invocation scratch directory
//!
//! Created fresh for every run and removed when the run ends, on success,
//! on error and on panic unwind alike. Nothing in it outlives the invocation.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tracing::{debug, warn};

const WORKSPACE_PREFIX: &str = "flights-ingest-";

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a uniquely named workspace under `root`, or the system temp dir
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            },
            None => builder.tempdir()?,
        };

        debug!(path = %dir.path().display(), "Created workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Remove the workspace now. A failed removal is logged, not returned:
    /// it must never mask the outcome of the run that used the workspace.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "Removed workspace"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove workspace"),
        }
    }
}
