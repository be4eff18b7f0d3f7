//! Build workspace lifecycle
//!
//! An ephemeral local directory scoped to exactly one in-flight build.
//! Created at pipeline start, recursively deleted unconditionally at
//! pipeline end; removal is explicit rather than drop-based so the
//! orchestrator controls exactly when cleanup happens.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Ephemeral directory owned by a single build.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Creates a fresh workspace under the OS temp directory.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the directory cannot be created.
    pub async fn create() -> io::Result<Self> {
        let path = std::env::temp_dir().join(format!("fnforge-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&path).await?;
        tracing::trace!(path = %path.display(), "Workspace created");
        Ok(Self { path })
    }

    /// Path of the workspace directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recursively deletes the workspace.
    ///
    /// # Errors
    ///
    /// Returns an IO error when removal fails; callers treat this as a
    /// cleanup warning, never as a build failure.
    pub async fn remove(&self) -> io::Result<()> {
        tracing::trace!(path = %self.path.display(), "Removing workspace");
        tokio::fs::remove_dir_all(&self.path).await
    }
}
