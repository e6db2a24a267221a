//! Local persistence of encoded payloads.
//!
//! Every payload is written to disk before upload, so a failed delivery
//! leaves the capture behind for inspection.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use tracing::debug;

use crate::error::{RelayError, RelayResult};

/// Reference to a persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    path: PathBuf,
}

impl ArtifactHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name component, used as the upload filename.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Write-then-maybe-delete storage for payloads.
pub trait ArtifactStore {
    fn persist(&mut self, name: &str, bytes: &[u8]) -> RelayResult<ArtifactHandle>;

    fn delete(&mut self, handle: &ArtifactHandle) -> RelayResult<()>;
}

impl<S: ArtifactStore + ?Sized> ArtifactStore for Box<S> {
    fn persist(&mut self, name: &str, bytes: &[u8]) -> RelayResult<ArtifactHandle> {
        (**self).persist(name, bytes)
    }

    fn delete(&mut self, handle: &ArtifactHandle) -> RelayResult<()> {
        (**self).delete(handle)
    }
}

/// Artifact name for a capture taken at `at`: `screenshot_YYYYmmdd_HHMMSS.jpg`.
pub fn artifact_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("screenshot_{}.jpg", at.format("%Y%m%d_%H%M%S"))
}

/// Stores artifacts as files in one directory.
#[derive(Debug, Clone)]
pub struct DirArtifactStore {
    dir: PathBuf,
}

impl DirArtifactStore {
    /// Use `dir`, creating it when missing.
    pub fn new(dir: impl Into<PathBuf>) -> RelayResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            RelayError::io_at("create screenshot directory", &dir, e)
                .with_recovery_suggestion("set SCREENSHOT_DIR to a writable location")
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactStore for DirArtifactStore {
    fn persist(&mut self, name: &str, bytes: &[u8]) -> RelayResult<ArtifactHandle> {
        let path = self.dir.join(name);
        fs::write(&path, bytes).map_err(|e| RelayError::io_at("persist artifact", &path, e))?;
        debug!(path = %path.display(), size_bytes = bytes.len(), "Artifact saved");
        Ok(ArtifactHandle::new(path))
    }

    fn delete(&mut self, handle: &ArtifactHandle) -> RelayResult<()> {
        fs::remove_file(handle.path())
            .map_err(|e| RelayError::io_at("delete artifact", handle.path(), e))?;
        debug!(path = %handle.path().display(), "Artifact deleted");
        Ok(())
    }
}
