//! Scoped resource leases with guaranteed cleanup on every exit path.
//!
//! Replaces the try/finally cleanup idiom with `Drop`: a [`TempFileLease`]
//! always unlinks its file when dropped, whether the scope exits normally,
//! via `?`, or via an unwinding panic. An [`OutputGuard`] is the mirror
//! image for the final output file — it unlinks on drop *unless* explicitly
//! [`OutputGuard::commit`]ted, so a conversion that fails partway leaves no
//! half-written artifact behind.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// A temp file created under a given directory, deleted when dropped.
///
/// The cleanup list described in the design notes — shared-string index
/// file, shared-string data file, worksheet temp file — is simply one
/// `TempFileLease` per file, held for as long as the pipeline needs it and
/// dropped (in reverse construction order, by ordinary Rust scope rules)
/// once it's no longer needed.
pub struct TempFileLease {
    path: PathBuf,
    armed: bool,
}

impl TempFileLease {
    /// Creates a new empty temp file named `prefix-<unique>` under `dir` and
    /// returns the lease alongside a writable handle to it.
    pub fn create_in(dir: &Path, prefix: &str) -> Result<(Self, File)> {
        let named = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".tmp")
            .tempfile_in(dir)?;
        let (file, path) = named.keep().map_err(|e| e.error)?;
        Ok((
            Self {
                path,
                armed: true,
            },
            file,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarms the lease without deleting the file. Not used by the normal
    /// pipeline (every temp file really is temporary) but kept for callers
    /// that need to hand the file off intact, e.g. tests inspecting it after
    /// the lease's scope ends.
    pub fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for TempFileLease {
    fn drop(&mut self) {
        if self.armed && !self.path.as_os_str().is_empty() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Guards the final output file: unlinks it on drop unless `commit()` was
/// called. A conversion wraps the destination path in one of these before
/// doing any writing; on success it commits, on any failure the guard's
/// `Drop` removes whatever partial bytes made it to disk.
pub struct OutputGuard {
    path: PathBuf,
    committed: bool,
}

impl OutputGuard {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_file_lease_deletes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path;
        {
            let (lease, _file) = TempFileLease::create_in(dir.path(), "sst-index").unwrap();
            path = lease.path().to_path_buf();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn output_guard_deletes_unless_committed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        std::fs::write(&path, b"partial").unwrap();
        {
            let _guard = OutputGuard::new(path.clone());
        }
        assert!(!path.exists());

        std::fs::write(&path, b"complete").unwrap();
        {
            let guard = OutputGuard::new(path.clone());
            guard.commit();
        }
        assert!(path.exists());
        std::fs::remove_file(&path).unwrap();
    }
}
