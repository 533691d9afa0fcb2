use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// Process-exclusive advisory lock bound to a path inside the working
/// directory (spec §4.1). Acquisition is non-blocking: a lock already
/// held by another process is reported as a distinct condition, not a
/// generic I/O error.
pub struct WorkLock {
    path: PathBuf,
    file: File,
}

/// Another engine process already holds the lock for this working
/// directory.
#[derive(Debug, thiserror::Error)]
#[error("another crawl process is already running for this workdir")]
pub struct AlreadyRunning;

impl WorkLock {
    /// Acquire the lock, creating the lock file if needed. Returns
    /// `Ok(Err(AlreadyRunning))` distinctly from a genuine I/O failure so
    /// callers can exit without touching the Ledger.
    pub fn acquire(path: impl AsRef<Path>) -> std::io::Result<Result<Self, AlreadyRunning>> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Ok(Self { path, file })),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(Err(AlreadyRunning)),
            Err(e) => Err(e),
        }
    }

    /// Non-destructive check: is the lock currently held by some other
    /// process? Used by UI observers before attaching; never blocks.
    pub fn probe(path: impl AsRef<Path>) -> std::io::Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(false);
        }
        let file = OpenOptions::new().write(true).open(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                FileExt::unlock(&file)?;
                Ok(false)
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(true),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
