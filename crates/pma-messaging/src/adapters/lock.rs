//! # Data Directory Lock
//!
//! Keeps a second process from opening the same ledger. Uses `fs2` for
//! cross-platform file locking (flock on Unix, LockFile on Windows).

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from data directory locking.
#[derive(Debug, Error)]
pub enum LockError {
    /// Lock file could not be created or written.
    #[error("failed to create lock file {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another process holds the lock.
    #[error("ledger already in use{} ({})", .pid.map(|p| format!(" by process {p}")).unwrap_or_default(), .path.display())]
    AlreadyLocked { pid: Option<u32>, path: PathBuf },
}

/// Exclusive lock on a ledger data directory, released on drop.
///
/// ```ignore
/// let _lock = DataDirLock::acquire(Path::new("/var/lib/pma"))?;
/// let store = FileBackedKVStore::open("/var/lib/pma/ledger.db")?;
/// ```
#[derive(Debug)]
pub struct DataDirLock {
    file: File,
    path: PathBuf,
}

impl DataDirLock {
    const LOCK_FILE: &'static str = "LOCK";

    /// Takes the lock without waiting.
    pub fn acquire(data_dir: &Path) -> Result<Self, LockError> {
        let path = data_dir.join(Self::LOCK_FILE);
        let create_failed = |source| LockError::CreateFailed {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(data_dir).map_err(create_failed)?;
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(create_failed)?;

        if file.try_lock_exclusive().is_err() {
            return Err(LockError::AlreadyLocked {
                pid: Self::read_existing_pid(&path),
                path: path.clone(),
            });
        }

        file.set_len(0).map_err(create_failed)?;
        writeln!(file, "{}", std::process::id()).map_err(create_failed)?;
        file.sync_all().map_err(create_failed)?;

        Ok(Self { file, path })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        #[allow(clippy::incompatible_msrv)]
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let dir = tempfile::tempdir().unwrap();

        let lock = DataDirLock::acquire(dir.path()).unwrap();
        let err = DataDirLock::acquire(dir.path()).unwrap_err();
        match err {
            LockError::AlreadyLocked { pid, .. } => assert_eq!(pid, Some(std::process::id())),
            other => panic!("unexpected error: {other}"),
        }

        drop(lock);
        assert!(DataDirLock::acquire(dir.path()).is_ok());
    }
}
