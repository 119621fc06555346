//! adapter::lock
//!
//! Exclusive lock on a file store directory.
//!
//! # Invariants
//!
//! - A [`FileAdapter`](super::FileAdapter) holds the lock for its whole
//!   lifetime
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)
//!
//! # Example
//!
//! ```no_run
//! use schemata::adapter::{StoreLock, StorePaths};
//! use std::path::PathBuf;
//!
//! let paths = StorePaths::new(PathBuf::from("/data/schema"));
//! let lock = StoreLock::acquire(&paths).unwrap();
//! assert!(lock.is_held());
//!
//! // Lock released when dropped
//! drop(lock);
//! ```

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use super::paths::StorePaths;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("store is locked by another process")]
    AlreadyLocked,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on a store directory.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    /// Some while the lock is held.
    file: Option<File>,
}

impl StoreLock {
    /// Attempt to acquire the store lock.
    ///
    /// Creates the store directory if needed. Uses OS-level file locking via
    /// `fs2`, which works across processes.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(paths: &StorePaths) -> Result<Self, LockError> {
        paths.ensure_dirs().map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", paths.root().display(), e))
        })?;

        let path = paths.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Try to acquire the lock, returning None if already held.
    pub fn try_acquire(paths: &StorePaths) -> Result<Option<Self>, LockError> {
        match Self::acquire(paths) {
            Ok(lock) => Ok(Some(lock)),
            Err(LockError::AlreadyLocked) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_paths(temp: &TempDir) -> StorePaths {
        StorePaths::new(temp.path().join("store"))
    }

    #[test]
    fn lock_acquire_creates_store_dir() {
        let temp = TempDir::new().expect("create temp dir");
        let paths = test_paths(&temp);
        assert!(!paths.root().exists());

        let lock = StoreLock::acquire(&paths).expect("acquire lock");
        assert!(lock.is_held());
        assert!(paths.root().is_dir());
        assert_eq!(lock.path(), paths.lock_path());
    }

    #[test]
    fn lock_prevents_second_acquire() {
        let temp = TempDir::new().expect("create temp dir");
        let paths = test_paths(&temp);

        let _lock = StoreLock::acquire(&paths).expect("first acquire");
        let result = StoreLock::acquire(&paths);
        assert!(matches!(result, Err(LockError::AlreadyLocked)));
        assert!(StoreLock::try_acquire(&paths).expect("try").is_none());
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = TempDir::new().expect("create temp dir");
        let paths = test_paths(&temp);

        {
            let _lock = StoreLock::acquire(&paths).expect("first acquire");
        }

        let lock = StoreLock::acquire(&paths).expect("second acquire");
        assert!(lock.is_held());
    }

    #[test]
    fn release_is_idempotent() {
        let temp = TempDir::new().expect("create temp dir");
        let paths = test_paths(&temp);

        let mut lock = StoreLock::acquire(&paths).expect("acquire");
        lock.release().expect("first release");
        lock.release().expect("second release");
        assert!(!lock.is_held());

        let again = StoreLock::try_acquire(&paths)
            .expect("try_acquire")
            .expect("should get lock");
        assert!(again.is_held());
    }
}
