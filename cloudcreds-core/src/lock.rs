//! # File Locking
//!
//! Cross-process mutual exclusion for shared credential files. Each target
//! file `F` is guarded by an OS-level advisory lock on a sibling `F.lock`,
//! polled at a fixed interval until a bounded timeout elapses. The lock is
//! released when the guard is dropped, so early returns and unwinding panics
//! both give it back.

use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Result, StoreError};

/// Default wall-clock bound on a lock wait.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);
/// Default interval between lock attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Timing parameters for lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
  pub timeout: Duration,
  pub poll_interval: Duration,
}

impl Default for LockOptions {
  fn default() -> Self {
    Self {
      timeout: DEFAULT_LOCK_TIMEOUT,
      poll_interval: DEFAULT_POLL_INTERVAL,
    }
  }
}

/// Path of the lock file guarding `target`.
pub fn lock_path_for(target: &Path) -> PathBuf {
  let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".lock");
  target.with_file_name(name)
}

/// An acquired advisory lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct FileLock {
  file: Option<File>,
  path: PathBuf,
}

impl FileLock {
  /// Block until `lock_path` is locked using the default timing.
  pub fn acquire(lock_path: &Path) -> Result<Self> {
    Self::acquire_with(lock_path, &LockOptions::default(), None)
  }

  /// Block until `lock_path` is locked, the timeout elapses, or `cancel` is
  /// set.
  pub fn acquire_with(lock_path: &Path, options: &LockOptions, cancel: Option<&AtomicBool>) -> Result<Self> {
    let file = OpenOptions::new()
      .create(true)
      .truncate(false)
      .read(true)
      .write(true)
      .open(lock_path)
      .map_err(|source| StoreError::Lock {
        path: lock_path.to_path_buf(),
        source,
      })?;

    let started = Instant::now();
    loop {
      match file.try_lock() {
        Ok(()) => {
          debug!(lock_file = %lock_path.display(), "Acquired file lock");
          return Ok(Self {
            file: Some(file),
            path: lock_path.to_path_buf(),
          });
        }
        Err(TryLockError::WouldBlock) => {}
        Err(TryLockError::Error(source)) => {
          return Err(StoreError::Lock {
            path: lock_path.to_path_buf(),
            source,
          });
        }
      }

      if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
        return Err(StoreError::LockCancelled {
          path: lock_path.to_path_buf(),
        });
      }
      if started.elapsed() >= options.timeout {
        return Err(StoreError::LockTimeout {
          path: lock_path.to_path_buf(),
        });
      }

      debug!(lock_file = %lock_path.display(), "Waiting for file lock");
      thread::sleep(options.poll_interval);
    }
  }

  /// Path of the lock file.
  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Release the lock now, reporting any error from the OS.
  pub fn release(mut self) -> Result<()> {
    match self.file.take() {
      Some(file) => file.unlock().map_err(|source| StoreError::Lock {
        path: self.path.clone(),
        source,
      }),
      None => Ok(()),
    }
  }
}

impl Drop for FileLock {
  fn drop(&mut self) {
    if let Some(file) = self.file.take()
      && let Err(e) = file.unlock()
    {
      debug!(lock_file = %self.path.display(), error = %e, "Failed to release file lock");
    }
  }
}

/// In-process mutex paired with the per-file advisory lock.
///
/// Every store owns one; calls on the same store instance serialize on the
/// mutex, and calls from other instances or processes serialize on the file
/// lock.
#[derive(Debug, Default)]
pub struct FileMutex {
  inner: Mutex<()>,
  options: LockOptions,
}

impl FileMutex {
  pub fn new(options: LockOptions) -> Self {
    Self {
      inner: Mutex::new(()),
      options,
    }
  }

  pub fn options(&self) -> &LockOptions {
    &self.options
  }

  /// Run `f` while holding both the mutex and the lock guarding `target`.
  pub fn with_lock<T>(&self, target: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let _guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
    let _lock = FileLock::acquire_with(&lock_path_for(target), &self.options, None)?;
    f()
  }
}
