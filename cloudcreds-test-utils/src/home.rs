//! HOME directory management for testing
//!
//! Credential files for the Azure CLI live under `~/.azure`, and legacy AWS
//! paths are probed under `~/.aws`. These guards point HOME at a scratch
//! directory so tests never touch the real files.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tempfile::TempDir;

// HOME is process-wide; guards from parallel tests take turns.
static HOME_LOCK: Mutex<()> = Mutex::new(());

/// Overrides `HOME` with a temporary directory for the guard's lifetime and
/// restores the previous value (or unsets it) on drop.
pub struct HomeEnvTestGuard {
  /// The temporary directory that will be used as HOME
  pub temp_dir: TempDir,
  original_home: Option<String>,
  _serial: MutexGuard<'static, ()>,
}

impl Default for HomeEnvTestGuard {
  fn default() -> Self {
    Self::new()
  }
}

impl HomeEnvTestGuard {
  pub const HOME: &'static str = "HOME";

  /// Create a new test environment with a temporary HOME directory
  pub fn new() -> Self {
    let serial = HOME_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let original_home = env::var(Self::HOME).ok();

    unsafe {
      env::set_var(Self::HOME, temp_dir.path());
    }

    Self {
      temp_dir,
      original_home,
      _serial: serial,
    }
  }

  /// Get the path to the temporary HOME directory
  pub fn home_dir(&self) -> &Path {
    self.temp_dir.path()
  }

  /// Get the path to a file in the temporary HOME directory
  pub fn home_path(&self, relative_path: &str) -> PathBuf {
    self.temp_dir.path().join(relative_path)
  }

  /// The `~/.azure` directory inside the temporary HOME, created on demand.
  pub fn azure_dir(&self) -> PathBuf {
    let dir = self.home_path(".azure");
    fs::create_dir_all(&dir).expect("Failed to create .azure directory");
    dir
  }
}

impl Drop for HomeEnvTestGuard {
  fn drop(&mut self) {
    match &self.original_home {
      Some(val) => unsafe {
        env::set_var(Self::HOME, val);
      },
      None => unsafe {
        env::remove_var(Self::HOME);
      },
    }
  }
}
