//! XDG environment variable management for testing
//!
//! The default AWS and Azure base paths are derived from the XDG config
//! directory, so tests that exercise path resolution swap it for a per-test
//! temporary directory.

use std::env;
use std::path::PathBuf;

use tempfile::TempDir;

/// A test environment that overrides `XDG_CONFIG_HOME` to use a per-test
/// temporary directory
pub struct EnvTestGuard {
  /// The temporary directory that will be used for XDG directories
  pub temp_dir: TempDir,
  /// The original XDG_CONFIG_HOME value, if any
  original_config_home: Option<String>,
}

impl Default for EnvTestGuard {
  fn default() -> Self {
    Self::new()
  }
}

impl EnvTestGuard {
  pub const XDG_CONFIG_HOME: &'static str = "XDG_CONFIG_HOME";

  /// Create a new test environment with an overridden XDG config directory
  pub fn new() -> Self {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let original_config_home = env::var(Self::XDG_CONFIG_HOME).ok();

    let config_dir = temp_dir.path().join("config");
    std::fs::create_dir_all(&config_dir).expect("Failed to create config directory");
    unsafe {
      env::set_var(Self::XDG_CONFIG_HOME, &config_dir);
    }

    Self {
      temp_dir,
      original_config_home,
    }
  }

  /// Get the path to the XDG config directory
  pub fn config_dir(&self) -> PathBuf {
    self.temp_dir.path().join("config")
  }
}

impl Drop for EnvTestGuard {
  fn drop(&mut self) {
    match &self.original_config_home {
      Some(val) => unsafe {
        env::set_var(Self::XDG_CONFIG_HOME, val);
      },
      None => unsafe {
        env::remove_var(Self::XDG_CONFIG_HOME);
      },
    }
  }
}
