//! Platform-specific permission handling
//!
//! Credential files are normalized to owner-only read/write and their
//! directories to owner-only read/write/execute. On Windows the ACLs inherited
//! from the user profile already restrict access, so the operations are
//! no-ops there.

use std::path::Path;

use crate::error::{Result, StoreError};

/// Owner read/write.
pub const PERMISSION_RW: u32 = 0o600;
/// Owner read/write/execute.
pub const PERMISSION_RWX: u32 = 0o700;

/// Trait for platform-specific file permission operations
pub trait FilePermissions {
  /// Restrict a credential file to its owner
  fn set_secure_file_permissions(path: &Path) -> Result<()>;

  /// Restrict a directory holding credential files to its owner
  fn set_secure_dir_permissions(path: &Path) -> Result<()>;

  /// Check if a file is inaccessible to group and others
  fn has_secure_permissions(path: &Path) -> Result<bool>;
}

#[cfg(unix)]
mod unix {
  use std::fs;
  use std::os::unix::fs::PermissionsExt;
  use std::path::Path;

  use super::{FilePermissions, PERMISSION_RW, PERMISSION_RWX};
  use crate::error::{Result, StoreError};

  /// Unix implementation using chmod-style permissions
  pub struct UnixFilePermissions;

  fn set_mode(path: &Path, mode: u32) -> Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|source| StoreError::Permission {
      path: path.to_path_buf(),
      source,
    })
  }

  impl FilePermissions for UnixFilePermissions {
    fn set_secure_file_permissions(path: &Path) -> Result<()> {
      set_mode(path, PERMISSION_RW)
    }

    fn set_secure_dir_permissions(path: &Path) -> Result<()> {
      set_mode(path, PERMISSION_RWX)
    }

    fn has_secure_permissions(path: &Path) -> Result<bool> {
      let metadata = fs::metadata(path).map_err(|source| StoreError::Load {
        path: path.to_path_buf(),
        source,
      })?;
      Ok(metadata.permissions().mode() & 0o077 == 0)
    }
  }
}

#[cfg(windows)]
mod windows {
  use std::path::Path;

  use super::FilePermissions;
  use crate::error::Result;

  /// Windows relies on profile ACLs
  pub struct WindowsFilePermissions;

  impl FilePermissions for WindowsFilePermissions {
    fn set_secure_file_permissions(_path: &Path) -> Result<()> {
      Ok(())
    }

    fn set_secure_dir_permissions(_path: &Path) -> Result<()> {
      Ok(())
    }

    fn has_secure_permissions(_path: &Path) -> Result<bool> {
      Ok(true)
    }
  }
}

#[cfg(unix)]
pub use unix::UnixFilePermissions as PlatformPermissions;
#[cfg(windows)]
pub use windows::WindowsFilePermissions as PlatformPermissions;

/// Create `dir` (and parents) and normalize it to owner-only access.
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
  std::fs::create_dir_all(dir).map_err(|source| StoreError::Write {
    path: dir.to_path_buf(),
    source,
  })?;
  PlatformPermissions::set_secure_dir_permissions(dir)
}

#[cfg(all(test, unix))]
mod tests {
  use std::fs;
  use std::os::unix::fs::PermissionsExt;

  use tempfile::TempDir;

  use super::*;

  #[test]
  fn normalizes_file_to_owner_only() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("credentials");
    fs::write(&path, "x").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

    assert!(!PlatformPermissions::has_secure_permissions(&path).unwrap());
    PlatformPermissions::set_secure_file_permissions(&path).unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert!(PlatformPermissions::has_secure_permissions(&path).unwrap());
  }

  #[test]
  fn ensure_private_dir_creates_nested_dirs() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("aws").join("acme");

    ensure_private_dir(&dir).unwrap();

    let mode = fs::metadata(&dir).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o700);
  }
}
