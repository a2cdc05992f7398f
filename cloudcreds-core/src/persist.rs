//! Whole-file load and save helpers shared by every store.
//!
//! Loads distinguish "file absent" (returned as `None`) from "file exists but
//! cannot be read". Saves write a sibling temporary file and rename it over the
//! target, so a crash mid-save leaves either the old or the new document.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Result, StoreError};
use crate::platform::{FilePermissions, PlatformPermissions, ensure_private_dir};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Strip a leading UTF-8 byte-order mark, which the Azure CLI sometimes
/// writes.
pub fn strip_bom(data: &[u8]) -> &[u8] {
  data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

/// Read a file, treating a missing file as `None`.
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
  match fs::read(path) {
    Ok(data) => Ok(Some(data)),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(source) => Err(StoreError::Load {
      path: path.to_path_buf(),
      source,
    }),
  }
}

/// Read a UTF-8 text file with any BOM removed, treating a missing file as
/// `None`.
pub fn read_optional_text(path: &Path) -> Result<Option<String>> {
  let Some(data) = read_optional(path)? else {
    return Ok(None);
  };
  String::from_utf8(strip_bom(&data).to_vec())
    .map(Some)
    .map_err(|e| StoreError::Parse {
      path: path.to_path_buf(),
      message: e.to_string(),
    })
}

/// Replace `path` with `contents`, creating private parent directories and
/// normalizing the file to owner-only access.
pub fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
  let write_err = |source: io::Error| StoreError::Write {
    path: path.to_path_buf(),
    source,
  };

  let parent = path
    .parent()
    .filter(|p| !p.as_os_str().is_empty())
    .unwrap_or_else(|| Path::new("."));
  ensure_private_dir(parent)?;

  let mut temp = NamedTempFile::new_in(parent).map_err(write_err)?;
  temp.write_all(contents).map_err(write_err)?;
  temp.as_file().sync_all().map_err(write_err)?;
  temp.persist(path).map_err(|e| write_err(e.error))?;

  PlatformPermissions::set_secure_file_permissions(path)
}

/// Serialize `value` as two-space indented JSON and persist it privately.
pub fn write_private_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
  let mut data = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Write {
    path: path.to_path_buf(),
    source: io::Error::other(e),
  })?;
  data.push(b'\n');
  write_private(path, &data)
}

/// Remove a file, treating a missing file as already removed.
pub fn remove_if_exists(path: &Path) -> Result<()> {
  match fs::remove_file(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(source) => Err(StoreError::Write {
      path: path.to_path_buf(),
      source,
    }),
  }
}

/// Remove a directory tree, treating a missing directory as already removed.
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
  match fs::remove_dir_all(path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
    Err(source) => Err(StoreError::Write {
      path: path.to_path_buf(),
      source,
    }),
  }
}
