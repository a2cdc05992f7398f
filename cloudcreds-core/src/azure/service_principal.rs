//! Federated-credential entries for OIDC service principals.
//!
//! The file is a JSON array with at most one entry per client id. The Azure
//! CLI reads it to authenticate a service principal from a client assertion.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Result;
use crate::lock::{FileMutex, LockOptions};
use crate::persist;

pub const SERVICE_PRINCIPAL_ENTRIES_FILE: &str = "service_principal_entries.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePrincipalEntry {
  pub client_id: String,
  #[serde(default)]
  pub tenant: String,
  #[serde(default)]
  pub client_assertion: String,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl ServicePrincipalEntry {
  pub fn new(client_id: &str, tenant: &str, client_assertion: &str) -> Self {
    Self {
      client_id: client_id.to_string(),
      tenant: tenant.to_string(),
      client_assertion: client_assertion.to_string(),
      extra: Map::new(),
    }
  }
}

#[derive(Debug)]
pub struct ServicePrincipalEntryStore {
  path: PathBuf,
  mutex: FileMutex,
}

impl ServicePrincipalEntryStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self::with_lock_options(path, LockOptions::default())
  }

  pub fn with_lock_options(path: impl Into<PathBuf>, options: LockOptions) -> Self {
    Self {
      path: path.into(),
      mutex: FileMutex::new(options),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Read all entries. A missing or corrupt file reads as empty.
  pub fn load(&self) -> Result<Vec<ServicePrincipalEntry>> {
    let Some(data) = persist::read_optional(&self.path)? else {
      return Ok(Vec::new());
    };
    match serde_json::from_slice(persist::strip_bom(&data)) {
      Ok(entries) => Ok(entries),
      Err(e) => {
        debug!(path = %self.path.display(), error = %e, "Service principal entries are corrupt, starting fresh");
        Ok(Vec::new())
      }
    }
  }

  /// Insert `entry`, replacing the assertion and tenant of any entry with the
  /// same client id.
  pub fn upsert(&self, entry: ServicePrincipalEntry) -> Result<()> {
    if let Some(dir) = self.path.parent() {
      crate::platform::ensure_private_dir(dir)?;
    }

    let client_id = entry.client_id.clone();
    self.mutex.with_lock(&self.path, || {
      let mut entries = self.load()?;
      match entries.iter_mut().find(|e| e.client_id == entry.client_id) {
        Some(existing) => {
          existing.tenant = entry.tenant;
          existing.client_assertion = entry.client_assertion;
          existing.extra.extend(entry.extra);
        }
        None => entries.push(entry),
      }
      persist::write_private_json(&self.path, &entries)
    })?;

    debug!(path = %self.path.display(), client_id = %client_id, "Updated service principal entry");
    Ok(())
  }

  /// Drop the entry for `client_id`. Returns whether one was removed.
  pub fn remove(&self, client_id: &str) -> Result<bool> {
    if !self.path.exists() {
      return Ok(false);
    }

    let removed = self.mutex.with_lock(&self.path, || {
      let mut entries = self.load()?;
      let before = entries.len();
      entries.retain(|e| e.client_id != client_id);
      if entries.len() == before {
        return Ok(false);
      }
      persist::write_private_json(&self.path, &entries)?;
      Ok(true)
    })?;

    if removed {
      debug!(path = %self.path.display(), client_id, "Removed service principal entry");
    }
    Ok(removed)
  }
}
