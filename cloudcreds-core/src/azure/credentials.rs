//! Per-provider Azure credential records.
//!
//! One JSON document per provider at `<base>/<provider>/credentials.json`.
//! Unlike the AWS files there is no section multiplexing: a write for any
//! identity replaces the whole record.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config;
use crate::credentials::{Applied, AzureCredentials, CredentialRecord};
use crate::error::{Result, StoreError};
use crate::lock::{FileMutex, LockOptions};
use crate::persist;

pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Manages Azure credential records beneath a base directory.
#[derive(Debug)]
pub struct AzureFileManager {
  base_dir: PathBuf,
  mutex: FileMutex,
}

impl AzureFileManager {
  pub fn new(base_dir: impl Into<PathBuf>) -> Self {
    Self::with_lock_options(base_dir, LockOptions::default())
  }

  pub fn with_lock_options(base_dir: impl Into<PathBuf>, options: LockOptions) -> Self {
    Self {
      base_dir: base_dir.into(),
      mutex: FileMutex::new(options),
    }
  }

  pub fn base_dir(&self) -> &Path {
    &self.base_dir
  }

  pub fn display_path(&self) -> String {
    config::display_path(&self.base_dir)
  }

  pub fn provider_dir(&self, provider: &str) -> PathBuf {
    self.base_dir.join(provider)
  }

  pub fn credentials_path(&self, provider: &str) -> PathBuf {
    self.provider_dir(provider).join(CREDENTIALS_FILE)
  }

  /// Persist an Azure record; other kinds are not applicable.
  pub fn setup_files(&self, provider: &str, identity: &str, record: &CredentialRecord) -> Result<Applied> {
    match record.as_azure() {
      Some(creds) => {
        self.write_credentials(provider, identity, creds)?;
        Ok(Applied::Written)
      }
      None => Ok(Applied::NotApplicable),
    }
  }

  /// Replace the provider's record with `creds`.
  pub fn write_credentials(&self, provider: &str, identity: &str, creds: &AzureCredentials) -> Result<()> {
    let path = self.credentials_path(provider);
    debug!(
      provider,
      identity,
      credentials_file = %path.display(),
      tenant_id = %creds.tenant_id,
      subscription_id = %creds.subscription_id,
      "Writing Azure credentials"
    );

    if let Some(dir) = path.parent() {
      crate::platform::ensure_private_dir(dir)?;
    }
    self
      .mutex
      .with_lock(&path, || persist::write_private_json(&path, creds))?;

    debug!(provider, identity, credentials_file = %path.display(), "Successfully wrote Azure credentials");
    Ok(())
  }

  /// Read the provider's record. A missing or undecodable file is an error.
  pub fn load_credentials(&self, provider: &str) -> Result<AzureCredentials> {
    let path = self.credentials_path(provider);
    let data = persist::read_optional(&path)?.ok_or_else(|| StoreError::Load {
      path: path.clone(),
      source: io::Error::from(io::ErrorKind::NotFound),
    })?;
    serde_json::from_slice(persist::strip_bom(&data)).map_err(|e| StoreError::Parse {
      path,
      message: e.to_string(),
    })
  }

  pub fn credentials_exist(&self, provider: &str) -> bool {
    self.credentials_path(provider).is_file()
  }

  /// Remove the provider's record. Missing files are not an error.
  pub fn delete_identity(&self, provider: &str, identity: &str) -> Result<()> {
    let path = self.credentials_path(provider);
    if !path.exists() {
      debug!(provider, identity, "No Azure credentials to remove");
      return Ok(());
    }

    self.mutex.with_lock(&path, || persist::remove_if_exists(&path))?;
    debug!(provider, identity, credentials_file = %path.display(), "Removed Azure credentials");
    Ok(())
  }

  /// Remove every file for `provider`.
  pub fn cleanup(&self, provider: &str) -> Result<()> {
    let dir = self.provider_dir(provider);
    debug!(provider, directory = %dir.display(), "Cleaning up Azure files directory");
    persist::remove_dir_if_exists(&dir)
  }

  /// Remove the whole base directory.
  pub fn cleanup_all(&self) -> Result<()> {
    debug!(directory = %self.base_dir.display(), "Cleaning up all Azure files");
    persist::remove_dir_if_exists(&self.base_dir)
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::TempDir;

  use super::*;

  fn manager() -> (TempDir, AzureFileManager) {
    let temp_dir = TempDir::new().unwrap();
    let manager = AzureFileManager::new(temp_dir.path());
    (temp_dir, manager)
  }

  fn creds(token: &str) -> AzureCredentials {
    AzureCredentials {
      access_token: token.to_string(),
      token_type: "Bearer".to_string(),
      tenant_id: "T1".to_string(),
      subscription_id: "S1".to_string(),
      location: "eastus".to_string(),
      expiration: "2030-01-01T00:00:00Z".to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn write_then_load_returns_record() {
    let (_temp_dir, manager) = manager();

    manager.write_credentials("corp", "dev", &creds("tok-1")).unwrap();

    assert!(manager.credentials_exist("corp"));
    assert_eq!(manager.load_credentials("corp").unwrap(), creds("tok-1"));
    assert_eq!(
      manager.credentials_path("corp"),
      manager.base_dir().join("corp").join("credentials.json")
    );
  }

  #[test]
  fn later_identity_replaces_record() {
    let (_temp_dir, manager) = manager();

    manager.write_credentials("corp", "dev", &creds("tok-1")).unwrap();
    manager.write_credentials("corp", "prod", &creds("tok-2")).unwrap();

    assert_eq!(manager.load_credentials("corp").unwrap().access_token, "tok-2");
  }

  #[test]
  fn load_errors_distinguish_missing_from_corrupt() {
    let (_temp_dir, manager) = manager();
    assert!(matches!(manager.load_credentials("corp"), Err(StoreError::Load { .. })));

    fs::create_dir_all(manager.provider_dir("corp")).unwrap();
    fs::write(manager.credentials_path("corp"), "not json").unwrap();
    assert!(matches!(manager.load_credentials("corp"), Err(StoreError::Parse { .. })));
  }

  #[test]
  fn setup_files_ignores_aws_records() {
    let (_temp_dir, manager) = manager();
    let record = CredentialRecord::Aws(Default::default());

    assert_eq!(manager.setup_files("corp", "dev", &record).unwrap(), Applied::NotApplicable);
    assert!(!manager.credentials_exist("corp"));

    let record = CredentialRecord::Azure(creds("tok"));
    assert_eq!(manager.setup_files("corp", "dev", &record).unwrap(), Applied::Written);
    assert!(manager.credentials_exist("corp"));
  }

  #[test]
  fn delete_and_cleanup_tolerate_missing_files() {
    let (_temp_dir, manager) = manager();
    manager.delete_identity("corp", "dev").unwrap();
    manager.cleanup("corp").unwrap();

    manager.write_credentials("corp", "dev", &creds("tok")).unwrap();
    manager.delete_identity("corp", "dev").unwrap();
    assert!(!manager.credentials_exist("corp"));

    manager.write_credentials("corp", "dev", &creds("tok")).unwrap();
    manager.cleanup_all().unwrap();
    assert!(!manager.base_dir().exists());
  }

  #[cfg(unix)]
  #[test]
  fn record_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let (_temp_dir, manager) = manager();
    manager.write_credentials("corp", "dev", &creds("tok")).unwrap();

    let mode = fs::metadata(manager.credentials_path("corp")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
  }
}
