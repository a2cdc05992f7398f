//! # Azure CLI Synchronization
//!
//! Makes a session obtained elsewhere usable by the Azure CLI and the
//! Terraform providers that read its files, as if `az login` had run. The
//! MSAL cache, the subscription profile and the federated-credential entries
//! are updated independently: a failure in one step is reported but does not
//! stop the others.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::jwt;
use super::msal::{MSAL_CACHE_FILE, MsalCacheStore};
use super::profile::{AZURE_PROFILE_FILE, ActiveSubscription, AzureProfileStore, PrincipalType};
use super::service_principal::{SERVICE_PRINCIPAL_ENTRIES_FILE, ServicePrincipalEntry, ServicePrincipalEntryStore};
use crate::credentials::{Applied, AzureCredentials, CredentialRecord};
use crate::error::{Result, StoreError};
use crate::lock::LockOptions;

/// Outcome of a synchronization run.
#[derive(Debug)]
pub struct SyncReport {
  pub applied: Applied,
  /// Steps that failed, in the order they ran.
  pub failures: Vec<StoreError>,
}

impl SyncReport {
  fn not_applicable() -> Self {
    Self {
      applied: Applied::NotApplicable,
      failures: Vec::new(),
    }
  }

  pub fn is_complete(&self) -> bool {
    self.failures.is_empty()
  }

  /// Collapse the failures into one result.
  pub fn into_result(self) -> Result<Applied> {
    StoreError::from_many(self.failures)?;
    Ok(self.applied)
  }
}

/// The Azure CLI's own files inside one directory (normally `~/.azure`).
#[derive(Debug)]
pub struct AzureCliFiles {
  dir: PathBuf,
  msal: MsalCacheStore,
  profile: AzureProfileStore,
  service_principals: ServicePrincipalEntryStore,
}

impl AzureCliFiles {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self::with_lock_options(dir, LockOptions::default())
  }

  pub fn with_lock_options(dir: impl Into<PathBuf>, options: LockOptions) -> Self {
    let dir = dir.into();
    Self {
      msal: MsalCacheStore::with_lock_options(dir.join(MSAL_CACHE_FILE), options),
      profile: AzureProfileStore::with_lock_options(dir.join(AZURE_PROFILE_FILE), options),
      service_principals: ServicePrincipalEntryStore::with_lock_options(
        dir.join(SERVICE_PRINCIPAL_ENTRIES_FILE),
        options,
      ),
      dir,
    }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn msal(&self) -> &MsalCacheStore {
    &self.msal
  }

  pub fn profile(&self) -> &AzureProfileStore {
    &self.profile
  }

  pub fn service_principals(&self) -> &ServicePrincipalEntryStore {
    &self.service_principals
  }

  /// Update every Azure CLI file from `record`. AWS records are not
  /// applicable.
  pub fn update_azure_cli_files(&self, record: &CredentialRecord) -> SyncReport {
    let Some(creds) = record.as_azure() else {
      return SyncReport::not_applicable();
    };

    let mut failures = Vec::new();

    if let Err(e) = self.msal.import(creds) {
      debug!(error = %e, "Failed to update MSAL cache");
      failures.push(e);
    }

    if let Err(e) = self.update_profile(creds) {
      debug!(error = %e, "Failed to update Azure profile");
      failures.push(e);
    }

    if let Err(e) = self.update_service_principal_entry(creds) {
      debug!(error = %e, "Failed to update service principal entries");
      failures.push(e);
    }

    SyncReport {
      applied: Applied::Written,
      failures,
    }
  }

  fn update_profile(&self, creds: &AzureCredentials) -> Result<()> {
    let (username, principal_type) = match creds.client_id().filter(|_| creds.is_service_principal) {
      Some(client_id) => (client_id.to_string(), PrincipalType::ServicePrincipal),
      None => (jwt::username_or_fallback(&creds.access_token), PrincipalType::User),
    };

    self.profile.update(&ActiveSubscription {
      subscription_id: &creds.subscription_id,
      tenant_id: &creds.tenant_id,
      username: &username,
      principal_type,
    })
  }

  /// Record the client assertion of an OIDC service principal. Sessions
  /// without a readable token file are skipped.
  fn update_service_principal_entry(&self, creds: &AzureCredentials) -> Result<()> {
    let Some(client_id) = creds.client_id().filter(|_| creds.is_service_principal) else {
      return Ok(());
    };
    let Some(token_file) = creds.token_file_path() else {
      debug!(client_id, "No federated token file, skipping service principal entry");
      return Ok(());
    };

    let assertion = match fs::read_to_string(token_file) {
      Ok(contents) => contents.trim().to_string(),
      Err(e) => {
        debug!(client_id, token_file, error = %e, "Federated token file unreadable, skipping service principal entry");
        return Ok(());
      }
    };
    if assertion.is_empty() {
      debug!(client_id, token_file, "Federated token file is empty, skipping service principal entry");
      return Ok(());
    }

    self
      .service_principals
      .upsert(ServicePrincipalEntry::new(client_id, &creds.tenant_id, &assertion))
  }
}

#[cfg(test)]
mod tests {
  use cloudcreds_test_utils::{service_principal_token, user_token};
  use tempfile::TempDir;

  use super::*;
  use crate::credentials::AwsCredentials;

  fn user_record() -> CredentialRecord {
    CredentialRecord::Azure(AzureCredentials {
      access_token: user_token("U1", "T1", "alice@example.com"),
      tenant_id: "T1".to_string(),
      subscription_id: "S1".to_string(),
      expiration: "2030-01-01T00:00:00Z".to_string(),
      ..Default::default()
    })
  }

  #[test]
  fn user_session_updates_cache_and_profile() {
    let temp_dir = TempDir::new().unwrap();
    let files = AzureCliFiles::new(temp_dir.path());

    let report = files.update_azure_cli_files(&user_record());

    assert!(report.is_complete());
    assert_eq!(report.applied, Applied::Written);
    assert_eq!(files.msal().load().unwrap().accounts().unwrap().len(), 1);
    let profile = files.profile().load().unwrap();
    let entry = profile.subscription("S1").unwrap();
    assert_eq!(entry.user.as_ref().unwrap().name, "alice@example.com");
    assert!(!files.service_principals().path().exists());
  }

  #[test]
  fn oidc_session_records_client_assertion() {
    let temp_dir = TempDir::new().unwrap();
    let token_file = temp_dir.path().join("federated-token");
    std::fs::write(&token_file, "assertion-jwt\n").unwrap();
    let files = AzureCliFiles::new(temp_dir.path().join(".azure"));
    let record = CredentialRecord::Azure(AzureCredentials {
      access_token: service_principal_token("O1", "T1", "C1"),
      tenant_id: "T1".to_string(),
      subscription_id: "S1".to_string(),
      expiration: "2030-01-01T00:00:00Z".to_string(),
      client_id: Some("C1".to_string()),
      is_service_principal: true,
      token_file_path: Some(token_file.display().to_string()),
      ..Default::default()
    });

    files.update_azure_cli_files(&record).into_result().unwrap();

    let entries = files.service_principals().load().unwrap();
    assert_eq!(entries, vec![ServicePrincipalEntry::new("C1", "T1", "assertion-jwt")]);
    let cache = files.msal().load().unwrap();
    assert!(cache.accounts().is_none());
    assert_eq!(cache.app_metadata().unwrap().len(), 1);
    let profile = files.profile().load().unwrap();
    assert_eq!(profile.subscription("S1").unwrap().user.as_ref().unwrap().kind, "servicePrincipal");
  }

  #[test]
  fn failed_cache_step_does_not_block_profile() {
    let temp_dir = TempDir::new().unwrap();
    let files = AzureCliFiles::new(temp_dir.path());
    let record = CredentialRecord::Azure(AzureCredentials {
      access_token: "opaque".to_string(),
      tenant_id: "T1".to_string(),
      subscription_id: "S1".to_string(),
      ..Default::default()
    });

    let report = files.update_azure_cli_files(&record);

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(report.failures[0], StoreError::Validation(_)));
    assert!(files.profile().load().unwrap().subscription("S1").is_some());
  }

  #[test]
  fn aws_records_are_not_applicable() {
    let temp_dir = TempDir::new().unwrap();
    let files = AzureCliFiles::new(temp_dir.path().join(".azure"));

    let report = files.update_azure_cli_files(&CredentialRecord::Aws(AwsCredentials::default()));

    assert_eq!(report.applied, Applied::NotApplicable);
    assert!(!files.dir().exists());
  }
}
