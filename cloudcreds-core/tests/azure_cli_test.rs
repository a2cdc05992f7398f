use std::fs;

use cloudcreds_core::azure::msal::MSAL_CACHE_FILE;
use cloudcreds_core::{Applied, AzureCliFiles, AzureCredentials, CredentialRecord, StoreContext};
use cloudcreds_test_utils::{HomeEnvTestGuard, service_principal_token, user_token};
use serde_json::Value;
use tempfile::TempDir;

fn user_record(oid: &str, subscription: &str) -> CredentialRecord {
  CredentialRecord::Azure(AzureCredentials {
    access_token: user_token(oid, "T1", "alice@example.com"),
    token_type: "Bearer".to_string(),
    tenant_id: "T1".to_string(),
    subscription_id: subscription.to_string(),
    expiration: "2030-01-01T00:00:00Z".to_string(),
    ..Default::default()
  })
}

fn sp_record(client_id: &str) -> CredentialRecord {
  CredentialRecord::Azure(AzureCredentials {
    access_token: service_principal_token("O9", "T1", client_id),
    token_type: "Bearer".to_string(),
    tenant_id: "T1".to_string(),
    subscription_id: "S2".to_string(),
    expiration: "2030-01-01T00:00:00Z".to_string(),
    client_id: Some(client_id.to_string()),
    is_service_principal: true,
    ..Default::default()
  })
}

#[test]
fn user_and_service_principal_imports_coexist() {
  let temp_dir = TempDir::new().unwrap();
  let files = AzureCliFiles::new(temp_dir.path());

  files.update_azure_cli_files(&user_record("U1", "S1")).into_result().unwrap();
  files.update_azure_cli_files(&sp_record("C1")).into_result().unwrap();

  let raw: Value = serde_json::from_slice(&fs::read(temp_dir.path().join(MSAL_CACHE_FILE)).unwrap()).unwrap();
  let accounts = raw["Account"].as_object().unwrap();
  assert_eq!(accounts.len(), 1);
  assert!(accounts.keys().next().unwrap().starts_with("U1.T1-"));

  let apps = raw["AppMetadata"].as_object().unwrap();
  assert_eq!(apps.len(), 1);
  assert!(apps.contains_key("appmetadata-login.microsoftonline.com-C1"));

  let tokens = raw["AccessToken"].as_object().unwrap();
  assert_eq!(tokens.len(), 2);
  let dash_prefixed: Vec<_> = tokens.keys().filter(|k| k.starts_with('-')).collect();
  assert_eq!(dash_prefixed.len(), 1);
  assert_eq!(tokens[dash_prefixed[0].as_str()]["client_id"], "C1");
}

#[test]
fn user_import_never_produces_dash_keys() {
  let temp_dir = TempDir::new().unwrap();
  let files = AzureCliFiles::new(temp_dir.path());

  files.update_azure_cli_files(&user_record("U1", "S1")).into_result().unwrap();

  let cache = files.msal().load().unwrap();
  assert!(cache.access_tokens().unwrap().keys().all(|k| !k.starts_with('-')));
  assert!(!cache.accounts().unwrap().is_empty());
  assert!(cache.app_metadata().is_none());
}

#[test]
fn profile_written_by_cli_with_bom_is_merged() {
  let temp_dir = TempDir::new().unwrap();
  let files = AzureCliFiles::new(temp_dir.path());
  let body = br#"{"installationId":"inst-1","subscriptions":[{"id":"S0","tenantId":"T0","isDefault":true}]}"#;
  let mut with_bom = vec![0xEF, 0xBB, 0xBF];
  with_bom.extend_from_slice(body);
  fs::write(files.profile().path(), with_bom).unwrap();

  files.update_azure_cli_files(&user_record("U1", "S1")).into_result().unwrap();

  let profile = files.profile().load().unwrap();
  assert_eq!(profile.installation_id, "inst-1");
  assert_eq!(profile.subscriptions.len(), 2);
  assert_eq!(profile.defaults().map(|s| s.id.as_str()).collect::<Vec<_>>(), vec!["S1"]);
}

#[test]
fn corrupt_cli_files_self_heal() {
  let temp_dir = TempDir::new().unwrap();
  let files = AzureCliFiles::new(temp_dir.path());
  fs::write(files.msal().path(), "\u{feff}{ broken").unwrap();
  fs::write(files.profile().path(), "[]garbage").unwrap();

  let report = files.update_azure_cli_files(&user_record("U1", "S1"));

  assert!(report.is_complete());
  assert_eq!(report.applied, Applied::Written);
  assert_eq!(files.msal().load().unwrap().accounts().unwrap().len(), 1);
  assert_eq!(files.profile().load().unwrap().subscriptions.len(), 1);
}

#[test]
fn context_defaults_to_home_azure_directory() {
  let guard = HomeEnvTestGuard::new();
  let context = StoreContext::new(
    cloudcreds_core::ConfigDirs::with_root(guard.home_path("config")),
    Default::default(),
  );

  let files = context.azure_cli_files().unwrap();
  files.update_azure_cli_files(&user_record("U1", "S1")).into_result().unwrap();

  assert_eq!(files.dir(), guard.home_path(".azure"));
  assert!(guard.azure_dir().join("azureProfile.json").is_file());
  assert!(guard.azure_dir().join("msal_token_cache.json").is_file());
}
