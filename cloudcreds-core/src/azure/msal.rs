//! # MSAL Token Cache
//!
//! Builds and merges the JSON token cache read by Microsoft's authentication
//! libraries (and so by the Azure CLI and the Terraform azurerm/azuread
//! providers). The cache has three tables this module writes:
//!
//! - `AccessToken`: one entry per (principal, client, tenant, scope)
//! - `Account`: the signed-in human principal, for user sessions only
//! - `AppMetadata`: the application, for service-principal sessions only
//!
//! Any other top-level key already in the file is carried through untouched,
//! and entries belonging to other principals or scopes are never removed.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::jwt::{self, Claims};
use crate::credentials::AzureCredentials;
use crate::error::{Result, StoreError};
use crate::lock::{FileMutex, LockOptions};
use crate::persist;

pub const MSAL_CACHE_FILE: &str = "msal_token_cache.json";

/// Authority host for the public cloud.
pub const ENVIRONMENT: &str = "login.microsoftonline.com";
/// Public client id of the Azure CLI, used for user sessions.
pub const AZURE_CLI_CLIENT_ID: &str = "04b07795-8ddb-461a-bbee-02f9e1bf7b46";

pub const MANAGEMENT_USER_SCOPE: &str =
  "https://management.azure.com/.default https://management.azure.com/user_impersonation";
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
pub const KEY_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

const ACCESS_TOKEN_TABLE: &str = "AccessToken";
const ACCOUNT_TABLE: &str = "Account";
const APP_METADATA_TABLE: &str = "AppMetadata";

/// The human account behind a user session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsalAccount {
  pub object_id: String,
  pub username: String,
}

/// Identifiers shared by every cache entry for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsalIdentity {
  /// `<oid>.<tenant>` for users, empty for service principals.
  pub home_account_id: String,
  pub client_id: String,
  pub realm: String,
  /// Present for user sessions only.
  pub account: Option<MsalAccount>,
}

impl MsalIdentity {
  pub fn user(object_id: &str, tenant_id: &str, username: &str) -> Self {
    Self {
      home_account_id: format!("{object_id}.{tenant_id}"),
      client_id: AZURE_CLI_CLIENT_ID.to_string(),
      realm: tenant_id.to_string(),
      account: Some(MsalAccount {
        object_id: object_id.to_string(),
        username: username.to_string(),
      }),
    }
  }

  pub fn service_principal(client_id: &str, tenant_id: &str) -> Self {
    Self {
      home_account_id: String::new(),
      client_id: client_id.to_string(),
      realm: tenant_id.to_string(),
      account: None,
    }
  }

  /// Derive the identity from a credential record, decoding the access token
  /// for user sessions.
  pub fn from_credentials(creds: &AzureCredentials) -> Result<Self> {
    if let Some(client_id) = creds.client_id()
      && creds.is_service_principal
    {
      return Ok(Self::service_principal(client_id, &creds.tenant_id));
    }

    let claims = Claims::decode(&creds.access_token)?;
    let object_id = claims.oid()?;
    let username = claims.username().unwrap_or(jwt::UNKNOWN_USERNAME);
    Ok(Self::user(object_id, &creds.tenant_id, username))
  }

  pub fn is_service_principal(&self) -> bool {
    self.account.is_none()
  }

  /// Scope of the primary management-plane token.
  pub fn management_scope(&self) -> &'static str {
    if self.is_service_principal() {
      MANAGEMENT_SCOPE
    } else {
      MANAGEMENT_USER_SCOPE
    }
  }

  pub fn access_token_key(&self, target: &str) -> String {
    format!(
      "{}-{ENVIRONMENT}-accesstoken-{}-{}-{target}",
      self.home_account_id, self.client_id, self.realm
    )
  }

  pub fn account_key(&self) -> String {
    format!("{}-{ENVIRONMENT}-{}", self.home_account_id, self.realm)
  }

  pub fn app_metadata_key(&self) -> String {
    format!("appmetadata-{ENVIRONMENT}-{}", self.client_id)
  }
}

/// A bearer token for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopedToken<'a> {
  pub secret: &'a str,
  pub target: &'a str,
  /// Written verbatim into `expires_on` and `extended_expires_on`.
  pub expires_on: &'a str,
}

impl<'a> ScopedToken<'a> {
  /// Primary token plus any Graph and Key Vault tokens carried by `creds`.
  pub fn from_credentials(creds: &'a AzureCredentials, identity: &MsalIdentity) -> Vec<Self> {
    let mut tokens = vec![ScopedToken {
      secret: &creds.access_token,
      target: identity.management_scope(),
      expires_on: &creds.expiration,
    }];

    let secondary = [
      (&creds.graph_api_token, &creds.graph_api_expiration, GRAPH_SCOPE),
      (&creds.key_vault_token, &creds.key_vault_expiration, KEY_VAULT_SCOPE),
    ];
    for (token, expiration, target) in secondary {
      match token.as_deref().filter(|t| !t.is_empty()) {
        Some(secret) => tokens.push(ScopedToken {
          secret,
          target,
          expires_on: expiration.as_deref().unwrap_or_default(),
        }),
        None => debug!(scope = target, "No token available for scope, skipping cache entry"),
      }
    }

    tokens
  }
}

/// An in-memory MSAL cache document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MsalCache {
  doc: Map<String, Value>,
}

impl MsalCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse cache bytes, ignoring a leading byte-order mark.
  pub fn parse(data: &[u8]) -> serde_json::Result<Self> {
    let data = persist::strip_bom(data);
    if data.iter().all(u8::is_ascii_whitespace) {
      return Ok(Self::new());
    }
    let doc: Map<String, Value> = serde_json::from_slice(data)?;
    Ok(Self { doc })
  }

  pub fn as_map(&self) -> &Map<String, Value> {
    &self.doc
  }

  /// Entries of one table, if the table exists and is an object.
  pub fn table(&self, name: &str) -> Option<&Map<String, Value>> {
    self.doc.get(name).and_then(Value::as_object)
  }

  pub fn access_tokens(&self) -> Option<&Map<String, Value>> {
    self.table(ACCESS_TOKEN_TABLE)
  }

  pub fn accounts(&self) -> Option<&Map<String, Value>> {
    self.table(ACCOUNT_TABLE)
  }

  pub fn app_metadata(&self) -> Option<&Map<String, Value>> {
    self.table(APP_METADATA_TABLE)
  }

  fn upsert(&mut self, table: &str, key: String, entry: Value) {
    let mut entries = match self.doc.remove(table) {
      Some(Value::Object(map)) => map,
      _ => Map::new(),
    };
    entries.insert(key, entry);
    self.doc.insert(table.to_string(), Value::Object(entries));
  }

  /// Insert or replace the access token entry for `token.target`. Returns the
  /// cache key.
  pub fn upsert_access_token(&mut self, identity: &MsalIdentity, token: &ScopedToken<'_>, cached_at: i64) -> String {
    let key = identity.access_token_key(token.target);
    let entry = json!({
      "credential_type": "AccessToken",
      "secret": token.secret,
      "home_account_id": identity.home_account_id,
      "environment": ENVIRONMENT,
      "client_id": identity.client_id,
      "target": token.target,
      "realm": identity.realm,
      "token_type": "Bearer",
      "cached_at": cached_at.to_string(),
      "expires_on": token.expires_on,
      "extended_expires_on": token.expires_on,
    });
    self.upsert(ACCESS_TOKEN_TABLE, key.clone(), entry);
    key
  }

  /// Insert or replace the `Account` entry (user sessions) or the
  /// `AppMetadata` entry (service principals). Returns the cache key.
  pub fn upsert_principal(&mut self, identity: &MsalIdentity) -> String {
    match &identity.account {
      Some(account) => {
        let key = identity.account_key();
        let entry = json!({
          "home_account_id": identity.home_account_id,
          "environment": ENVIRONMENT,
          "realm": identity.realm,
          "local_account_id": account.object_id,
          "username": account.username,
          "authority_type": "MSSTS",
          "account_source": "device_code",
        });
        self.upsert(ACCOUNT_TABLE, key.clone(), entry);
        key
      }
      None => {
        let key = identity.app_metadata_key();
        let entry = json!({
          "client_id": identity.client_id,
          "environment": ENVIRONMENT,
        });
        self.upsert(APP_METADATA_TABLE, key.clone(), entry);
        key
      }
    }
  }

  /// Merge every token in `tokens` plus the principal entry for `identity`.
  pub fn merge(&mut self, identity: &MsalIdentity, tokens: &[ScopedToken<'_>]) -> Vec<String> {
    let cached_at = Utc::now().timestamp();
    let mut keys: Vec<String> = tokens
      .iter()
      .map(|token| self.upsert_access_token(identity, token, cached_at))
      .collect();
    keys.push(self.upsert_principal(identity));
    keys
  }
}

/// The MSAL cache file and its lock.
#[derive(Debug)]
pub struct MsalCacheStore {
  path: PathBuf,
  mutex: FileMutex,
}

impl MsalCacheStore {
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

  /// Read the cache. A missing or corrupt file yields an empty cache.
  pub fn load(&self) -> Result<MsalCache> {
    let Some(data) = persist::read_optional(&self.path)? else {
      return Ok(MsalCache::new());
    };
    match MsalCache::parse(&data) {
      Ok(cache) => Ok(cache),
      Err(e) => {
        debug!(path = %self.path.display(), error = %e, "MSAL cache is corrupt, starting fresh");
        Ok(MsalCache::new())
      }
    }
  }

  /// Merge the tokens carried by `creds` into the cache file.
  pub fn import(&self, creds: &AzureCredentials) -> Result<Vec<String>> {
    if creds.access_token.is_empty() {
      return Err(StoreError::Validation("access token is empty".to_string()));
    }
    let identity = MsalIdentity::from_credentials(creds)?;
    let tokens = ScopedToken::from_credentials(creds, &identity);
    self.import_tokens(&identity, &tokens)
  }

  /// Merge `tokens` for `identity` under the file lock.
  pub fn import_tokens(&self, identity: &MsalIdentity, tokens: &[ScopedToken<'_>]) -> Result<Vec<String>> {
    if let Some(dir) = self.path.parent() {
      crate::platform::ensure_private_dir(dir)?;
    }

    let keys = self.mutex.with_lock(&self.path, || {
      let mut cache = self.load()?;
      let keys = cache.merge(identity, tokens);
      persist::write_private_json(&self.path, cache.as_map())?;
      Ok(keys)
    })?;

    for key in &keys {
      debug!(key = %key, "Updated MSAL cache entry");
    }
    debug!(path = %self.path.display(), "Updated Azure CLI MSAL token cache");
    Ok(keys)
  }
}
