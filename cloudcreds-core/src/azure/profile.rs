//! # Azure CLI Profile
//!
//! Keeps `azureProfile.json` pointing at the subscription of the current
//! session. The Azure CLI owns this file, so fields this module does not know
//! about are carried through unchanged.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Result;
use crate::lock::{FileMutex, LockOptions};
use crate::persist;

pub const AZURE_PROFILE_FILE: &str = "azureProfile.json";

const STATE_ENABLED: &str = "Enabled";
const ENVIRONMENT_NAME: &str = "AzureCloud";

/// Principal type recorded on a subscription entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalType {
  User,
  ServicePrincipal,
}

impl PrincipalType {
  pub fn as_str(&self) -> &'static str {
    match self {
      PrincipalType::User => "user",
      PrincipalType::ServicePrincipal => "servicePrincipal",
    }
  }
}

/// The `user` block of a subscription entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionUser {
  #[serde(default)]
  pub name: String,
  #[serde(rename = "type", default)]
  pub kind: String,
}

/// One entry of the `subscriptions` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEntry {
  #[serde(default)]
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default)]
  pub tenant_id: String,
  #[serde(default)]
  pub is_default: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub state: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub environment_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user: Option<SubscriptionUser>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// The whole `azureProfile.json` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureProfile {
  #[serde(default)]
  pub installation_id: String,
  #[serde(default)]
  pub subscriptions: Vec<SubscriptionEntry>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// What the current session contributes to the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSubscription<'a> {
  pub subscription_id: &'a str,
  pub tenant_id: &'a str,
  pub username: &'a str,
  pub principal_type: PrincipalType,
}

impl AzureProfile {
  pub fn parse(data: &[u8]) -> serde_json::Result<Self> {
    serde_json::from_slice(persist::strip_bom(data))
  }

  /// Entries currently marked default.
  pub fn defaults(&self) -> impl Iterator<Item = &SubscriptionEntry> {
    self.subscriptions.iter().filter(|s| s.is_default)
  }

  pub fn subscription(&self, id: &str) -> Option<&SubscriptionEntry> {
    self.subscriptions.iter().find(|s| s.id == id)
  }

  /// Mark `active` as the default subscription, updating it in place or
  /// appending it. Every other entry loses its default flag. An empty
  /// subscription id only clears the flags.
  pub fn activate(&mut self, active: &ActiveSubscription<'_>) {
    let user = SubscriptionUser {
      name: active.username.to_string(),
      kind: active.principal_type.as_str().to_string(),
    };

    let mut found = false;
    for entry in &mut self.subscriptions {
      if !active.subscription_id.is_empty() && entry.id == active.subscription_id {
        entry.tenant_id = active.tenant_id.to_string();
        entry.is_default = true;
        entry.state = Some(STATE_ENABLED.to_string());
        entry.environment_name = Some(ENVIRONMENT_NAME.to_string());
        entry.user = Some(user.clone());
        found = true;
      } else {
        entry.is_default = false;
      }
    }

    if !found && !active.subscription_id.is_empty() {
      self.subscriptions.push(SubscriptionEntry {
        id: active.subscription_id.to_string(),
        name: Some(active.subscription_id.to_string()),
        tenant_id: active.tenant_id.to_string(),
        is_default: true,
        state: Some(STATE_ENABLED.to_string()),
        environment_name: Some(ENVIRONMENT_NAME.to_string()),
        user: Some(user),
        extra: Map::new(),
      });
    }
  }
}

/// The profile file and its lock.
#[derive(Debug)]
pub struct AzureProfileStore {
  path: PathBuf,
  mutex: FileMutex,
}

impl AzureProfileStore {
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

  /// Read the profile. A missing or corrupt file yields an empty profile.
  pub fn load(&self) -> Result<AzureProfile> {
    let Some(data) = persist::read_optional(&self.path)? else {
      return Ok(AzureProfile::default());
    };
    match AzureProfile::parse(&data) {
      Ok(profile) => Ok(profile),
      Err(e) => {
        debug!(path = %self.path.display(), error = %e, "Azure profile is corrupt, starting fresh");
        Ok(AzureProfile::default())
      }
    }
  }

  /// Make `active` the default subscription on disk.
  pub fn update(&self, active: &ActiveSubscription<'_>) -> Result<()> {
    if let Some(dir) = self.path.parent() {
      crate::platform::ensure_private_dir(dir)?;
    }

    self.mutex.with_lock(&self.path, || {
      let mut profile = self.load()?;
      profile.activate(active);
      persist::write_private_json(&self.path, &profile)
    })?;

    debug!(
      path = %self.path.display(),
      subscription = active.subscription_id,
      "Updated Azure profile"
    );
    Ok(())
  }
}
