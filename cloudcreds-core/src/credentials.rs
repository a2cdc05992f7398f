//! # Credential Records
//!
//! Already-authenticated credentials handed to the stores by an external
//! authenticator. The record is a tagged variant; each store accepts only its
//! own kind and reports [`Applied::NotApplicable`] for the other.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminator of a [`CredentialRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
  Aws,
  Azure,
}

impl fmt::Display for CredentialKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CredentialKind::Aws => write!(f, "aws"),
      CredentialKind::Azure => write!(f, "azure"),
    }
  }
}

/// Credentials for one identity, tagged by cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialRecord {
  Aws(AwsCredentials),
  Azure(AzureCredentials),
}

impl CredentialRecord {
  pub fn kind(&self) -> CredentialKind {
    match self {
      CredentialRecord::Aws(_) => CredentialKind::Aws,
      CredentialRecord::Azure(_) => CredentialKind::Azure,
    }
  }

  pub fn as_aws(&self) -> Option<&AwsCredentials> {
    match self {
      CredentialRecord::Aws(creds) => Some(creds),
      CredentialRecord::Azure(_) => None,
    }
  }

  pub fn as_azure(&self) -> Option<&AzureCredentials> {
    match self {
      CredentialRecord::Azure(creds) => Some(creds),
      CredentialRecord::Aws(_) => None,
    }
  }
}

/// Outcome of offering a record to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Applied {
  /// The store persisted the record.
  Written,
  /// The record belongs to another cloud; nothing was touched.
  NotApplicable,
}

/// Static or temporary AWS credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsCredentials {
  pub access_key_id: String,
  pub secret_access_key: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub session_token: Option<String>,
  #[serde(default)]
  pub region: String,
  /// RFC3339 expiration of temporary credentials.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub expiration: Option<String>,
}

impl AwsCredentials {
  /// Session token, treating an empty string as absent.
  pub fn session_token(&self) -> Option<&str> {
    non_empty(self.session_token.as_deref())
  }

  /// Expiration, treating an empty string as absent.
  pub fn expiration(&self) -> Option<&str> {
    non_empty(self.expiration.as_deref())
  }
}

/// An Azure bearer token and the context it was issued for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureCredentials {
  pub access_token: String,
  #[serde(default)]
  pub token_type: String,
  pub tenant_id: String,
  #[serde(default)]
  pub subscription_id: String,
  #[serde(default)]
  pub location: String,
  /// RFC3339 expiration of `access_token`.
  #[serde(default)]
  pub expiration: String,

  /// Microsoft Graph token, when the authenticator obtained one.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub graph_api_token: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub graph_api_expiration: Option<String>,
  /// Key Vault token, when the authenticator obtained one.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub key_vault_token: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub key_vault_expiration: Option<String>,

  // OIDC / federated sessions
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub client_id: Option<String>,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub is_service_principal: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub token_file_path: Option<String>,
}

impl AzureCredentials {
  /// Client id, treating an empty string as absent.
  pub fn client_id(&self) -> Option<&str> {
    non_empty(self.client_id.as_deref())
  }

  /// True for application-only sessions that have a client id to key on.
  pub fn is_service_principal_session(&self) -> bool {
    self.is_service_principal && self.client_id().is_some()
  }

  pub fn token_file_path(&self) -> Option<&str> {
    non_empty(self.token_file_path.as_deref())
  }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
  value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn record_json_is_tagged_by_kind() {
    let json = r#"{"kind":"aws","access_key_id":"AKIA1","secret_access_key":"s1","region":"us-east-1"}"#;
    let record: CredentialRecord = serde_json::from_str(json).unwrap();

    assert_eq!(record.kind(), CredentialKind::Aws);
    let aws = record.as_aws().unwrap();
    assert_eq!(aws.access_key_id, "AKIA1");
    assert!(aws.session_token().is_none());
    assert!(record.as_azure().is_none());
  }

  #[test]
  fn empty_optional_strings_count_as_absent() {
    let creds = AwsCredentials {
      session_token: Some(String::new()),
      expiration: Some(String::new()),
      ..Default::default()
    };
    assert!(creds.session_token().is_none());
    assert!(creds.expiration().is_none());
  }

  #[test]
  fn service_principal_requires_client_id() {
    let mut creds = AzureCredentials {
      is_service_principal: true,
      ..Default::default()
    };
    assert!(!creds.is_service_principal_session());

    creds.client_id = Some("C1".to_string());
    assert!(creds.is_service_principal_session());
  }

  #[test]
  fn azure_record_omits_unset_optional_fields() {
    let record = CredentialRecord::Azure(AzureCredentials {
      access_token: "tok".into(),
      tenant_id: "t1".into(),
      ..Default::default()
    });
    let json = serde_json::to_string(&record).unwrap();

    assert!(json.contains(r#""kind":"azure""#));
    assert!(!json.contains("client_id"));
    assert!(!json.contains("is_service_principal"));
  }
}
