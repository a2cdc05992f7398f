//! Environment assignments for Azure tooling.

use crate::credentials::AzureCredentials;
use crate::env::EnvVar;

/// Variables that point the Azure CLI and Terraform providers at the session
/// described by `creds`. User sessions authenticate through the CLI cache;
/// service principals with a client id authenticate through OIDC.
pub fn environment_variables(creds: &AzureCredentials) -> Vec<EnvVar> {
  let mut vars = Vec::new();
  let mut both = |suffix: &str, value: &str| {
    if !value.is_empty() {
      vars.push(EnvVar::new(format!("AZURE_{suffix}"), value));
      vars.push(EnvVar::new(format!("ARM_{suffix}"), value));
    }
  };
  both("SUBSCRIPTION_ID", &creds.subscription_id);
  both("TENANT_ID", &creds.tenant_id);
  both("LOCATION", &creds.location);

  match creds.client_id().filter(|_| creds.is_service_principal) {
    Some(client_id) => {
      vars.push(EnvVar::new("ARM_USE_OIDC", "true"));
      vars.push(EnvVar::new("ARM_CLIENT_ID", client_id));
      vars.push(EnvVar::new("AZURE_CLIENT_ID", client_id));
      if let Some(token_file) = creds.token_file_path() {
        vars.push(EnvVar::new("AZURE_FEDERATED_TOKEN_FILE", token_file));
      }
    }
    None => vars.push(EnvVar::new("ARM_USE_CLI", "true")),
  }

  vars
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::env::lookup;

  fn base() -> AzureCredentials {
    AzureCredentials {
      tenant_id: "T1".to_string(),
      subscription_id: "S1".to_string(),
      location: "eastus".to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn user_sessions_use_the_cli() {
    let vars = environment_variables(&base());

    assert_eq!(lookup(&vars, "ARM_USE_CLI"), Some("true"));
    assert_eq!(lookup(&vars, "AZURE_SUBSCRIPTION_ID"), Some("S1"));
    assert_eq!(lookup(&vars, "ARM_TENANT_ID"), Some("T1"));
    assert_eq!(lookup(&vars, "AZURE_LOCATION"), Some("eastus"));
    assert_eq!(lookup(&vars, "ARM_USE_OIDC"), None);
  }

  #[test]
  fn oidc_sessions_replace_cli_auth() {
    let creds = AzureCredentials {
      client_id: Some("C1".to_string()),
      is_service_principal: true,
      token_file_path: Some("/var/run/token".to_string()),
      location: String::new(),
      ..base()
    };

    let vars = environment_variables(&creds);

    assert_eq!(lookup(&vars, "ARM_USE_CLI"), None);
    assert_eq!(lookup(&vars, "ARM_USE_OIDC"), Some("true"));
    assert_eq!(lookup(&vars, "ARM_CLIENT_ID"), Some("C1"));
    assert_eq!(lookup(&vars, "AZURE_CLIENT_ID"), Some("C1"));
    assert_eq!(lookup(&vars, "AZURE_FEDERATED_TOKEN_FILE"), Some("/var/run/token"));
    assert_eq!(lookup(&vars, "AZURE_LOCATION"), None);
  }
}
