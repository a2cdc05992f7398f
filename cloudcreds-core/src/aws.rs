//! # AWS Profile Files
//!
//! Maintains per-provider `credentials` and `config` INI files in the format
//! the AWS CLI and SDKs read. Many identities share one file, each owning one
//! section, and every mutation runs lock → load → mutate → save under the
//! provider file's lock.
//!
//! Section naming differs between the two files: the credentials file uses the
//! identity verbatim, while the config file uses `profile <identity>` for
//! everything except `default`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config;
use crate::credentials::{Applied, AwsCredentials, CredentialRecord};
use crate::env::EnvVar;
use crate::error::{Result, StoreError};
use crate::ini::IniDocument;
use crate::lock::{FileMutex, LockOptions};
use crate::persist;
use crate::platform::ensure_private_dir;

/// Marker written as the credentials section comment; readers recover the
/// expiration from it when live validation is unavailable.
pub const EXPIRATION_COMMENT_PREFIX: &str = "atmos: expiration=";

const KEY_ACCESS_KEY_ID: &str = "aws_access_key_id";
const KEY_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
const KEY_SESSION_TOKEN: &str = "aws_session_token";
const KEY_REGION: &str = "region";
const KEY_OUTPUT: &str = "output";

/// Section name for `identity` in the credentials file.
pub fn credentials_section_name(identity: &str) -> String {
  identity.to_string()
}

/// Section name for `identity` in the config file.
pub fn config_section_name(identity: &str) -> String {
  if identity == "default" {
    "default".to_string()
  } else {
    format!("profile {identity}")
  }
}

/// First four characters of an access key, for logs.
fn mask_access_key(access_key: &str) -> String {
  match access_key.char_indices().nth(4) {
    Some((end, _)) => format!("{}...", &access_key[..end]),
    None => access_key.to_string(),
  }
}

/// Manages AWS credentials/config files beneath a base directory.
#[derive(Debug)]
pub struct AwsFileManager {
  base_dir: PathBuf,
  mutex: FileMutex,
  resolver_url: Option<String>,
}

impl AwsFileManager {
  pub fn new(base_dir: impl Into<PathBuf>) -> Self {
    Self::with_lock_options(base_dir, LockOptions::default())
  }

  pub fn with_lock_options(base_dir: impl Into<PathBuf>, options: LockOptions) -> Self {
    Self {
      base_dir: base_dir.into(),
      mutex: FileMutex::new(options),
      resolver_url: None,
    }
  }

  /// Endpoint override exported alongside the file locations.
  pub fn with_resolver_url(mut self, url: Option<String>) -> Self {
    self.resolver_url = url.filter(|u| !u.is_empty());
    self
  }

  pub fn base_dir(&self) -> &Path {
    &self.base_dir
  }

  /// Base directory with the home directory abbreviated to `~`.
  pub fn display_path(&self) -> String {
    config::display_path(&self.base_dir)
  }

  pub fn provider_dir(&self, provider: &str) -> PathBuf {
    self.base_dir.join(provider)
  }

  pub fn credentials_path(&self, provider: &str) -> PathBuf {
    self.provider_dir(provider).join("credentials")
  }

  pub fn config_path(&self, provider: &str) -> PathBuf {
    self.provider_dir(provider).join("config")
  }

  /// Write both files for an AWS record; other kinds are not applicable.
  pub fn setup_files(
    &self,
    provider: &str,
    identity: &str,
    record: &CredentialRecord,
    output_format: &str,
  ) -> Result<Applied> {
    let Some(creds) = record.as_aws() else {
      return Ok(Applied::NotApplicable);
    };
    self.write_credentials(provider, identity, creds)?;
    self.write_config(provider, identity, &creds.region, output_format)?;
    Ok(Applied::Written)
  }

  /// Create or replace `identity`'s section in the provider credentials file.
  pub fn write_credentials(&self, provider: &str, identity: &str, creds: &AwsCredentials) -> Result<()> {
    let path = self.credentials_path(provider);
    debug!(
      provider,
      identity,
      credentials_file = %path.display(),
      has_session_token = creds.session_token().is_some(),
      "Writing AWS credentials"
    );

    self.mutate(&path, |doc| {
      let section = doc.section_mut_or_insert(&credentials_section_name(identity));
      section.set_comment(creds.expiration().map(|exp| format!("{EXPIRATION_COMMENT_PREFIX}{exp}")));
      section.set(KEY_ACCESS_KEY_ID, &creds.access_key_id);
      section.set(KEY_SECRET_ACCESS_KEY, &creds.secret_access_key);
      match creds.session_token() {
        Some(token) => section.set(KEY_SESSION_TOKEN, token),
        None => {
          section.remove(KEY_SESSION_TOKEN);
        }
      }
      debug!(
        profile = identity,
        access_key_prefix = %mask_access_key(&creds.access_key_id),
        expiration = creds.expiration().unwrap_or_default(),
        "Writing credentials to file"
      );
    })?;

    debug!(provider, identity, credentials_file = %path.display(), "Successfully wrote AWS credentials");
    Ok(())
  }

  /// Create or update `identity`'s section in the provider config file.
  ///
  /// Empty `region` or `output_format` deletes the corresponding key.
  pub fn write_config(&self, provider: &str, identity: &str, region: &str, output_format: &str) -> Result<()> {
    let path = self.config_path(provider);
    debug!(
      provider,
      identity,
      config_file = %path.display(),
      region,
      output_format,
      "Writing AWS config"
    );

    self.mutate(&path, |doc| {
      let section = doc.section_mut_or_insert(&config_section_name(identity));
      set_or_remove(section, KEY_REGION, region);
      set_or_remove(section, KEY_OUTPUT, output_format);
    })?;

    debug!(provider, identity, config_file = %path.display(), "Successfully wrote AWS config");
    Ok(())
  }

  /// Remove `identity`'s section from the credentials file.
  pub fn remove_credentials_profile(&self, provider: &str, identity: &str) -> Result<()> {
    self.remove_profile(&self.credentials_path(provider), &credentials_section_name(identity))
  }

  /// Remove `identity`'s section from the config file.
  pub fn remove_config_profile(&self, provider: &str, identity: &str) -> Result<()> {
    self.remove_profile(&self.config_path(provider), &config_section_name(identity))
  }

  /// Delete `section` from the INI file at `path`. The file is removed when no
  /// named section remains. Missing files and sections are not errors.
  pub fn remove_profile(&self, path: &Path, section: &str) -> Result<()> {
    if !path.exists() {
      debug!(file = %path.display(), "File does not exist, nothing to remove");
      return Ok(());
    }

    self.mutex.with_lock(path, || {
      // The file may have vanished between the check and the lock.
      let Some(mut doc) = load_ini(path)? else {
        return Ok(());
      };

      if !doc.remove_section(section) {
        debug!(file = %path.display(), profile = section, "Profile not present, nothing to remove");
        return Ok(());
      }

      if doc.has_named_sections() {
        persist::write_private(path, doc.render().as_bytes())
      } else {
        debug!(file = %path.display(), "No profiles remain, removing file");
        persist::remove_if_exists(path)
      }
    })?;

    debug!(file = %path.display(), profile = section, "Successfully removed AWS profile");
    Ok(())
  }

  /// Remove `identity` from both files, preserving other identities. A
  /// failure on one file does not stop the other from being cleaned.
  pub fn delete_identity(&self, provider: &str, identity: &str) -> Result<()> {
    let errors: Vec<StoreError> = [
      self.remove_credentials_profile(provider, identity),
      self.remove_config_profile(provider, identity),
    ]
    .into_iter()
    .filter_map(|result| result.err())
    .collect();

    StoreError::from_many(errors)
  }

  /// Expiration recorded in the comment above `identity`'s credentials
  /// section, if any.
  pub fn expiration(&self, provider: &str, identity: &str) -> Result<Option<DateTime<Utc>>> {
    let path = self.credentials_path(provider);
    let Some(doc) = load_ini(&path)? else {
      return Ok(None);
    };
    let comment = doc
      .section(&credentials_section_name(identity))
      .and_then(|section| section.comment());
    Ok(comment.and_then(parse_expiration_comment))
  }

  /// True when the recorded expiration lies in the future. `None` means no
  /// expiration is recorded and validity cannot be judged from the file.
  pub fn credentials_valid_at(&self, provider: &str, identity: &str, now: DateTime<Utc>) -> Result<Option<bool>> {
    Ok(self.expiration(provider, identity)?.map(|expires| expires > now))
  }

  /// Environment assignments that point AWS tooling at these files.
  pub fn environment_variables(&self, provider: &str, identity: &str) -> Vec<EnvVar> {
    let mut vars = vec![
      EnvVar::new("AWS_SHARED_CREDENTIALS_FILE", self.credentials_path(provider).display().to_string()),
      EnvVar::new("AWS_CONFIG_FILE", self.config_path(provider).display().to_string()),
      EnvVar::new("AWS_PROFILE", identity),
    ];
    if let Some(url) = &self.resolver_url {
      vars.push(EnvVar::new("AWS_ENDPOINT_URL", url.as_str()));
    }
    vars
  }

  /// Remove every file for `provider`.
  pub fn cleanup(&self, provider: &str) -> Result<()> {
    let dir = self.provider_dir(provider);
    debug!(provider, directory = %dir.display(), "Cleaning up AWS files directory");
    persist::remove_dir_if_exists(&dir)
  }

  /// Remove the whole base directory.
  pub fn cleanup_all(&self) -> Result<()> {
    debug!(directory = %self.base_dir.display(), "Cleaning up all AWS files");
    persist::remove_dir_if_exists(&self.base_dir)
  }

  fn mutate(&self, path: &Path, apply: impl FnOnce(&mut IniDocument)) -> Result<()> {
    if let Some(dir) = path.parent() {
      ensure_private_dir(dir)?;
    }
    self.mutex.with_lock(path, || {
      let mut doc = load_ini(path)?.unwrap_or_default();
      apply(&mut doc);
      persist::write_private(path, doc.render().as_bytes())
    })
  }
}

fn set_or_remove(section: &mut crate::ini::Section, key: &str, value: &str) {
  if value.is_empty() {
    section.remove(key);
  } else {
    section.set(key, value);
  }
}

/// Load an INI file; a missing file is `None`.
fn load_ini(path: &Path) -> Result<Option<IniDocument>> {
  let Some(text) = persist::read_optional_text(path)? else {
    return Ok(None);
  };
  IniDocument::parse(&text).map(Some).map_err(|e| StoreError::Parse {
    path: path.to_path_buf(),
    message: e.to_string(),
  })
}

/// Extract the timestamp from an `atmos: expiration=<RFC3339>` comment.
pub fn parse_expiration_comment(comment: &str) -> Option<DateTime<Utc>> {
  comment.lines().find_map(|line| {
    let text = line.trim_start_matches([';', '#']).trim();
    let value = text.strip_prefix(EXPIRATION_COMMENT_PREFIX)?;
    DateTime::parse_from_rfc3339(value.trim())
      .ok()
      .map(|dt| dt.with_timezone(&Utc))
  })
}
