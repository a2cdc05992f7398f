//! # Store Context
//!
//! Owns the decoded [`Settings`] and hands out store instances with their base
//! directories and lock timing resolved. It also owns the one-shot legacy path
//! warning, so each context warns at most once and tests can rearm it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::aws::AwsFileManager;
use crate::azure::{AzureCliFiles, AzureFileManager};
use crate::config::{self, ConfigDirs, Settings};
use crate::error::Result;
use crate::lock::LockOptions;

/// Directory used by older releases for AWS files, relative to home.
pub const LEGACY_AWS_DIR: &str = ".aws/cloudcreds";

/// Fires a single warning when files from an older layout are still present.
#[derive(Debug, Default)]
pub struct LegacyPathWarning {
  fired: AtomicBool,
}

impl LegacyPathWarning {
  pub fn new() -> Self {
    Self::default()
  }

  /// Warn if `legacy` exists and no warning has fired yet. Returns whether
  /// this call emitted the warning.
  pub fn check(&self, legacy: &Path, new_base: &Path) -> bool {
    if !legacy.is_dir() {
      return false;
    }
    if self.fired.swap(true, Ordering::SeqCst) {
      return false;
    }
    warn!(
      legacy_path = %config::display_path(legacy),
      new_path = %config::display_path(new_base),
      "Found credentials in a legacy location; they are no longer read and can be removed"
    );
    true
  }

  pub fn has_fired(&self) -> bool {
    self.fired.load(Ordering::SeqCst)
  }

  /// Rearm the warning.
  pub fn reset(&self) {
    self.fired.store(false, Ordering::SeqCst);
  }
}

/// Resolved settings plus the state shared by stores built from them.
#[derive(Debug)]
pub struct StoreContext {
  dirs: ConfigDirs,
  settings: Settings,
  legacy_warning: LegacyPathWarning,
}

impl StoreContext {
  /// Build a context from the platform config directory and its
  /// `config.toml`.
  pub fn load() -> Result<Self> {
    let dirs = ConfigDirs::new()?;
    let settings = dirs.load_settings()?;
    Ok(Self::new(dirs, settings))
  }

  pub fn new(dirs: ConfigDirs, settings: Settings) -> Self {
    Self {
      dirs,
      settings,
      legacy_warning: LegacyPathWarning::new(),
    }
  }

  pub fn dirs(&self) -> &ConfigDirs {
    &self.dirs
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn legacy_warning(&self) -> &LegacyPathWarning {
    &self.legacy_warning
  }

  pub fn lock_options(&self) -> LockOptions {
    self.settings.lock.to_options()
  }

  /// AWS base directory for `provider`: the provider's own `base_path`, then
  /// `[files] aws_base_path`, then the default under the config directory.
  pub fn aws_base_dir(&self, provider: &str) -> Result<PathBuf> {
    if let Some(path) = self.provider_base_path(provider) {
      return config::expand_home(path);
    }
    if let Some(path) = self.settings.files.aws_base_path.as_deref() {
      return config::expand_home(path);
    }

    let base = self.dirs.default_aws_base_dir();
    if let Some(home) = config::home_dir() {
      self.legacy_warning.check(&home.join(LEGACY_AWS_DIR), &base);
    }
    Ok(base)
  }

  /// Azure base directory for `provider`, resolved like [`Self::aws_base_dir`].
  pub fn azure_base_dir(&self, provider: &str) -> Result<PathBuf> {
    if let Some(path) = self.provider_base_path(provider) {
      return config::expand_home(path);
    }
    match self.settings.files.azure_base_path.as_deref() {
      Some(path) => config::expand_home(path),
      None => Ok(self.dirs.default_azure_base_dir()),
    }
  }

  pub fn aws_files(&self, provider: &str) -> Result<AwsFileManager> {
    let manager = AwsFileManager::with_lock_options(self.aws_base_dir(provider)?, self.lock_options())
      .with_resolver_url(self.settings.resolver_url(provider).map(str::to_string));
    Ok(manager)
  }

  pub fn azure_files(&self, provider: &str) -> Result<AzureFileManager> {
    Ok(AzureFileManager::with_lock_options(
      self.azure_base_dir(provider)?,
      self.lock_options(),
    ))
  }

  /// Stores for the Azure CLI's own files.
  pub fn azure_cli_files(&self) -> Result<AzureCliFiles> {
    Ok(AzureCliFiles::with_lock_options(
      self.settings.azure_cli_dir()?,
      self.lock_options(),
    ))
  }

  /// Output format configured for `provider`, empty when unset.
  pub fn output_format(&self, provider: &str) -> &str {
    self
      .settings
      .provider(provider)
      .and_then(|p| p.output.as_deref())
      .unwrap_or_default()
  }

  fn provider_base_path(&self, provider: &str) -> Option<&str> {
    self
      .settings
      .provider(provider)
      .and_then(|p| p.base_path.as_deref())
      .filter(|p| !p.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use cloudcreds_test_utils::HomeEnvTestGuard;
  use tempfile::TempDir;

  use super::*;
  use crate::config::ProviderConfig;

  #[test]
  fn legacy_warning_fires_once_until_reset() {
    let temp_dir = TempDir::new().unwrap();
    let legacy = temp_dir.path().join("legacy");
    let warning = LegacyPathWarning::new();

    assert!(!warning.check(&legacy, temp_dir.path()));
    fs::create_dir_all(&legacy).unwrap();

    assert!(warning.check(&legacy, temp_dir.path()));
    assert!(!warning.check(&legacy, temp_dir.path()));
    assert!(warning.has_fired());

    warning.reset();
    assert!(warning.check(&legacy, temp_dir.path()));
  }

  #[test]
  fn contexts_do_not_share_the_warning() {
    let guard = HomeEnvTestGuard::new();
    fs::create_dir_all(guard.home_path(LEGACY_AWS_DIR)).unwrap();
    let root = guard.home_path("config");

    let first = StoreContext::new(ConfigDirs::with_root(&root), Settings::default());
    let second = StoreContext::new(ConfigDirs::with_root(&root), Settings::default());

    first.aws_base_dir("acme").unwrap();
    assert!(first.legacy_warning().has_fired());
    assert!(!second.legacy_warning().has_fired());
  }

  #[test]
  fn base_dir_precedence() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.files.aws_base_path = Some("/srv/aws".to_string());
    settings.providers.insert(
      "special".to_string(),
      ProviderConfig {
        base_path: Some("/srv/special".to_string()),
        ..Default::default()
      },
    );
    let context = StoreContext::new(ConfigDirs::with_root(temp_dir.path()), settings);

    assert_eq!(context.aws_base_dir("special").unwrap(), PathBuf::from("/srv/special"));
    assert_eq!(context.aws_base_dir("acme").unwrap(), PathBuf::from("/srv/aws"));
    assert_eq!(context.azure_base_dir("acme").unwrap(), temp_dir.path().join("azure"));
    assert!(!context.legacy_warning().has_fired());
  }

  #[test]
  fn aws_files_carry_provider_resolver() {
    let temp_dir = TempDir::new().unwrap();
    let settings: Settings = toml::from_str(
      r#"
        [providers.localstack]
        output = "json"
        [providers.localstack.resolver]
        url = "http://localhost:4566"
      "#,
    )
    .unwrap();
    let context = StoreContext::new(ConfigDirs::with_root(temp_dir.path()), settings);

    let manager = context.aws_files("localstack").unwrap();
    let vars = manager.environment_variables("localstack", "dev");

    assert_eq!(crate::env::lookup(&vars, "AWS_ENDPOINT_URL"), Some("http://localhost:4566"));
    assert_eq!(context.output_format("localstack"), "json");
    assert_eq!(context.output_format("other"), "");
  }
}
