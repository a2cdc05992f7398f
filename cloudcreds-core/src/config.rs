//! # Configuration Management
//!
//! Resolves where credential files live and decodes the optional
//! `config.toml` once at load time into typed settings, including per-provider
//! options such as an endpoint resolver override.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::lock::{DEFAULT_LOCK_TIMEOUT, DEFAULT_POLL_INTERVAL, LockOptions};

/// Represents the configuration directories for the application
#[derive(Debug, Clone)]
pub struct ConfigDirs {
  pub config_dir: PathBuf,
}

impl ConfigDirs {
  /// Create a new ConfigDirs instance from the XDG / platform conventions
  pub fn new() -> Result<Self> {
    let proj_dirs = ProjectDirs::from("", "", "cloudcreds")
      .ok_or_else(|| StoreError::Validation("failed to determine project directories".to_string()))?;

    Ok(Self {
      config_dir: proj_dirs.config_dir().to_path_buf(),
    })
  }

  /// Use an explicit root, mainly for tests and embedding
  pub fn with_root(config_dir: impl Into<PathBuf>) -> Self {
    Self {
      config_dir: config_dir.into(),
    }
  }

  pub fn config_dir(&self) -> &Path {
    &self.config_dir
  }

  /// Path to the settings file
  pub fn settings_path(&self) -> PathBuf {
    self.config_dir.join("config.toml")
  }

  /// Default base directory for AWS credential/config files
  pub fn default_aws_base_dir(&self) -> PathBuf {
    self.config_dir.join("aws")
  }

  /// Default base directory for Azure credential records
  pub fn default_azure_base_dir(&self) -> PathBuf {
    self.config_dir.join("azure")
  }

  /// Load settings from disk, returning defaults if the file is absent
  pub fn load_settings(&self) -> Result<Settings> {
    Settings::load_from_path(&self.settings_path())
  }
}

/// Current user's home directory.
pub fn home_dir() -> Option<PathBuf> {
  BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// Expand a leading `~` against the home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
  let Some(rest) = path.strip_prefix('~') else {
    return Ok(PathBuf::from(path));
  };
  if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\')) {
    return Err(StoreError::Validation(format!("invalid base_path {path:?}: unsupported home expansion")));
  }
  let home = home_dir().ok_or_else(|| StoreError::Validation("failed to get home directory".to_string()))?;
  Ok(home.join(rest.trim_start_matches(['/', '\\'])))
}

/// Replace the home directory prefix of `path` with `~` for display.
pub fn display_path(path: &Path) -> String {
  if let Some(home) = home_dir()
    && let Ok(rest) = path.strip_prefix(&home)
  {
    if rest.as_os_str().is_empty() {
      return "~".to_string();
    }
    return format!("~/{}", rest.display());
  }
  path.display().to_string()
}

/// Settings decoded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub files: FilesSettings,
  pub lock: LockSettings,
  pub providers: BTreeMap<String, ProviderConfig>,
}

/// Overrides for where files are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesSettings {
  pub aws_base_path: Option<String>,
  pub azure_base_path: Option<String>,
  /// Directory holding the Azure CLI's own files (`~/.azure`).
  pub azure_cli_dir: Option<String>,
}

/// Lock wait bounds in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockSettings {
  pub timeout_ms: u64,
  pub poll_interval_ms: u64,
}

impl Default for LockSettings {
  fn default() -> Self {
    Self {
      timeout_ms: DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
      poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
    }
  }
}

impl LockSettings {
  pub fn to_options(&self) -> LockOptions {
    LockOptions {
      timeout: Duration::from_millis(self.timeout_ms),
      poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
    }
  }
}

/// Typed options attached to one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
  /// Overrides the per-cloud base path for this provider's files.
  pub base_path: Option<String>,
  pub region: Option<String>,
  pub output: Option<String>,
  pub resolver: Option<ResolverConfig>,
}

/// Endpoint override used by tooling that talks to a local emulator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
  pub url: Option<String>,
}

impl Settings {
  /// Load settings from `path`, returning defaults if the file is absent.
  pub fn load_from_path(path: &Path) -> Result<Self> {
    if !path.exists() {
      return Ok(Self::default());
    }

    let content = fs::read_to_string(path).map_err(|source| StoreError::Load {
      path: path.to_path_buf(),
      source,
    })?;
    toml::from_str(&content).map_err(|e| StoreError::Parse {
      path: path.to_path_buf(),
      message: e.to_string(),
    })
  }

  pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
    self.providers.get(name)
  }

  /// Resolver url configured for `provider`, if any.
  pub fn resolver_url(&self, provider: &str) -> Option<&str> {
    self
      .provider(provider)
      .and_then(|p| p.resolver.as_ref())
      .and_then(|r| r.url.as_deref())
      .filter(|url| !url.is_empty())
  }

  /// Azure CLI directory, defaulting to `~/.azure`.
  pub fn azure_cli_dir(&self) -> Result<PathBuf> {
    match self.files.azure_cli_dir.as_deref() {
      Some(dir) => expand_home(dir),
      None => expand_home("~/.azure"),
    }
  }
}

#[cfg(test)]
mod tests {
  use cloudcreds_test_utils::HomeEnvTestGuard;
  use tempfile::TempDir;

  use super::*;

  #[test]
  fn missing_settings_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let dirs = ConfigDirs::with_root(temp_dir.path());

    let settings = dirs.load_settings().unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.lock.to_options(), LockOptions::default());
  }

  #[test]
  fn decodes_provider_resolver_once() {
    let temp_dir = TempDir::new().unwrap();
    let dirs = ConfigDirs::with_root(temp_dir.path());
    fs::write(
      dirs.settings_path(),
      r#"
        [lock]
        timeout_ms = 500

        [providers.localstack]
        region = "us-east-1"

        [providers.localstack.resolver]
        url = "http://localhost:4566"
      "#,
    )
    .unwrap();

    let settings = dirs.load_settings().unwrap();
    assert_eq!(settings.resolver_url("localstack"), Some("http://localhost:4566"));
    assert_eq!(settings.resolver_url("other"), None);
    assert_eq!(settings.lock.to_options().timeout, Duration::from_millis(500));
    assert_eq!(settings.lock.poll_interval_ms, 50);
  }

  #[test]
  fn malformed_settings_are_a_parse_failure() {
    let temp_dir = TempDir::new().unwrap();
    let dirs = ConfigDirs::with_root(temp_dir.path());
    fs::write(dirs.settings_path(), "[lock\n").unwrap();

    assert!(matches!(dirs.load_settings(), Err(StoreError::Parse { .. })));
  }

  #[test]
  fn expand_home_and_display_path_round_trip() {
    let guard = HomeEnvTestGuard::new();

    let expanded = expand_home("~/creds/aws").unwrap();
    assert_eq!(expanded, guard.home_dir().join("creds/aws"));
    assert_eq!(display_path(&expanded), "~/creds/aws");
    assert_eq!(expand_home("/abs/path").unwrap(), PathBuf::from("/abs/path"));
    assert!(expand_home("~someone/else").is_err());
  }

  #[cfg(target_os = "linux")]
  #[test]
  fn config_dirs_follow_xdg_config_home() {
    let guard = cloudcreds_test_utils::EnvTestGuard::new();

    let dirs = ConfigDirs::new().unwrap();

    assert_eq!(dirs.config_dir(), guard.config_dir().join("cloudcreds"));
    assert_eq!(dirs.default_aws_base_dir(), guard.config_dir().join("cloudcreds").join("aws"));
  }

  #[test]
  fn default_base_dirs_live_under_config_dir() {
    let dirs = ConfigDirs::with_root("/tmp/cloudcreds");
    assert_eq!(dirs.default_aws_base_dir(), PathBuf::from("/tmp/cloudcreds/aws"));
    assert_eq!(dirs.default_azure_base_dir(), PathBuf::from("/tmp/cloudcreds/azure"));
  }
}
