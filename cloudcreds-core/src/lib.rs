//! # Cloud Credential Stores
//!
//! Persists already-authenticated AWS and Azure credentials in the on-disk
//! formats the AWS CLI, the Azure CLI and MSAL consumers read, so any
//! unmodified downstream tool picks them up. Shared files are mutated under a
//! cross-process advisory lock and rewritten atomically with owner-only
//! permissions.

pub mod aws;
pub mod azure;
pub mod config;
pub mod context;
pub mod credentials;
pub mod env;
pub mod error;
pub mod ini;
pub mod lock;
pub mod persist;
pub mod platform;

// Re-export main types
pub use aws::AwsFileManager;
pub use azure::{AzureCliFiles, AzureFileManager};
pub use config::{ConfigDirs, Settings};
pub use context::{LegacyPathWarning, StoreContext};
pub use credentials::{Applied, AwsCredentials, AzureCredentials, CredentialKind, CredentialRecord};
pub use env::EnvVar;
pub use error::{Result, StoreError};
pub use lock::{FileLock, FileMutex, LockOptions};
