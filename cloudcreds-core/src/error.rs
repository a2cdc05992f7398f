//! # Store Errors
//!
//! Typed failures returned by every public store operation. Each variant that
//! concerns a file carries its path so the message shown to the user names the
//! affected file.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the stores.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised while reading, writing or locking credential files.
#[derive(Debug, Error)]
pub enum StoreError {
  /// Exclusive access was not obtained within the configured bound.
  #[error("failed to acquire file lock within timeout: {}", path.display())]
  LockTimeout { path: PathBuf },

  /// The caller cancelled a pending lock wait.
  #[error("lock wait cancelled: {}", path.display())]
  LockCancelled { path: PathBuf },

  /// The operating system refused the lock attempt outright.
  #[error("failed to lock {}: {source}", path.display())]
  Lock {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The file exists but could not be read.
  #[error("failed to load {}: {source}", path.display())]
  Load {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The file was read but its contents could not be decoded.
  #[error("failed to parse {}: {message}", path.display())]
  Parse { path: PathBuf, message: String },

  /// An I/O error occurred while persisting or removing the file.
  #[error("failed to write {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The file or directory mode could not be normalized.
  #[error("failed to set permissions on {}: {source}", path.display())]
  Permission {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// A record or token did not carry what the operation needs.
  #[error("invalid credentials: {0}")]
  Validation(String),

  /// Several independent steps failed; none aborted the others.
  #[error("{}", join_messages(.0))]
  Multiple(Vec<StoreError>),
}

impl StoreError {
  /// True when the error (or any aggregated error) is a lock timeout.
  pub fn is_lock_timeout(&self) -> bool {
    match self {
      StoreError::LockTimeout { .. } => true,
      StoreError::Multiple(errors) => errors.iter().any(StoreError::is_lock_timeout),
      _ => false,
    }
  }

  /// Collapse a list of failures into a single result.
  pub(crate) fn from_many(mut errors: Vec<StoreError>) -> Result<()> {
    match errors.len() {
      0 => Ok(()),
      1 => Err(errors.remove(0)),
      _ => Err(StoreError::Multiple(errors)),
    }
  }
}

fn join_messages(errors: &[StoreError]) -> String {
  errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn messages_name_the_file() {
    let err = StoreError::LockTimeout {
      path: PathBuf::from("/tmp/acme/credentials.lock"),
    };
    assert!(err.to_string().contains("/tmp/acme/credentials.lock"));
  }

  #[test]
  fn from_many_flattens_single_error() {
    let result = StoreError::from_many(vec![StoreError::Validation("missing oid".into())]);
    assert!(matches!(result, Err(StoreError::Validation(_))));
    assert!(StoreError::from_many(Vec::new()).is_ok());
  }

  #[test]
  fn multiple_joins_and_detects_timeouts() {
    let err = StoreError::Multiple(vec![
      StoreError::Validation("first".into()),
      StoreError::LockTimeout {
        path: PathBuf::from("/tmp/config.lock"),
      },
    ]);
    let message = err.to_string();
    assert!(message.contains("first"));
    assert!(message.contains("/tmp/config.lock"));
    assert!(err.is_lock_timeout());
  }
}
