//! Environment variable assignments produced for downstream tooling.

use std::fmt;

/// A single `KEY=value` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
  pub key: String,
  pub value: String,
}

impl EnvVar {
  pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      value: value.into(),
    }
  }

  /// Render as a POSIX shell `export` line with the value single-quoted.
  pub fn to_shell_export(&self) -> String {
    format!("export {}='{}'", self.key, self.value.replace('\'', r"'\''"))
  }
}

impl fmt::Display for EnvVar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}={}", self.key, self.value)
  }
}

/// Find the value assigned to `key`, if any.
pub fn lookup<'a>(vars: &'a [EnvVar], key: &str) -> Option<&'a str> {
  vars.iter().find(|v| v.key == key).map(|v| v.value.as_str())
}
