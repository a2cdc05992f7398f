//! Unverified JWT claim extraction.
//!
//! Only the payload segment is decoded; signatures are never checked.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// Username recorded when the token carries no username-bearing claim.
pub const UNKNOWN_USERNAME: &str = "user@unknown";

const USERNAME_CLAIMS: [&str; 4] = ["upn", "unique_name", "email", "preferred_username"];

/// Decoded token payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims(Map<String, Value>);

impl Claims {
  /// Decode the payload of a three-segment bearer token.
  pub fn decode(token: &str) -> Result<Self> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
      return Err(StoreError::Validation("invalid JWT format".to_string()));
    };

    let bytes = URL_SAFE_NO_PAD
      .decode(payload.trim_end_matches('='))
      .map_err(|e| StoreError::Validation(format!("failed to decode JWT payload: {e}")))?;

    match serde_json::from_slice(&bytes) {
      Ok(Value::Object(map)) => Ok(Self(map)),
      Ok(_) => Err(StoreError::Validation("JWT payload is not an object".to_string())),
      Err(e) => Err(StoreError::Validation(format!("failed to parse JWT claims: {e}"))),
    }
  }

  /// A non-empty string claim.
  pub fn string(&self, name: &str) -> Option<&str> {
    self.0.get(name).and_then(Value::as_str).filter(|s| !s.is_empty())
  }

  /// Object id of the principal.
  pub fn oid(&self) -> Result<&str> {
    self
      .string("oid")
      .ok_or_else(|| StoreError::Validation("oid claim not found in token".to_string()))
  }

  /// First username-bearing claim.
  pub fn username(&self) -> Option<&str> {
    USERNAME_CLAIMS.iter().find_map(|claim| self.string(claim))
  }

  pub fn tenant_id(&self) -> Option<&str> {
    self.string("tid")
  }
}

/// Username from `token`, or [`UNKNOWN_USERNAME`] when none can be read.
pub fn username_or_fallback(token: &str) -> String {
  Claims::decode(token)
    .ok()
    .and_then(|claims| claims.username().map(str::to_string))
    .unwrap_or_else(|| UNKNOWN_USERNAME.to_string())
}
