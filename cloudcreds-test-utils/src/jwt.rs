//! Unsigned JWT fixtures.
//!
//! The credential stores only ever read the payload segment of a bearer
//! token, so fixtures carry a fixed header and a dummy signature.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};

const HEADER: &str = r#"{"alg":"RS256","typ":"JWT"}"#;

/// Build a three-segment token whose payload is `claims`.
pub fn unsigned_jwt(claims: &Value) -> String {
  let header = URL_SAFE_NO_PAD.encode(HEADER);
  let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
  format!("{header}.{payload}.signature")
}

/// Token for an interactive user session.
pub fn user_token(oid: &str, tenant_id: &str, upn: &str) -> String {
  unsigned_jwt(&json!({
    "oid": oid,
    "tid": tenant_id,
    "upn": upn,
    "aud": "https://management.azure.com/",
  }))
}

/// Token for an application-only (service principal) session.
pub fn service_principal_token(oid: &str, tenant_id: &str, client_id: &str) -> String {
  unsigned_jwt(&json!({
    "oid": oid,
    "tid": tenant_id,
    "appid": client_id,
    "idtyp": "app",
    "aud": "https://management.azure.com/",
  }))
}
