use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Authentication policy attached to a route.
///
/// Tagged on `"type"`. Fields the client does not model are kept in
/// `extra` so they survive a read/modify/write cycle. Policy types other
/// than `JwtPolicy` and `KeyPolicy` are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "WirePolicy")]
pub enum AuthenticationPolicy {
    Jwt(JwtPolicy),
    Key(KeyPolicy),
    Other(Value),
}

impl AuthenticationPolicy {
    pub fn as_jwt(&self) -> Option<&JwtPolicy> {
        match self {
            AuthenticationPolicy::Jwt(jwt) => Some(jwt),
            _ => None,
        }
    }

    /// Short label: `jwt`, `key`, or the gateway's `type` for other policies.
    pub fn kind(&self) -> &str {
        match self {
            AuthenticationPolicy::Jwt(_) => "jwt",
            AuthenticationPolicy::Key(_) => "key",
            AuthenticationPolicy::Other(raw) => raw.get("type").and_then(Value::as_str).unwrap_or("other"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum KnownPolicy {
    #[serde(rename = "JwtPolicy")]
    Jwt(JwtPolicy),
    #[serde(rename = "KeyPolicy")]
    Key(KeyPolicy),
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePolicy {
    Known(KnownPolicy),
    Other(Value),
}

impl From<Value> for AuthenticationPolicy {
    fn from(raw: Value) -> Self {
        let known = matches!(
            raw.get("type").and_then(Value::as_str),
            Some("JwtPolicy") | Some("KeyPolicy")
        );
        if !known {
            return AuthenticationPolicy::Other(raw);
        }
        match serde_json::from_value::<KnownPolicy>(raw.clone()) {
            Ok(KnownPolicy::Jwt(jwt)) => AuthenticationPolicy::Jwt(jwt),
            Ok(KnownPolicy::Key(key)) => AuthenticationPolicy::Key(key),
            Err(_) => AuthenticationPolicy::Other(raw),
        }
    }
}

impl From<AuthenticationPolicy> for WirePolicy {
    fn from(policy: AuthenticationPolicy) -> Self {
        match policy {
            AuthenticationPolicy::Jwt(jwt) => WirePolicy::Known(KnownPolicy::Jwt(jwt)),
            AuthenticationPolicy::Key(key) => WirePolicy::Known(KnownPolicy::Key(key)),
            AuthenticationPolicy::Other(raw) => WirePolicy::Other(raw),
        }
    }
}

/// JWT verification policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtPolicy {
    /// Claim check expression evaluated by the gateway.
    #[serde(default)]
    pub check: String,

    /// Path of the value the check is evaluated against.
    #[serde(default)]
    pub check_path: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JwtPolicy {
    /// Copy with the per-route verification fields blanked.
    ///
    /// Shared parameters (issuer, keys, ...) in `extra` are kept.
    pub fn sanitized(&self) -> Self {
        Self {
            check: String::new(),
            check_path: String::new(),
            extra: self.extra.clone(),
        }
    }
}

/// API key policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Rate-limit policy. Opaque to the client: only ever copied from an
/// existing route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateLimitPolicy(pub Value);
