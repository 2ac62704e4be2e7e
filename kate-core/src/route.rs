use crate::policy::{AuthenticationPolicy, RateLimitPolicy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A Route maps one path on the gateway to its methods and policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// URI path pattern; parameters are written `{name}`
    pub uri: String,

    /// Allowed methods with their request body type
    #[serde(default)]
    pub methods: Vec<Method>,

    /// Authentication policy (absent = public route)
    #[serde(default)]
    pub authentication_policy: Option<AuthenticationPolicy>,

    /// Rate-limit policy
    #[serde(default)]
    pub rate_limit_policy: Option<RateLimitPolicy>,

    /// Fields owned by the gateway that the client passes through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Route {
    pub fn new(uri: impl Into<String>, methods: Vec<Method>) -> Self {
        Self {
            uri: uri.into(),
            methods,
            authentication_policy: None,
            rate_limit_policy: None,
            extra: Map::new(),
        }
    }

    pub fn is_protected(&self) -> bool {
        self.authentication_policy.is_some()
    }

    /// Body type of the first declared method, JSON when none is declared.
    pub fn request_body_type(&self) -> RequestBodyType {
        self.methods
            .first()
            .map(|m| m.request_body_type)
            .unwrap_or_default()
    }

    /// The JWT policy attached to this route, if any.
    pub fn jwt_policy(&self) -> Option<&crate::policy::JwtPolicy> {
        self.authentication_policy.as_ref().and_then(|p| p.as_jwt())
    }
}

/// One method entry of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    pub method: String,
    #[serde(default)]
    pub request_body_type: RequestBodyType,
}

impl Method {
    pub fn new(method: impl Into<String>, request_body_type: RequestBodyType) -> Self {
        Self {
            method: method.into(),
            request_body_type,
        }
    }
}

/// Expected request body encoding of a route method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestBodyType {
    #[default]
    Json,
    Xml,
    FormData,
    Text,
    /// Any value this client does not know about.
    #[serde(other)]
    Other,
}

impl RequestBodyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestBodyType::Json => "JSON",
            RequestBodyType::Xml => "XML",
            RequestBodyType::FormData => "FORM_DATA",
            RequestBodyType::Text => "TEXT",
            RequestBodyType::Other => "OTHER",
        }
    }
}

impl FromStr for RequestBodyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "JSON" => Ok(RequestBodyType::Json),
            "XML" => Ok(RequestBodyType::Xml),
            "FORM_DATA" | "FORM" => Ok(RequestBodyType::FormData),
            "TEXT" => Ok(RequestBodyType::Text),
            other => Err(format!("unknown request body type: {other}")),
        }
    }
}

/// Methods an operator may assign to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 4] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("method must be one of GET, POST, PUT, DELETE (got {s:?})"))
    }
}

/// Flattened listing row: one path/method pair and the route behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KateRoutes {
    pub path: String,
    pub method: String,
    /// `None` when the gateway could not resolve the underlying route
    #[serde(default)]
    pub route: Option<Route>,
}

impl KateRoutes {
    pub fn new(path: impl Into<String>, method: impl Into<String>, route: Option<Route>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            route,
        }
    }
}

/// Human-readable name for a route path.
///
/// `/users/{user_id}/orders` becomes `Users by User id Orders`: empty
/// segments are dropped, `{param}` segments render as `by <Param>` with
/// underscores turned into spaces, every segment gets its first
/// character upper-cased.
pub fn transform_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match param_name(segment) {
            Some(name) => format!("by {}", capitalize(&name.replace('_', " ")))
                .trim_end()
                .to_string(),
            None => capitalize(segment),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn param_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transform_path_renders_params() {
        assert_eq!(transform_path("/users/{user_id}/orders"), "Users by User id Orders");
    }

    #[test]
    fn transform_path_plain_segments() {
        assert_eq!(transform_path("/health"), "Health");
        assert_eq!(transform_path("/api/v1/items"), "Api V1 Items");
    }

    #[test]
    fn transform_path_ignores_empty_segments() {
        assert_eq!(transform_path(""), "");
        assert_eq!(transform_path("/"), "");
        assert_eq!(transform_path("orders//{id}/"), "Orders by Id");
    }

    #[test]
    fn transform_path_is_deterministic() {
        let path = "/accounts/{account_id}/cards/{card_no}";
        assert_eq!(transform_path(path), transform_path(path));
        assert_eq!(transform_path(path), "Accounts by Account id Cards by Card no");
    }

    #[test]
    fn route_defaults_on_minimal_json() {
        let route: Route = serde_json::from_value(json!({"uri": "/ping"})).unwrap();
        assert_eq!(route.uri, "/ping");
        assert!(route.methods.is_empty());
        assert!(!route.is_protected());
        assert!(route.rate_limit_policy.is_none());
        assert_eq!(route.request_body_type(), RequestBodyType::Json);
    }

    #[test]
    fn route_keeps_unknown_fields() {
        let raw = json!({
            "uri": "/orders",
            "methods": [{"method": "GET", "requestBodyType": "JSON"}],
            "authenticationPolicy": null,
            "rateLimitPolicy": null,
            "upstream": "orders-svc"
        });
        let route: Route = serde_json::from_value(raw).unwrap();
        assert_eq!(route.extra["upstream"], "orders-svc");
        let back = serde_json::to_value(&route).unwrap();
        assert_eq!(back["upstream"], "orders-svc");
        assert_eq!(back["methods"][0]["method"], "GET");
    }

    #[test]
    fn unknown_body_type_decodes_as_other() {
        let m: Method =
            serde_json::from_value(json!({"method": "POST", "requestBodyType": "PROTOBUF"})).unwrap();
        assert_eq!(m.request_body_type, RequestBodyType::Other);
    }

    #[test]
    fn http_method_parses_fixed_set_only() {
        assert_eq!("PUT".parse::<HttpMethod>().unwrap(), HttpMethod::Put);
        assert!("PATCH".parse::<HttpMethod>().is_err());
        assert!("get".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn body_type_from_str_is_lenient_on_case() {
        assert_eq!("form-data".parse::<RequestBodyType>().unwrap(), RequestBodyType::FormData);
        assert_eq!("json".parse::<RequestBodyType>().unwrap(), RequestBodyType::Json);
        assert!("yaml".parse::<RequestBodyType>().is_err());
    }
}
