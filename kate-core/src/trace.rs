use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One recorded request that passed through the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    pub id: String,
    pub route: String,
    pub status: u16,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    #[serde(rename = "timeStamp")]
    pub timestamp: NaiveDateTime,
    pub method: String,
    pub source_ip: String,
    /// Raw header dump as recorded by the gateway
    pub headers: String,
    #[serde(rename = "upstreamDuration")]
    pub upstream_duration_ms: u64,
    /// Opaque JSON text
    pub request_body: String,
    /// Opaque JSON text
    pub response_body: String,
    pub auth_type: AuthType,
    pub auth_success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthType {
    Jwt,
    Key,
    None,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Jwt => "JWT",
            AuthType::Key => "KEY",
            AuthType::None => "NONE",
        }
    }
}

impl std::str::FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "JWT" => Ok(AuthType::Jwt),
            "KEY" => Ok(AuthType::Key),
            "NONE" => Ok(AuthType::None),
            other => Err(format!("unknown auth type: {other}")),
        }
    }
}

/// One page of a server-side listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    /// 1-based page number
    pub page: u32,
    /// Page size the page was requested with
    pub count: u32,
    /// Total number of items across all pages
    pub total: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub items: Vec<T>,
}

impl<T> PagedResult<T> {
    /// `ceil(total / count)`, 0 for a zero page size.
    pub fn total_pages(&self) -> u64 {
        if self.count == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.count))
    }

    pub fn expected_has_next(&self) -> bool {
        u64::from(self.page) * u64::from(self.count) < self.total
    }

    pub fn expected_has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn is_consistent(&self) -> bool {
        self.has_next == self.expected_has_next() && self.has_previous == self.expected_has_previous()
    }

    /// Recompute the navigation flags from `page`, `count` and `total`.
    /// Returns `true` when the flags had to change.
    pub fn normalize(&mut self) -> bool {
        let consistent = self.is_consistent();
        self.has_next = self.expected_has_next();
        self.has_previous = self.expected_has_previous();
        !consistent
    }
}

/// Pretty-print a JSON object body for display.
///
/// Bodies that are not a JSON object (malformed text, arrays, scalars,
/// empty strings) render as an empty string instead of failing.
pub fn pretty_body(raw: &str) -> String {
    serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw)
        .and_then(|object| serde_json::to_string_pretty(&object))
        .unwrap_or_default()
}

/// Display-ready view of a single trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceDetail {
    pub id: String,
    pub summary: String,
    pub request_body: String,
    pub response_body: String,
}

impl From<&Trace> for TraceDetail {
    fn from(trace: &Trace) -> Self {
        Self {
            id: trace.id.clone(),
            summary: format!(
                "{} {} -> {} in {}ms (upstream {}ms), auth {} {}",
                trace.method,
                trace.route,
                trace.status,
                trace.duration_ms,
                trace.upstream_duration_ms,
                trace.auth_type.as_str(),
                if trace.auth_success { "ok" } else { "failed" },
            ),
            request_body: pretty_body(&trace.request_body),
            response_body: pretty_body(&trace.response_body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(page: u32, count: u32, total: u64) -> PagedResult<()> {
        PagedResult {
            page,
            count,
            total,
            has_next: false,
            has_previous: false,
            items: vec![],
        }
    }

    #[test]
    fn trace_deserializes_wire_names() {
        let trace: Trace = serde_json::from_value(json!({
            "id": "t-1",
            "route": "/orders",
            "status": 200,
            "duration": 12,
            "timeStamp": "2024-05-01T10:15:30",
            "method": "GET",
            "sourceIp": "10.0.0.7",
            "headers": "accept: */*",
            "upstreamDuration": 9,
            "requestBody": "",
            "responseBody": "{\"ok\":true}",
            "authType": "JWT",
            "authSuccess": true
        }))
        .unwrap();
        assert_eq!(trace.duration_ms, 12);
        assert_eq!(trace.upstream_duration_ms, 9);
        assert_eq!(trace.auth_type, AuthType::Jwt);
        assert_eq!(trace.timestamp.to_string(), "2024-05-01 10:15:30");
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(page(1, 20, 45).total_pages(), 3);
        assert_eq!(page(1, 20, 40).total_pages(), 2);
        assert_eq!(page(1, 20, 0).total_pages(), 0);
        assert_eq!(page(1, 0, 10).total_pages(), 0);
    }

    #[test]
    fn normalize_fixes_flags() {
        let mut last = page(3, 20, 45);
        last.has_next = true;
        assert!(last.normalize());
        assert!(!last.has_next);
        assert!(last.has_previous);
        assert!(!last.normalize());
        assert!(last.is_consistent());
    }

    #[test]
    fn first_page_of_many() {
        let mut first = page(1, 20, 45);
        first.normalize();
        assert!(first.has_next);
        assert!(!first.has_previous);
    }

    #[test]
    fn pretty_body_preserves_object() {
        let pretty = pretty_body(r#"{"a":1,"b":{"c":[1,2]}}"#);
        let reparsed: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(reparsed, json!({"a": 1, "b": {"c": [1, 2]}}));
        assert!(pretty.contains('\n'));
    }

    #[test]
    fn pretty_body_falls_back_to_empty() {
        assert_eq!(pretty_body("{not json"), "");
        assert_eq!(pretty_body(""), "");
        assert_eq!(pretty_body("[1,2,3]"), "");
    }
}
