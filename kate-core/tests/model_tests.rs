use kate_core::policy::{AuthenticationPolicy, JwtPolicy, RateLimitPolicy};
use kate_core::route::{KateRoutes, Method, RequestBodyType, Route};
use kate_core::service::Service;
use kate_core::trace::{AuthType, PagedResult, Trace};
use kate_core::envelope::Envelope;
use serde_json::json;

// =============================================================================
// Service / Route Tests
// =============================================================================

#[test]
fn test_service_listing_envelope_decodes() {
    let raw = json!({
        "message": "ok",
        "data": [
            {
                "name": "accounts",
                "routes": [
                    {
                        "uri": "/accounts/{account_id}",
                        "methods": [{ "method": "GET", "requestBodyType": "JSON" }],
                        "authenticationPolicy": {
                            "type": "JwtPolicy",
                            "check": "scope contains accounts:read",
                            "checkPath": "$.scope",
                            "audience": "kate"
                        },
                        "rateLimitPolicy": { "limit": 50, "per": "MINUTE" }
                    }
                ]
            },
            { "name": "health", "routes": [] }
        ]
    });

    let env: Envelope<Vec<Service>> = serde_json::from_value(raw).unwrap();
    assert_eq!(env.message.as_deref(), Some("ok"));
    assert_eq!(env.data.len(), 2);

    let route = &env.data[0].routes[0];
    assert!(route.is_protected());
    let jwt = route.jwt_policy().unwrap();
    assert_eq!(jwt.check_path, "$.scope");
    assert_eq!(jwt.extra["audience"], "kate");
    assert_eq!(
        route.rate_limit_policy,
        Some(RateLimitPolicy(json!({ "limit": 50, "per": "MINUTE" })))
    );
}

#[test]
fn test_route_serialization_roundtrip_keeps_policies() {
    let route = Route {
        uri: "/orders".to_string(),
        methods: vec![Method::new("POST", RequestBodyType::FormData)],
        authentication_policy: Some(AuthenticationPolicy::Jwt(JwtPolicy {
            check: "role == admin".to_string(),
            check_path: "$.role".to_string(),
            extra: Default::default(),
        })),
        rate_limit_policy: Some(RateLimitPolicy(json!({ "limit": 5 }))),
        extra: Default::default(),
    };

    let json = serde_json::to_string(&route).unwrap();
    let deserialized: Route = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, route);
    assert!(json.contains("\"requestBodyType\":\"FORM_DATA\""));
    assert!(json.contains("\"authenticationPolicy\":{\"type\":\"JwtPolicy\""));
}

#[test]
fn test_public_route_serializes_null_policies() {
    let route = Route::new("/ping", vec![Method::new("GET", RequestBodyType::Json)]);
    let value = serde_json::to_value(&route).unwrap();
    assert!(value["authenticationPolicy"].is_null());
    assert!(value["rateLimitPolicy"].is_null());
}

#[test]
fn test_kate_routes_with_unresolved_route() {
    let rows: Vec<KateRoutes> = serde_json::from_value(json!([
        { "path": "/a", "method": "GET", "route": null },
        { "path": "/b", "method": "POST", "route": { "uri": "/b", "methods": [{ "method": "POST" }] } }
    ]))
    .unwrap();
    assert!(rows[0].route.is_none());
    let resolved = rows[1].route.as_ref().unwrap();
    assert_eq!(resolved.methods[0].request_body_type, RequestBodyType::Json);
}

// =============================================================================
// Trace Tests
// =============================================================================

#[test]
fn test_paged_traces_decode_and_stay_consistent() {
    let raw = json!({
        "page": 3,
        "count": 20,
        "total": 45,
        "hasNext": false,
        "hasPrevious": true,
        "items": [{
            "id": "trace-41",
            "route": "/users/{user_id}",
            "status": 401,
            "duration": 3,
            "timeStamp": "2024-06-02T08:00:00.125",
            "method": "GET",
            "sourceIp": "192.168.1.20",
            "headers": "authorization: Bearer ...",
            "upstreamDuration": 0,
            "requestBody": "",
            "responseBody": "{\"error\":\"expired\"}",
            "authType": "JWT",
            "authSuccess": false
        }]
    });

    let page: PagedResult<Trace> = serde_json::from_value(raw).unwrap();
    assert!(page.is_consistent());
    assert_eq!(page.total_pages(), 3);
    assert_eq!(page.items[0].auth_type, AuthType::Jwt);
    assert!(!page.items[0].auth_success);
}
