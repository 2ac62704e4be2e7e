use crate::route::Route;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Service definition: a named group of routes.
///
/// The gateway stores a service's route list as one document. Saving a
/// service replaces that list in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,

    #[serde(default)]
    pub routes: Vec<Route>,

    /// Gateway-owned fields (upstream, labels, ...) passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Service {
    pub fn new(name: impl Into<String>, routes: Vec<Route>) -> Self {
        Self {
            name: name.into(),
            routes,
            extra: Map::new(),
        }
    }

    /// Copy of this service document whose route list is exactly `routes`.
    pub fn with_routes(&self, routes: Vec<Route>) -> Self {
        Self {
            name: self.name.clone(),
            routes,
            extra: self.extra.clone(),
        }
    }

    pub fn contains_route(&self, route: &Route) -> bool {
        self.routes.iter().any(|r| r == route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{Method, RequestBodyType};
    use serde_json::json;

    #[test]
    fn minimal_service_deserializes() {
        let json = r#"{"name": "billing"}"#;
        let svc: Service = serde_json::from_str(json).unwrap();
        assert_eq!(svc.name, "billing");
        assert!(svc.routes.is_empty());
        assert!(svc.extra.is_empty());
    }

    #[test]
    fn service_with_routes_and_upstream_roundtrip() {
        let raw = json!({
            "name": "orders",
            "upstream": "http://orders.internal:8080",
            "routes": [
                { "uri": "/orders", "methods": [{ "method": "GET", "requestBodyType": "JSON" }] }
            ]
        });
        let svc: Service = serde_json::from_value(raw).unwrap();
        assert_eq!(svc.routes.len(), 1);
        assert_eq!(svc.extra["upstream"], "http://orders.internal:8080");

        let back = serde_json::to_value(&svc).unwrap();
        assert_eq!(back["upstream"], "http://orders.internal:8080");
        assert_eq!(back["routes"][0]["uri"], "/orders");
    }

    #[test]
    fn with_routes_replaces_list_and_keeps_extra() {
        let mut svc = Service::new(
            "orders",
            vec![
                Route::new("/a", vec![Method::new("GET", RequestBodyType::Json)]),
                Route::new("/b", vec![Method::new("GET", RequestBodyType::Json)]),
            ],
        );
        svc.extra.insert("upstream".into(), json!("orders-svc"));

        let replaced = svc.with_routes(vec![Route::new("/c", vec![])]);
        assert_eq!(replaced.routes.len(), 1);
        assert_eq!(replaced.routes[0].uri, "/c");
        assert_eq!(replaced.extra["upstream"], "orders-svc");
        assert_eq!(svc.routes.len(), 2);
    }

    #[test]
    fn contains_route_compares_whole_route() {
        let route = Route::new("/a", vec![Method::new("GET", RequestBodyType::Json)]);
        let svc = Service::new("s", vec![route.clone()]);
        assert!(svc.contains_route(&route));
        assert!(!svc.contains_route(&Route::new("/a", vec![])));
    }
}
