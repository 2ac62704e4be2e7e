//! Policy inheritance lookups.
//!
//! The admin client has no editor for policies. New and edited routes
//! borrow them from routes that already carry one. The rule is a heuristic:
//! the first match in service order, then route order, wins. If the gateway
//! reorders its services or routes, a different (possibly unrelated) route's
//! policy gets attached.

use kate_core::policy::{JwtPolicy, RateLimitPolicy};
use kate_core::route::{KateRoutes, Route};
use kate_core::service::Service;

fn all_routes(services: &[Service]) -> impl Iterator<Item = &Route> {
    services.iter().flat_map(|s| s.routes.iter())
}

/// First JWT authentication policy found on any route.
pub fn find_first_jwt_policy(services: &[Service]) -> Option<&JwtPolicy> {
    all_routes(services).find_map(Route::jwt_policy)
}

/// First rate-limit policy found on any route.
pub fn find_first_rate_limit_policy(services: &[Service]) -> Option<&RateLimitPolicy> {
    all_routes(services).find_map(|r| r.rate_limit_policy.as_ref())
}

/// Service whose route list holds the row's resolved route.
pub fn service_for_route<'a>(services: &'a [Service], row: &KateRoutes) -> Option<&'a Service> {
    let route = row.route.as_ref()?;
    services.iter().find(|s| s.contains_route(route))
}
