//! Route and service listing plus route mutations.

use crate::policy::{find_first_jwt_policy, find_first_rate_limit_policy};
use kate_client::GatewayClient;
use kate_core::error::KateError;
use kate_core::policy::AuthenticationPolicy;
use kate_core::route::{KateRoutes, Method, RequestBodyType, Route};
use kate_core::service::Service;
use kate_core::state::{StateCell, Subscription};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteState {
    pub is_loading: bool,
    /// Rows currently shown (filtered by `search`)
    pub routes: Vec<KateRoutes>,
    /// Last full listing from the gateway
    pub original_routes: Vec<KateRoutes>,
    pub services: Vec<Service>,
    pub error: Option<String>,
}

/// Everything needed to commit one route create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEdit {
    /// Target service; its route list is replaced by the request
    pub service: Service,
    /// Path and method of the row. The route being edited travels in
    /// `routes.route`: `None` when creating, required when updating.
    pub routes: KateRoutes,
    pub is_protected: bool,
    pub request_body_type: RequestBodyType,
}

/// Result of a create or update call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Gateway accepted the write; the listing was reloaded.
    Applied,
    /// Request was sent and failed; the error is in state.
    Failed,
    /// Nothing was sent; the error is in state.
    Rejected,
}

#[derive(Clone)]
pub struct RouteRepository {
    client: GatewayClient,
    state: Arc<StateCell<RouteState>>,
    writes: Arc<Mutex<()>>,
}

impl RouteRepository {
    pub fn new(client: GatewayClient) -> Self {
        Self {
            client,
            state: Arc::new(StateCell::default()),
            writes: Arc::new(Mutex::new(())),
        }
    }

    pub fn state(&self) -> Arc<RouteState> {
        self.state.snapshot()
    }

    pub fn cell(&self) -> &Arc<StateCell<RouteState>> {
        &self.state
    }

    pub fn subscribe(&self, listener: impl Fn(&RouteState) + Send + Sync + 'static) -> Subscription {
        self.state.subscribe(listener)
    }

    /// Fetch routes and services together. Both must succeed for either to
    /// be applied.
    pub async fn load(&self) {
        self.state.update(|s| RouteState {
            is_loading: true,
            ..s.clone()
        });

        let (routes, services) = tokio::join!(self.client.list_routes(), self.client.list_services());
        match (routes, services) {
            (Ok(routes), Ok(services)) => {
                info!(routes = routes.len(), services = services.len(), "route listing loaded");
                self.state.update(|s| RouteState {
                    is_loading: false,
                    routes: routes.clone(),
                    original_routes: routes,
                    services,
                    error: s.error.clone(),
                });
            }
            (Err(e), _) | (_, Err(e)) => self.fail("load", e),
        }
    }

    /// Filter the shown rows by path substring. An empty query restores the
    /// full listing.
    pub fn search(&self, query: &str) {
        self.state.update(|s| RouteState {
            routes: filter_routes(&s.original_routes, query),
            ..s.clone()
        });
    }

    pub fn dismiss_error(&self) {
        self.state.update(|s| RouteState {
            error: None,
            ..s.clone()
        });
    }

    /// Create a route by POSTing `edit.service` with its route list
    /// replaced by the new route alone.
    ///
    /// The gateway treats the body as the whole service, so the service's
    /// other routes are dropped by this call.
    pub async fn add_route(&self, edit: RouteEdit) -> WriteOutcome {
        let Ok(_guard) = self.writes.try_lock() else {
            return self.reject("add_route", KateError::Busy);
        };
        let body = match creation_body(&self.state().services, &edit) {
            Ok(body) => body,
            Err(e) => return self.reject("add_route", e),
        };
        self.commit("add_route", &body, self.client.create_route(&body)).await
    }

    /// Update a route by PUTting `edit.service` with its route list
    /// replaced by the edited route.
    pub async fn update_route(&self, edit: RouteEdit) -> WriteOutcome {
        let Ok(_guard) = self.writes.try_lock() else {
            return self.reject("update_route", KateError::Busy);
        };
        let body = match update_body(&self.state().services, &edit) {
            Ok(body) => body,
            Err(e) => return self.reject("update_route", e),
        };
        self.commit("update_route", &body, self.client.update_route(&body)).await
    }

    async fn commit(
        &self,
        op: &'static str,
        body: &Service,
        request: impl Future<Output = Result<(), KateError>>,
    ) -> WriteOutcome {
        self.state.update(|s| RouteState {
            is_loading: true,
            ..s.clone()
        });
        match request.await {
            Ok(()) => {
                info!(op, service = %body.name, "route write applied");
                self.load().await;
                WriteOutcome::Applied
            }
            Err(e) => {
                self.fail(op, e);
                WriteOutcome::Failed
            }
        }
    }

    fn reject(&self, op: &'static str, e: KateError) -> WriteOutcome {
        error!(op, error = %e, "route write rejected");
        self.state.update(|s| RouteState {
            error: Some(e.to_string()),
            ..s.clone()
        });
        WriteOutcome::Rejected
    }

    fn fail(&self, op: &'static str, e: KateError) {
        error!(op, error = ?e, "route request failed");
        self.state.update(|s| RouteState {
            is_loading: false,
            error: Some(e.to_string()),
            ..s.clone()
        });
    }
}

/// Rows whose path contains `query`.
pub fn filter_routes(rows: &[KateRoutes], query: &str) -> Vec<KateRoutes> {
    rows.iter().filter(|r| r.path.contains(query)).cloned().collect()
}

/// Request body for a route create.
///
/// A protected route gets the first JWT policy found on any route, with its
/// check fields blanked. Every new route copies the first rate-limit policy
/// found, or none if no route has one.
pub fn creation_body(services: &[Service], edit: &RouteEdit) -> Result<Service, KateError> {
    let mut route = Route::new(
        edit.routes.path.clone(),
        vec![Method::new(edit.routes.method.clone(), edit.request_body_type)],
    );
    if edit.is_protected {
        let jwt = find_first_jwt_policy(services)
            .ok_or_else(|| KateError::PolicyUnavailable("no route carries a JWT policy".into()))?;
        route.authentication_policy = Some(AuthenticationPolicy::Jwt(jwt.sanitized()));
    }
    route.rate_limit_policy = find_first_rate_limit_policy(services).cloned();
    Ok(edit.service.with_routes(vec![route]))
}

/// Request body for a route update.
///
/// The route keeps its uri, rate-limit policy and pass-through fields. Its
/// methods become the single edited method. A protected route gets the first
/// JWT policy found, as stored, unless it already carries a policy type this
/// client does not model; that one is sent back unchanged.
pub fn update_body(services: &[Service], edit: &RouteEdit) -> Result<Service, KateError> {
    let mut route = edit
        .routes
        .route
        .clone()
        .ok_or_else(|| KateError::Validation(format!("Invalid route: {} is not resolved", edit.routes.path)))?;
    route.methods = vec![Method::new(edit.routes.method.clone(), edit.request_body_type)];
    route.authentication_policy = if !edit.is_protected {
        None
    } else if let Some(AuthenticationPolicy::Other(raw)) = route.authentication_policy.take() {
        Some(AuthenticationPolicy::Other(raw))
    } else {
        let jwt = find_first_jwt_policy(services)
            .ok_or_else(|| KateError::PolicyUnavailable("no route carries a JWT policy".into()))?;
        Some(AuthenticationPolicy::Jwt(jwt.clone()))
    };
    Ok(edit.service.with_routes(vec![route]))
}
