use crate::session::Session;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport};
use http::Method;
use kate_core::dashboard::DashboardHome;
use kate_core::envelope::{Envelope, LoginRequest, Token};
use kate_core::error::KateError;
use kate_core::route::KateRoutes;
use kate_core::service::Service;
use kate_core::trace::{PagedResult, Trace};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Control API paths.
pub mod paths {
    pub const LOGIN: &str = "/_login";
    pub const HOME: &str = "/_dashboard/home";
    pub const ROUTES: &str = "/_dashboard/route";
    pub const SERVICES: &str = "/_dashboard/service";
    pub const TRACES: &str = "/_dashboard/traces";
}

/// What a 401 means for the call being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnUnauthorized {
    /// The token was rejected: drop it.
    ClearToken,
    /// Credentials were rejected (login); there is no token to drop.
    Keep,
}

/// Typed client for the gateway control API.
///
/// Cheap to clone; clones share the transport and the session.
#[derive(Clone)]
pub struct GatewayClient {
    transport: Arc<dyn HttpTransport>,
    session: Arc<Session>,
}

impl GatewayClient {
    pub fn new(transport: Arc<dyn HttpTransport>, session: Arc<Session>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// `POST /_login`. Does not store the token; see `Session::save_token`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Token, KateError> {
        let body = serde_json::to_value(LoginRequest { email, password })?;
        let req = ApiRequest::new(Method::POST, paths::LOGIN).json(body);
        let resp = self.execute(req, OnUnauthorized::Keep).await?;
        decode(&resp)
    }

    /// `GET /_dashboard/home`.
    pub async fn dashboard_home(&self) -> Result<DashboardHome, KateError> {
        self.get(paths::HOME).await
    }

    /// `GET /_dashboard/route`.
    pub async fn list_routes(&self) -> Result<Vec<KateRoutes>, KateError> {
        self.get(paths::ROUTES).await
    }

    /// `GET /_dashboard/service`.
    pub async fn list_services(&self) -> Result<Vec<Service>, KateError> {
        self.get(paths::SERVICES).await
    }

    /// `POST /_dashboard/route` with a full service document.
    pub async fn create_route(&self, service: &Service) -> Result<(), KateError> {
        self.write(Method::POST, service).await
    }

    /// `PUT /_dashboard/route` with a full service document.
    pub async fn update_route(&self, service: &Service) -> Result<(), KateError> {
        self.write(Method::PUT, service).await
    }

    /// `GET /_dashboard/traces?page=&count=`.
    ///
    /// The returned page always satisfies `has_next == page*count < total`
    /// and `has_previous == page > 1`.
    pub async fn traces(&self, page: u32, count: u32) -> Result<PagedResult<Trace>, KateError> {
        let req = ApiRequest::new(Method::GET, paths::TRACES)
            .query("page", page)
            .query("count", count);
        let resp = self.execute(req, OnUnauthorized::ClearToken).await?;
        let mut result: PagedResult<Trace> = decode(&resp)?;
        let (has_next, has_previous) = (result.has_next, result.has_previous);
        if result.normalize() {
            warn!(
                page = result.page,
                count = result.count,
                total = result.total,
                has_next,
                has_previous,
                "traces: gateway paging flags disagree with page/count/total, recomputed"
            );
        }
        Ok(result)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, KateError> {
        let req = ApiRequest::new(Method::GET, path);
        let resp = self.execute(req, OnUnauthorized::ClearToken).await?;
        decode(&resp)
    }

    async fn write(&self, method: Method, service: &Service) -> Result<(), KateError> {
        let body = serde_json::to_value(service)?;
        let req = ApiRequest::new(method, paths::ROUTES).json(body);
        let resp = self.execute(req, OnUnauthorized::ClearToken).await?;

        // Mutations answer with an envelope whose payload we do not use.
        if resp.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        let env: Envelope<Option<serde_json::Value>> =
            serde_json::from_slice(&resp.body).map_err(|e| KateError::Decode(e.to_string()))?;
        if let Some(message) = env.message {
            debug!(service = %service.name, message = %message, "route write acknowledged");
        }
        Ok(())
    }

    async fn execute(&self, req: ApiRequest, on_unauthorized: OnUnauthorized) -> Result<ApiResponse, KateError> {
        let req = req.bearer(self.session.token());
        let (method, path, request_id) = (req.method.clone(), req.path.clone(), req.request_id);

        let resp = match self.transport.send(req).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(%method, %path, %request_id, error = ?e, "gateway request failed");
                return Err(e);
            }
        };
        debug!(%method, %path, %request_id, status = resp.status.as_u16(), "gateway response");

        if resp.status.is_success() {
            return Ok(resp);
        }

        let err = KateError::from_status(resp.status);
        if err.is_unauthorized() && on_unauthorized == OnUnauthorized::ClearToken {
            warn!(%path, %request_id, "gateway rejected token, clearing session");
            self.session.clear();
        }
        Err(err)
    }
}

fn decode<T: DeserializeOwned>(resp: &ApiResponse) -> Result<T, KateError> {
    serde_json::from_slice::<Envelope<T>>(&resp.body)
        .map(|env| env.data)
        .map_err(|e| KateError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedTransport;
    use http::StatusCode;
    use serde_json::json;

    fn client(transport: Arc<ScriptedTransport>) -> GatewayClient {
        let session = Arc::new(Session::in_memory());
        session.save_token("tok-1");
        GatewayClient::new(transport, session)
    }

    #[tokio::test]
    async fn bearer_token_is_attached() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::GET, paths::ROUTES, StatusCode::OK, json!({"data": []}));
        let client = client(Arc::clone(&transport));

        client.list_routes().await.unwrap();
        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].bearer.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn unauthorized_clears_token_once() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::GET, paths::HOME, StatusCode::UNAUTHORIZED, json!({}));
        let client = client(Arc::clone(&transport));

        let err = client.dashboard_home().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "Unauthorized");
        assert!(client.session().token().is_none());
    }

    #[tokio::test]
    async fn login_401_keeps_session_untouched() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::POST, paths::LOGIN, StatusCode::UNAUTHORIZED, json!({}));
        let client = client(Arc::clone(&transport));

        let err = client.login("a@b.c", "wrong").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(client.session().token().as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn server_error_uses_status_description() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::GET, paths::SERVICES, StatusCode::BAD_GATEWAY, json!({}));
        let client = client(transport);

        let err = client.list_services().await.unwrap_err();
        assert_eq!(err.to_string(), "Bad Gateway");
        assert_eq!(err.status_code(), Some(502));
    }

    #[tokio::test]
    async fn schema_mismatch_is_decode_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::GET, paths::SERVICES, StatusCode::OK, json!({"data": {"not": "a list"}}));
        let client = client(transport);

        assert!(matches!(client.list_services().await, Err(KateError::Decode(_))));
    }

    #[tokio::test]
    async fn writes_accept_empty_and_envelope_bodies() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_raw(Method::POST, paths::ROUTES, StatusCode::CREATED, "");
        transport.respond(Method::PUT, paths::ROUTES, StatusCode::OK, json!({"message": "updated", "data": null}));
        let client = client(Arc::clone(&transport));

        let svc = Service::new("orders", vec![]);
        client.create_route(&svc).await.unwrap();
        client.update_route(&svc).await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::POST);
        assert_eq!(sent[1].method, Method::PUT);
        assert_eq!(sent[1].body.as_ref().unwrap()["name"], "orders");
    }

    #[tokio::test]
    async fn traces_sends_paging_query_and_normalizes_flags() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            Method::GET,
            paths::TRACES,
            StatusCode::OK,
            json!({"data": {"page": 3, "count": 20, "total": 45, "hasNext": true, "hasPrevious": false, "items": []}}),
        );
        let client = client(Arc::clone(&transport));

        let page = client.traces(3, 20).await.unwrap();
        assert!(!page.has_next);
        assert!(page.has_previous);

        let sent = &transport.requests()[0];
        assert!(sent.query.contains(&("page".to_string(), "3".to_string())));
        assert!(sent.query.contains(&("count".to_string(), "20".to_string())));
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail(Method::GET, paths::HOME, "connection refused");
        let client = client(transport);

        let err = client.dashboard_home().await.unwrap_err();
        assert!(matches!(err, KateError::Transport(_)));
        assert_eq!(client.session().token().as_deref(), Some("tok-1"));
    }
}
