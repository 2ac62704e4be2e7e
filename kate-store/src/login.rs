use kate_client::GatewayClient;
use kate_core::error::KateError;
use kate_core::state::{StateCell, Subscription};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginState {
    pub is_loading: bool,
    pub is_authenticated: bool,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct LoginRepository {
    client: GatewayClient,
    state: Arc<StateCell<LoginState>>,
}

impl LoginRepository {
    pub fn new(client: GatewayClient) -> Self {
        let state = LoginState {
            is_authenticated: client.session().is_authenticated(),
            ..LoginState::default()
        };
        Self {
            client,
            state: Arc::new(StateCell::new(state)),
        }
    }

    pub fn state(&self) -> Arc<LoginState> {
        self.state.snapshot()
    }

    pub fn cell(&self) -> &Arc<StateCell<LoginState>> {
        &self.state
    }

    pub fn subscribe(&self, listener: impl Fn(&LoginState) + Send + Sync + 'static) -> Subscription {
        self.state.subscribe(listener)
    }

    /// Exchange credentials for a token and store it in the session.
    pub async fn login(&self, email: &str, password: &str) {
        if email.trim().is_empty() || password.is_empty() {
            self.fail(KateError::Validation("Email and password are required".into()));
            return;
        }
        self.state.update(|s| LoginState {
            is_loading: true,
            ..s.clone()
        });
        match self.client.login(email, password).await {
            Ok(token) => {
                self.client.session().save_token(token.token);
                info!("logged in");
                debug!(email, "session token stored");
                self.state.emit(LoginState {
                    is_loading: false,
                    is_authenticated: true,
                    error: None,
                });
            }
            Err(e) => self.fail(e),
        }
    }

    pub fn logout(&self) {
        self.client.session().clear();
        info!("logged out");
        self.state.emit(LoginState::default());
    }

    fn fail(&self, e: KateError) {
        error!(error = ?e, "login failed");
        self.state.update(|s| LoginState {
            is_loading: false,
            error: Some(e.to_string()),
            ..s.clone()
        });
    }
}
