use kate_client::GatewayClient;
use kate_core::dashboard::DashboardHome;
use kate_core::state::{StateCell, Subscription};
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeState {
    pub is_loading: bool,
    pub data: Option<DashboardHome>,
    pub error: Option<String>,
}

/// Dashboard summary. The whole snapshot is replaced on every load.
#[derive(Clone)]
pub struct DashboardRepository {
    client: GatewayClient,
    state: Arc<StateCell<HomeState>>,
}

impl DashboardRepository {
    pub fn new(client: GatewayClient) -> Self {
        Self {
            client,
            state: Arc::new(StateCell::default()),
        }
    }

    pub fn state(&self) -> Arc<HomeState> {
        self.state.snapshot()
    }

    pub fn cell(&self) -> &Arc<StateCell<HomeState>> {
        &self.state
    }

    pub fn subscribe(&self, listener: impl Fn(&HomeState) + Send + Sync + 'static) -> Subscription {
        self.state.subscribe(listener)
    }

    pub async fn load(&self) {
        self.state.update(|s| HomeState {
            is_loading: true,
            ..s.clone()
        });
        match self.client.dashboard_home().await {
            Ok(home) => {
                debug!(apis = home.total_api_count, volume = home.request_volume, "dashboard loaded");
                self.state.emit(HomeState {
                    is_loading: false,
                    data: Some(home),
                    error: None,
                });
            }
            Err(e) => {
                error!(error = ?e, "dashboard load failed");
                self.state.update(|s| HomeState {
                    is_loading: false,
                    error: Some(e.to_string()),
                    ..s.clone()
                });
            }
        }
    }
}
