//! Client-side state for the Kate admin client.
//!
//! Each repository owns one [`StateCell`](kate_core::StateCell) and
//! talks to the gateway through a shared [`GatewayClient`](kate_client::GatewayClient).
//! Operations never return gateway errors to the caller; they store the
//! message in the repository's state and log it.

pub mod dashboard;
pub mod edit;
pub mod login;
pub mod policy;
pub mod routes;
pub mod scope;
pub mod traces;

pub use dashboard::{DashboardRepository, HomeState};
pub use edit::{EditBuffer, EditState, RouteEditSession};
pub use login::{LoginRepository, LoginState};
pub use policy::{find_first_jwt_policy, find_first_rate_limit_policy, service_for_route};
pub use routes::{RouteEdit, RouteRepository, RouteState, WriteOutcome};
pub use scope::ViewScope;
pub use traces::{PageCursor, StatusFilter, TraceFilter, TraceRepository, TraceState};
