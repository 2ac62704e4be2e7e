pub mod config;
pub mod dashboard;
pub mod envelope;
pub mod error;
pub mod policy;
pub mod route;
pub mod service;
pub mod state;
pub mod trace;

pub use config::ClientConfig;
pub use dashboard::DashboardHome;
pub use envelope::{Envelope, Token};
pub use error::KateError;
pub use policy::{AuthenticationPolicy, JwtPolicy, RateLimitPolicy};
pub use route::{KateRoutes, Route, transform_path};
pub use service::Service;
pub use state::{StateCell, Subscription};
pub use trace::{PagedResult, Trace, pretty_body};
