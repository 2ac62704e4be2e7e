pub mod client;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::GatewayClient;
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
