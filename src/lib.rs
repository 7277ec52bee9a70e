//! WebSocket gateway with real client address resolution.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod realip;
pub mod session;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use realip::{resolve_real_ip, RealIpMode};
pub use session::{Session, SessionHandler};
