//! Real client address resolution.
//!
//! # Data Flow
//! ```text
//! Incoming upgrade request
//!     → middleware.rs (gated by server.real_ip.enabled)
//!     → resolver.rs (X-Forwarded-For → X-Real-IP → peer address)
//!     → ClientIp extension
//!     → session attribution (logs, access decisions)
//! ```
//!
//! # Design Decisions
//! - Forwarding headers are not checked against a trusted proxy list
//! - Malformed candidates are skipped, never surfaced as errors
//! - Pure and synchronous: no I/O, no shared state

pub mod middleware;
pub mod mode;
pub mod resolver;

pub use middleware::{client_ip_middleware, ClientIp, RealIpSettings};
pub use mode::{RealIpMode, UnknownModeError};
pub use resolver::{
    parse_ip_token, resolve_client_ip, resolve_real_ip, scan_forwarded_for, PeerRequest,
    RealIpSource, X_FORWARDED_FOR, X_REAL_IP,
};
