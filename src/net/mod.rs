//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! server.addr
//!     → parse_listen_addr (":port" shorthand → all interfaces)
//!     → plain TcpListener, or
//!     → tls.rs (PEM check, rustls acceptor via axum-server)
//!     → Hand off to HTTP layer
//! ```

pub mod tls;

use std::net::{AddrParseError, SocketAddr};

pub use tls::{load_tls_config, TlsError};

/// Parse a listen address. `":3553"` means every IPv4 interface on port 3553.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr, AddrParseError> {
    let addr = addr.trim();
    match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port).parse(),
        None => addr.parse(),
    }
}
