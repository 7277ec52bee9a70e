//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, handshake timeout)
//!     → realip middleware (ClientIp extension)
//!     → origin.rs (cross-origin check)
//!     → websocket.rs (connection limit, upgrade, session loop)
//! ```

pub mod origin;
pub mod server;
pub mod websocket;

pub use origin::{OriginCheck, ANY_ORIGIN};
pub use server::{AppState, HttpServer, ServerError};
