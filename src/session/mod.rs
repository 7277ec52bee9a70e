//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Upgraded WebSocket
//!     → state.rs (Session: id, client address, authorization, outbound queue)
//!     → registry.rs (lookup, broadcast)
//!     → handler.rs (application callbacks)
//!     → heartbeat.rs (idle detection, server pings)
//! ```
//!
//! # Design Decisions
//! - One task per session owns the socket; everyone else queues messages
//! - The outbound queue is bounded; a session that falls behind is closed
//! - Authorization is a flag the application sets; the server only enforces the deadline

pub mod handler;
pub mod heartbeat;
pub mod registry;
pub mod state;

pub use handler::{EchoHandler, SessionHandler};
pub use heartbeat::Heartbeat;
pub use registry::SessionRegistry;
pub use state::{CloseReason, Session, SessionError, SessionId, OUTBOUND_QUEUE_CAPACITY};
