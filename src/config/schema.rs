//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::realip::RealIpMode;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// WebSocket server settings.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// WebSocket server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address. A bare `:port` listens on all interfaces.
    pub addr: String,

    /// Path accepting WebSocket upgrades.
    pub path: String,

    /// Maximum concurrent sessions.
    pub max_conn_num: usize,

    /// Allowed `Origin` values. `*` allows any origin, an empty list allows none.
    pub origins: Vec<String>,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Upper bound on the upgrade handshake, in seconds.
    pub handshake_timeout_secs: u64,

    /// Heartbeat interval in seconds (0 disables heartbeat checks).
    pub heartbeat_interval_secs: u64,

    /// How heartbeats are exchanged.
    pub heartbeat_mechanism: HeartbeatMechanism,

    /// Time a session has to authorize, in seconds (0 disables the check).
    pub authorize_timeout_secs: u64,

    /// Client address resolution behind proxies.
    pub real_ip: RealIpConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: ":3553".to_string(),
            path: "/".to_string(),
            max_conn_num: 5000,
            origins: vec!["*".to_string()],
            tls: None,
            handshake_timeout_secs: 10,
            heartbeat_interval_secs: 10,
            heartbeat_mechanism: HeartbeatMechanism::Resp,
            authorize_timeout_secs: 0,
            real_ip: RealIpConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn authorize_timeout(&self) -> Duration {
        Duration::from_secs(self.authorize_timeout_secs)
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_file: String,

    /// Path to private key file (PEM).
    pub key_file: String,
}

/// Heartbeat exchange strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeartbeatMechanism {
    /// Clients send heartbeats and the server answers them.
    #[default]
    Resp,
    /// The server additionally pings every interval.
    Tick,
}

/// Real client address settings.
///
/// `mode` stays a raw string so validation can warn about typos; it is
/// turned into a [`RealIpMode`] through [`RealIpConfig::mode`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RealIpConfig {
    /// Resolve the client address from forwarding headers.
    pub enabled: bool,

    /// `left` or `right`. Anything else is treated as `right`.
    pub mode: String,
}

impl Default for RealIpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: RealIpMode::Right.to_string(),
        }
    }
}

impl RealIpConfig {
    pub fn mode(&self) -> RealIpMode {
        RealIpMode::parse(&self.mode)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
