//! Attaches the client address to every request.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::mode::RealIpMode;
use super::resolver::{parse_ip_token, resolve_real_ip, RealIpSource};
use crate::config::RealIpConfig;
use crate::observability::metrics;

/// Client address as seen by the gateway. Empty when unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_resolved(&self) -> bool {
        !self.0.is_empty()
    }
}

/// Resolved form of [`RealIpConfig`] handed to the middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RealIpSettings {
    pub enabled: bool,
    pub mode: RealIpMode,
}

impl From<&RealIpConfig> for RealIpSettings {
    fn from(config: &RealIpConfig) -> Self {
        Self {
            enabled: config.enabled,
            mode: config.mode(),
        }
    }
}

impl RealIpSettings {
    /// Client address for `request` under these settings.
    ///
    /// Disabled settings skip the forwarding headers and use the peer address only.
    pub fn client_ip<R: RealIpSource + ?Sized>(&self, request: &R) -> ClientIp {
        if self.enabled {
            ClientIp(resolve_real_ip(Some(request), self.mode))
        } else {
            ClientIp(
                request
                    .remote_addr()
                    .as_deref()
                    .and_then(parse_ip_token)
                    .map(|ip| ip.to_string())
                    .unwrap_or_default(),
            )
        }
    }
}

pub async fn client_ip_middleware(
    State(settings): State<RealIpSettings>,
    mut request: Request,
    next: Next,
) -> Response {
    let client_ip = settings.client_ip(&request);

    if !client_ip.is_resolved() {
        tracing::debug!(
            path = %request.uri().path(),
            real_ip_enabled = settings.enabled,
            "Client address unresolved"
        );
        metrics::record_unresolved_client_ip();
    }

    request.extensions_mut().insert(client_ip);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ConnectInfo;
    use std::net::SocketAddr;

    fn request() -> axum::http::Request<()> {
        let mut req = axum::http::Request::builder()
            .header("X-Forwarded-For", "203.0.113.9")
            .body(())
            .unwrap();
        let addr: SocketAddr = "10.0.0.1:4000".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[test]
    fn disabled_settings_ignore_forwarding_headers() {
        let settings = RealIpSettings {
            enabled: false,
            mode: RealIpMode::Left,
        };
        assert_eq!(settings.client_ip(&request()), ClientIp("10.0.0.1".into()));
    }

    #[test]
    fn enabled_settings_resolve_forwarded_address() {
        let settings = RealIpSettings {
            enabled: true,
            mode: RealIpMode::Right,
        };
        assert_eq!(settings.client_ip(&request()).as_str(), "203.0.113.9");
    }

    #[test]
    fn settings_from_config_coerce_unknown_mode() {
        let config = RealIpConfig {
            enabled: true,
            mode: "sideways".to_string(),
        };
        let settings = RealIpSettings::from(&config);
        assert!(settings.enabled);
        assert_eq!(settings.mode, RealIpMode::Right);
    }
}
