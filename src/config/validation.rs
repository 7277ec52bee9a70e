//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and formats (listen address, path, limits)
//! - Surface suspicious but accepted values as warnings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function of the config
//! - Runs before config is accepted into the system

use crate::config::schema::GatewayConfig;
use crate::net::parse_listen_addr;
use crate::realip::RealIpMode;

/// A config value the gateway cannot run with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("server.addr {0:?} is not a valid listen address")]
    InvalidListenAddr(String),

    #[error("server.path {0:?} must start with '/'")]
    InvalidPath(String),

    #[error("server.max_conn_num must be greater than 0")]
    ZeroMaxConnections,

    #[error("server.tls.{0} must not be empty")]
    EmptyTlsPath(&'static str),

    #[error("observability.metrics_address {0:?} is not a valid socket address")]
    InvalidMetricsAddr(String),
}

/// A config value that is accepted but probably not what the operator meant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationWarning {
    #[error("server.real_ip.mode {0:?} is not \"left\" or \"right\", using \"right\"")]
    UnknownRealIpMode(String),

    #[error("server.origins is empty, every upgrade request will be rejected")]
    NoOriginsAllowed,
}

/// Validate `config`, returning the warnings on success and every error on failure.
pub fn validate_config(
    config: &GatewayConfig,
) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let server = &config.server;

    if parse_listen_addr(&server.addr).is_err() {
        errors.push(ValidationError::InvalidListenAddr(server.addr.clone()));
    }

    if !server.path.starts_with('/') {
        errors.push(ValidationError::InvalidPath(server.path.clone()));
    }

    if server.max_conn_num == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    if let Some(tls) = &server.tls {
        if tls.cert_file.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("cert_file"));
        }
        if tls.key_file.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("key_file"));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddr(
            config.observability.metrics_address.clone(),
        ));
    }

    if let Err(e) = RealIpMode::try_parse(&server.real_ip.mode) {
        warnings.push(ValidationWarning::UnknownRealIpMode(e.0));
    }

    if server.origins.is_empty() {
        warnings.push(ValidationWarning::NoOriginsAllowed);
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(errors)
    }
}
