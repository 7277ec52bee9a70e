//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ws_sessions_active` (gauge): open sessions
//! - `ws_sessions_opened_total` (counter)
//! - `ws_sessions_closed_total` (counter): by close reason
//! - `ws_upgrades_rejected_total` (counter): by rejection reason
//! - `ws_client_ip_unresolved_total` (counter)
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_session_opened() {
    metrics::counter!("ws_sessions_opened_total").increment(1);
    metrics::gauge!("ws_sessions_active").increment(1.0);
}

pub fn record_session_closed(reason: &'static str) {
    metrics::counter!("ws_sessions_closed_total", "reason" => reason).increment(1);
    metrics::gauge!("ws_sessions_active").decrement(1.0);
}

pub fn record_upgrade_rejected(reason: &'static str) {
    metrics::counter!("ws_upgrades_rejected_total", "reason" => reason).increment(1);
}

pub fn record_unresolved_client_ip() {
    metrics::counter!("ws_client_ip_unresolved_total").increment(1);
}
