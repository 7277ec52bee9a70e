//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the WebSocket endpoint
//! - Wire up middleware (tracing, request ID, handshake timeout, client address)
//! - Serve plain TCP or TLS
//! - Propagate shutdown to every open session

use std::net::{AddrParseError, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::origin::OriginCheck;
use crate::http::websocket::ws_handler;
use crate::lifecycle::Shutdown;
use crate::net::{load_tls_config, parse_listen_addr, TlsError};
use crate::realip::{client_ip_middleware, RealIpSettings};
use crate::session::{Heartbeat, SessionHandler, SessionRegistry};

/// Time TLS connections get to finish after shutdown is signalled.
const TLS_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRegistry,
    pub handler: Arc<dyn SessionHandler>,
    pub origin: OriginCheck,
    pub connection_limit: Arc<Semaphore>,
    pub heartbeat: Heartbeat,
    pub authorize_timeout: Duration,
    pub shutdown: Shutdown,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid listen address {addr:?}: {source}")]
    InvalidAddr {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// WebSocket server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a server checking origins against `server.origins`.
    pub fn new(config: GatewayConfig, handler: Arc<dyn SessionHandler>) -> Self {
        let origin = OriginCheck::from_origins(&config.server.origins);
        Self::with_origin_check(config, handler, origin)
    }

    /// Create a server with a caller supplied origin check.
    pub fn with_origin_check(
        config: GatewayConfig,
        handler: Arc<dyn SessionHandler>,
        origin: OriginCheck,
    ) -> Self {
        let server = &config.server;
        let state = AppState {
            sessions: SessionRegistry::new(),
            handler,
            origin,
            connection_limit: Arc::new(Semaphore::new(server.max_conn_num)),
            heartbeat: Heartbeat::new(server.heartbeat_interval(), server.heartbeat_mechanism),
            authorize_timeout: server.authorize_timeout(),
            shutdown: Shutdown::new(),
        };

        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let real_ip = RealIpSettings::from(&config.server.real_ip);

        let router = Router::new()
            .route(&config.server.path, get(ws_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(real_ip, client_ip_middleware));

        Self::apply_layers(router, config)
    }

    /// Handshake timeout (skipped when zero), then request id and tracing outermost.
    #[allow(deprecated)]
    fn apply_layers(router: Router, config: &GatewayConfig) -> Router {
        let handshake_timeout = config.server.handshake_timeout();
        let router = if handshake_timeout.is_zero() {
            router
        } else {
            router.layer(TimeoutLayer::new(handshake_timeout))
        };

        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// Bind according to the config (plain or TLS) and serve until `shutdown` fires.
    pub async fn serve(self, shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = parse_listen_addr(&self.config.server.addr).map_err(|source| {
            ServerError::InvalidAddr {
                addr: self.config.server.addr.clone(),
                source,
            }
        })?;

        match self.config.server.tls.clone() {
            Some(tls) => {
                let rustls =
                    load_tls_config(Path::new(&tls.cert_file), Path::new(&tls.key_file)).await?;
                self.run_tls(addr, rustls, shutdown).await?;
            }
            None => {
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|source| ServerError::Bind { addr, source })?;
                self.run(listener, shutdown).await?;
            }
        }
        Ok(())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            path = %self.config.server.path,
            "WebSocket server starting"
        );

        let sessions_shutdown = self.state.shutdown.clone();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
                sessions_shutdown.trigger();
            })
            .await?;

        tracing::info!("WebSocket server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(
            address = %addr,
            path = %self.config.server.path,
            "WebSocket server starting (TLS)"
        );

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        let sessions_shutdown = self.state.shutdown.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            sessions_shutdown.trigger();
            shutdown_handle.graceful_shutdown(Some(TLS_GRACE_PERIOD));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("WebSocket server stopped");
        Ok(())
    }

    /// Registry of open sessions, shared with the running server.
    pub fn sessions(&self) -> SessionRegistry {
        self.state.sessions.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
