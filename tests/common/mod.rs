//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message as ServerMessage;
use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use ws_gateway::config::GatewayConfig;
use ws_gateway::http::HttpServer;
use ws_gateway::lifecycle::Shutdown;
use ws_gateway::session::{SessionHandler, SessionRegistry};
use ws_gateway::Session;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    #[allow(dead_code)]
    pub sessions: SessionRegistry,
}

/// Sends the session's client address on open, then echoes without authorizing.
pub struct ClientIpReporter;

impl SessionHandler for ClientIpReporter {
    fn on_open(&self, session: &Arc<Session>) {
        let _ = session.send_text(session.client_ip());
    }

    fn on_message(&self, session: &Arc<Session>, message: ServerMessage) {
        let _ = session.send(message);
    }
}

/// Config bound to loopback with heartbeats off so tests control timing.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.server.addr = "127.0.0.1:0".to_string();
    config.server.heartbeat_interval_secs = 0;
    config
}

/// Start a server on an ephemeral port.
pub async fn start_server(config: GatewayConfig) -> TestServer {
    start_server_with(config, Arc::new(ClientIpReporter)).await
}

/// Start a server on an ephemeral port with a custom session handler.
#[allow(dead_code)]
pub async fn start_server_with(
    config: GatewayConfig,
    handler: Arc<dyn SessionHandler>,
) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(config, handler);
    let sessions = server.sessions();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer {
        addr,
        shutdown,
        sessions,
    }
}

/// Build an upgrade request for `path` carrying `headers`.
pub fn ws_request(addr: SocketAddr, path: &str, headers: &[(&'static str, &str)]) -> Request {
    let mut request = format!("ws://{}{}", addr, path).into_client_request().unwrap();
    for (name, value) in headers {
        request.headers_mut().insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    request
}

pub async fn connect(addr: SocketAddr, headers: &[(&'static str, &str)]) -> Client {
    let (client, _) = tokio_tungstenite::connect_async(ws_request(addr, "/", headers))
        .await
        .expect("upgrade failed");
    client
}

/// Next message within five seconds, including control frames.
pub async fn next_message(client: &mut Client) -> Option<Message> {
    tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("timed out waiting for a message")
        .map(|res| res.expect("websocket error"))
}

/// Next text message, skipping control frames.
pub async fn next_text(client: &mut Client) -> String {
    loop {
        match next_message(client).await {
            Some(Message::Text(text)) => return text.as_str().to_string(),
            Some(Message::Ping(_)) | Some(Message::Pong(_)) => continue,
            other => panic!("expected text message, got {:?}", other),
        }
    }
}
