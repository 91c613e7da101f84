//! WebSocket Game Server
//!
//! Accept loop and per-connection plumbing: one lightweight task per
//! socket, an mpsc-fed sender task per socket, and a presence map that
//! drives the online-count broadcast. All protocol decisions live in
//! [`crate::network::connection`].

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::network::accounts::AccountStore;
use crate::network::connection::ConnectionSession;
use crate::network::protocol::{ClientEnvelope, ServerMessage, StatusEvent};
use crate::network::registry::GameRegistry;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 3000).into(),
            max_connections: 256,
        }
    }
}

impl ServerConfig {
    /// Read the configuration from the environment, falling back to
    /// defaults: `SENET_ADDR` for the bind address and
    /// `SENET_MAX_CONNECTIONS` for the connection cap.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("SENET_ADDR") {
            match addr.parse() {
                Ok(parsed) => config.bind_addr = parsed,
                Err(err) => warn!(%addr, %err, "ignoring invalid SENET_ADDR"),
            }
        }
        if let Ok(max) = std::env::var("SENET_MAX_CONNECTIONS") {
            match max.parse() {
                Ok(parsed) => config.max_connections = parsed,
                Err(err) => warn!(%max, %err, "ignoring invalid SENET_MAX_CONNECTIONS"),
            }
        }
        config
    }
}

/// Server-level failures.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to the configured address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Presence map: connection id to its outbound channel.
type Presence = Arc<RwLock<BTreeMap<Uuid, mpsc::Sender<ServerMessage>>>>;

/// The Senet server.
pub struct GameServer {
    config: ServerConfig,
    accounts: Arc<AccountStore>,
    registry: Arc<GameRegistry>,
    clients: Presence,
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a server with fresh account and game stores.
    pub fn new(config: ServerConfig) -> Self {
        let accounts = Arc::new(AccountStore::new());
        let registry = Arc::new(GameRegistry::new(Arc::clone(&accounts)));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            accounts,
            registry,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Run the accept loop until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Senet server listening on {}", self.config.bind_addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.clients.read().await.len() >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }
                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(err) => {
                            error!("Accept error: {}", err);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Spawn the per-connection task.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let accounts = Arc::clone(&self.accounts);
        let registry = Arc::clone(&self.registry);
        let clients = Arc::clone(&self.clients);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(err) => {
                    error!("WebSocket handshake failed for {}: {}", addr, err);
                    return;
                }
            };

            let conn_id = Uuid::new_v4();
            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            // Sender task: everything outbound funnels through here.
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(err) => {
                            error!("Failed to serialize message: {}", err);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            clients.write().await.insert(conn_id, msg_tx.clone());
            broadcast_online_count(&clients).await;

            // Greet the socket with its blank slate.
            let _ = msg_tx
                .send(ServerMessage::Status(StatusEvent::Unknown))
                .await;

            let mut connection =
                ConnectionSession::new(conn_id, accounts, registry, msg_tx.clone());

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match ClientEnvelope::from_json(&text) {
                                    Ok(envelope) => connection.handle(envelope).await,
                                    Err(err) => {
                                        debug!("Malformed message from {}: {}", addr, err);
                                        let _ = msg_tx.send(ServerMessage::FatalError {
                                            title: "Protocol Error".to_string(),
                                            message: "Malformed message".to_string(),
                                        }).await;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(err)) => {
                                warn!("WebSocket error for {}: {}", addr, err);
                                break;
                            }
                            // Pings are answered by the protocol layer;
                            // binary frames have no meaning here.
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Message {
                            text: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            connection.disconnect().await;
            clients.write().await.remove(&conn_id);
            broadcast_online_count(&clients).await;
            sender_task.abort();

            info!("Client {} cleaned up", addr);
        });
    }

    /// Signal every task to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Open connections right now.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Live games right now.
    pub async fn game_count(&self) -> usize {
        self.registry.count().await
    }
}

/// Tell every open connection how many sockets are online.
async fn broadcast_online_count(clients: &Presence) {
    let clients = clients.read().await;
    let count = clients.len();
    for sender in clients.values() {
        let _ = sender.send(ServerMessage::OnlineCount { count }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.max_connections, 256);
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = GameServer::new(ServerConfig::default());
        assert_eq!(server.connection_count().await, 0);
        assert_eq!(server.game_count().await, 0);
    }

    #[tokio::test]
    async fn test_server_shutdown_signal() {
        let server = GameServer::new(ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        });
        // No subscriber yet; the signal is simply dropped.
        server.shutdown();
    }

    #[tokio::test]
    async fn test_online_count_reaches_every_connection() {
        let clients: Presence = Arc::new(RwLock::new(BTreeMap::new()));
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        clients.write().await.insert(Uuid::new_v4(), tx_a);
        clients.write().await.insert(Uuid::new_v4(), tx_b);

        broadcast_online_count(&clients).await;

        for rx in [&mut rx_a, &mut rx_b] {
            assert!(matches!(
                rx.try_recv(),
                Ok(ServerMessage::OnlineCount { count: 2 })
            ));
        }
    }
}
