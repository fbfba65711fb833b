//! WebSocket Game Server
//!
//! One axum router serves the realtime endpoint (`/ws`) and the session
//! HTTP routes. Every realtime connection runs two tasks: a reader that
//! decodes envelopes and applies intents, and a writer that drains the
//! connection's outbound queue.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Router};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, timeout, Instant as TokioInstant};
use tracing::{debug, info, instrument, warn};

use crate::game::player::PlayerId;
use crate::network::http;
use crate::network::hub::{ConnectionId, HubHandle};
use crate::network::protocol::{split_frame, ClientMessage, ServerMessage};
use crate::TICK_INTERVAL;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent realtime connections.
    pub max_connections: usize,
    /// Per-connection outbound queue length.
    pub outbound_queue_capacity: usize,
    /// A connection that sends nothing (not even a pong) for this long is dead.
    pub read_timeout: Duration,
    /// Deadline for a single frame write.
    pub write_timeout: Duration,
    /// Largest inbound message accepted, in bytes.
    pub max_message_size: usize,
    /// Simulation tick period.
    pub tick_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 64,
            outbound_queue_capacity: 256,
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            max_message_size: 512,
            tick_interval: TICK_INTERVAL,
        }
    }
}

impl ServerConfig {
    /// Load overrides from `BOMBERMAN_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load overrides from an arbitrary key lookup. Unparsable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = parse_var(&lookup, "BOMBERMAN_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(max) = parse_var(&lookup, "BOMBERMAN_MAX_CONNECTIONS") {
            config.max_connections = max;
        }
        if let Some(capacity) = parse_var::<usize>(&lookup, "BOMBERMAN_OUTBOUND_QUEUE") {
            config.outbound_queue_capacity = capacity.max(1);
        }

        config
    }

    /// Keepalive ping period, 9/10 of the read timeout.
    pub fn ping_interval(&self) -> Duration {
        self.read_timeout * 9 / 10
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Cause
        #[source]
        source: std::io::Error,
    },

    /// Serving failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// SERVER
// =============================================================================

/// Holds one realtime slot until the connection task ends.
struct ActiveConnection(Arc<AtomicUsize>);

impl ActiveConnection {
    /// Take a slot if fewer than `max` are in use.
    fn acquire(counter: Arc<AtomicUsize>, max: usize) -> Option<Self> {
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| Self(counter))
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Shared by every route handler.
#[derive(Clone)]
pub struct AppState {
    hub: HubHandle,
    config: Arc<ServerConfig>,
    active: Arc<AtomicUsize>,
    shutdown: broadcast::Sender<()>,
}

impl FromRef<AppState> for HubHandle {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}

/// The game server.
pub struct GameServer {
    state: AppState,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig, hub: HubHandle) -> Self {
        let (shutdown, _) = broadcast::channel(1);

        Self {
            state: AppState {
                hub,
                config: Arc::new(config),
                active: Arc::new(AtomicUsize::new(0)),
                shutdown,
            },
        }
    }

    /// A receiver that fires when [`GameServer::shutdown`] is called.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.state.shutdown.subscribe()
    }

    /// Realtime endpoint plus the session HTTP routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(upgrade))
            .route("/join", post(http::join))
            .route("/status", get(http::status))
            .layer(middleware::from_fn(http::cors))
            .with_state(self.state.clone())
    }

    /// Bind and serve until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), ServerError> {
        let addr = self.state.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        info!("Game server listening on {}", addr);
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown = self.state.shutdown.subscribe();

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.state.shutdown.send(());
    }

    /// Get active realtime connection count.
    pub fn connection_count(&self) -> usize {
        self.state.active.load(Ordering::Acquire)
    }
}

/// `GET /ws`: upgrade unless every realtime slot is taken.
async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let Some(slot) = ActiveConnection::acquire(state.active.clone(), state.config.max_connections) else {
        warn!("Connection limit reached, refusing upgrade");
        return http::error(StatusCode::SERVICE_UNAVAILABLE, "server is full").into_response();
    };

    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            let _slot = slot;
            serve_websocket(socket, state).await;
        })
}

// =============================================================================
// REALTIME CONNECTIONS
// =============================================================================

/// What a connection knows about its peer.
#[derive(Debug, Default)]
struct ConnectionState {
    id: ConnectionId,
    player_id: Option<PlayerId>,
    nickname: String,
}

async fn serve_websocket(socket: WebSocket, state: AppState) {
    let AppState { hub, config, shutdown, .. } = state;
    let mut shutdown = shutdown.subscribe();

    let (ws_sender, mut ws_receiver) = socket.split();
    let (out_tx, out_rx) = mpsc::channel::<String>(config.outbound_queue_capacity);

    let mut conn = ConnectionState {
        id: hub.next_connection_id(),
        ..Default::default()
    };
    if !hub.register(conn.id, out_tx).await {
        warn!("Hub stopped, refusing connection {}", conn.id);
        return;
    }
    info!("Connection {} established", conn.id);

    let mut writer = tokio::spawn(write_loop(
        ws_sender,
        out_rx,
        config.ping_interval(),
        config.write_timeout,
    ));

    loop {
        tokio::select! {
            frame = timeout(config.read_timeout, ws_receiver.next()) => {
                match frame {
                    Err(_) => {
                        info!("Connection {} missed the read deadline", conn.id);
                        break;
                    }
                    Ok(Some(Ok(Message::Text(text)))) => {
                        for line in split_frame(&text) {
                            dispatch(line, &mut conn, &hub).await;
                        }
                    }
                    Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
                        debug!("Connection {} closed by peer", conn.id);
                        break;
                    }
                    Ok(Some(Ok(_))) => {
                        // Pong, ping or binary: only refreshes the deadline
                    }
                    Ok(Some(Err(e))) => {
                        debug!("Connection {} read error: {}", conn.id, e);
                        break;
                    }
                }
            }
            _ = &mut writer => {
                debug!("Connection {} writer stopped", conn.id);
                break;
            }
            _ = shutdown.recv() => {
                break;
            }
        }
    }

    writer.abort();
    hub.unregister(conn.id).await;
    info!("Connection {} cleaned up", conn.id);
}

/// Drain the outbound queue into the socket and keep the peer alive.
///
/// Everything already queued goes out as one newline-joined text frame.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    ping_interval: Duration,
    write_timeout: Duration,
) {
    let mut ping = interval_at(TokioInstant::now() + ping_interval, ping_interval);

    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(mut batch) = message else {
                    // Hub dropped this connection
                    let _ = timeout(write_timeout, sink.send(Message::Close(None))).await;
                    break;
                };
                while let Ok(next) = outbound.try_recv() {
                    batch.push('\n');
                    batch.push_str(&next);
                }
                if !matches!(timeout(write_timeout, sink.send(Message::Text(batch))).await, Ok(Ok(()))) {
                    break;
                }
            }
            _ = ping.tick() => {
                if !matches!(timeout(write_timeout, sink.send(Message::Ping(Vec::new()))).await, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
}

/// Decode one envelope and apply it.
async fn dispatch(line: &str, conn: &mut ConnectionState, hub: &HubHandle) {
    let message = match ClientMessage::from_json(line) {
        Ok(m) => m,
        Err(e) => {
            debug!("Discarding envelope from connection {}: {}", conn.id, e);
            return;
        }
    };

    match message {
        ClientMessage::Join { player_id, nickname } => {
            // Ack or refusal is sent by the hub
            if let Some(Ok(_)) = hub.join(conn.id, player_id.clone(), nickname.clone()).await {
                conn.player_id = Some(player_id);
                conn.nickname = nickname;
            }
        }
        ClientMessage::Chat { player_id, message } => handle_chat(player_id, message, conn, hub).await,
        ClientMessage::Action { player_id, action } => {
            let now = hub.clock().now();
            let result = {
                let mut game = hub.game().write().await;
                match action.direction() {
                    Some(direction) => game.move_player(&player_id, direction).map(|_| ()),
                    None => game.place_bomb(&player_id, now).map(|_| ()),
                }
            };
            if let Err(e) = result {
                debug!("Action {:?} from {} refused: {}", action, player_id, e);
            }
        }
        ClientMessage::RestartGame { player_id } => {
            let now = hub.clock().now();
            if hub.game().write().await.request_reset(now) {
                info!("Reset requested by {}", player_id);
            }
        }
    }
}

async fn handle_chat(envelope_id: PlayerId, message: String, conn: &ConnectionState, hub: &HubHandle) {
    let player_id = conn.player_id.clone().unwrap_or(envelope_id);

    let (player_name, player_number) = {
        let game = hub.game().read().await;
        game.player(&player_id)
            .map(|p| (p.nickname.clone(), p.slot))
            .unwrap_or_else(|| (conn.nickname.clone(), 0))
    };

    hub.broadcast(ServerMessage::Chat {
        player_id,
        player_name,
        player_number,
        message,
        timestamp: hub.clock().wall_now(),
    })
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::RwLock;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use crate::core::clock::ManualClock;
    use crate::core::rng::ScriptedRng;
    use crate::game::state::Game;
    use crate::network::hub::Hub;

    struct Harness {
        handle: HubHandle,
        shutdown: broadcast::Sender<()>,
        outbound: mpsc::Receiver<String>,
        conn: ConnectionState,
    }

    /// Hub with a slow tick and one fake connection.
    async fn harness() -> Harness {
        let game = Arc::new(RwLock::new(Game::with_rng(Box::new(ScriptedRng::never()))));
        let clock = Arc::new(ManualClock::new());
        let (hub, handle) = Hub::new(game, clock, Duration::from_secs(3600));
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(hub.run(shutdown_rx));

        let (tx, outbound) = mpsc::channel(64);
        let conn = ConnectionState { id: handle.next_connection_id(), ..Default::default() };
        assert!(handle.register(conn.id, tx).await);

        Harness { handle, shutdown, outbound, conn }
    }

    /// Next message of the given type, skipping snapshots and counts.
    async fn next_of(rx: &mut mpsc::Receiver<String>, kind: &str) -> Value {
        loop {
            let text = rx.recv().await.unwrap();
            for line in text.lines() {
                let value: Value = serde_json::from_str(line).unwrap();
                if value["type"] == kind {
                    return value;
                }
            }
        }
    }

    /// A server on an ephemeral port with its hub running.
    async fn spawn_server(config: ServerConfig) -> (Arc<GameServer>, SocketAddr, tokio::task::JoinHandle<Result<(), ServerError>>) {
        let game = Arc::new(RwLock::new(Game::with_rng(Box::new(ScriptedRng::never()))));
        let (hub, handle) = Hub::new(game, Arc::new(ManualClock::new()), TICK_INTERVAL);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(GameServer::new(config, handle));
        tokio::spawn(hub.run(server.subscribe_shutdown()));
        let serving = {
            let server = server.clone();
            tokio::spawn(async move { server.serve(listener).await })
        };
        (server, addr, serving)
    }

    /// One request on a fresh connection. Returns the raw response.
    async fn exchange(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
            .await
            .unwrap()
            .unwrap();
        response
    }

    fn json_body(response: &str) -> Value {
        let (_, body) = response.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_connections, 64);
        assert_eq!(config.outbound_queue_capacity, 256);
        assert_eq!(config.max_message_size, 512);
        assert_eq!(config.tick_interval, Duration::from_millis(50));
        assert_eq!(config.ping_interval(), Duration::from_secs(54));
    }

    #[test]
    fn test_server_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("BOMBERMAN_BIND_ADDR", "127.0.0.1:9000"),
            ("BOMBERMAN_MAX_CONNECTIONS", "not-a-number"),
            ("BOMBERMAN_OUTBOUND_QUEUE", "0"),
        ]
        .into_iter()
        .collect();

        let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.max_connections, 64);
        assert_eq!(config.outbound_queue_capacity, 1);
    }

    #[test]
    fn test_connection_slots_are_bounded() {
        let counter = Arc::new(AtomicUsize::new(0));
        let first = ActiveConnection::acquire(counter.clone(), 2).unwrap();
        let _second = ActiveConnection::acquire(counter.clone(), 2).unwrap();
        assert!(ActiveConnection::acquire(counter.clone(), 2).is_none());

        drop(first);
        assert_eq!(counter.load(Ordering::Acquire), 1);
        assert!(ActiveConnection::acquire(counter, 2).is_some());
    }

    #[tokio::test]
    async fn test_join_acks_and_announces() {
        let mut h = harness().await;
        let line = r#"{"type":"join","playerId":"p1","payload":{"nickname":"alice"}}"#;
        dispatch(line, &mut h.conn, &h.handle).await;

        let ack = next_of(&mut h.outbound, "join_ack").await;
        assert_eq!(ack["playerId"], "p1");
        assert_eq!(ack["nickname"], "alice");

        let joined = next_of(&mut h.outbound, "player_joined_lobby").await;
        assert_eq!(joined["playerName"], "alice");
        assert_eq!(joined["playerNumber"], 1);

        assert_eq!(h.conn.player_id, Some(PlayerId::from("p1")));
        let _ = h.shutdown.send(());
    }

    #[tokio::test]
    async fn test_join_error_keeps_connection() {
        let mut h = harness().await;
        {
            let now = h.handle.clock().now();
            let mut game = h.handle.game().write().await;
            for id in ["a", "b", "c", "d"] {
                game.join(PlayerId::from(id), id.into(), now).unwrap();
            }
        }

        let line = r#"{"type":"join","playerId":"p5","payload":{"nickname":"eve"}}"#;
        dispatch(line, &mut h.conn, &h.handle).await;

        let err = next_of(&mut h.outbound, "join_error").await;
        assert_eq!(err["error"], "lobby is full");
        assert_eq!(err["playerId"], "p5");
        assert!(h.conn.player_id.is_none());

        // Still registered: a broadcast reaches it
        dispatch(r#"{"type":"chat","playerId":"","payload":{"message":"hi"}}"#, &mut h.conn, &h.handle).await;
        let chat = next_of(&mut h.outbound, "chat").await;
        assert_eq!(chat["playerNumber"], 0);
        let _ = h.shutdown.send(());
    }

    #[tokio::test]
    async fn test_chat_uses_seated_name() {
        let mut h = harness().await;
        dispatch(r#"{"type":"join","playerId":"p1","payload":{"nickname":"alice"}}"#, &mut h.conn, &h.handle).await;
        dispatch(r#"{"type":"chat","playerId":"p1","payload":{"message":"gg"}}"#, &mut h.conn, &h.handle).await;

        let chat = next_of(&mut h.outbound, "chat").await;
        assert_eq!(chat["playerId"], "p1");
        assert_eq!(chat["playerName"], "alice");
        assert_eq!(chat["playerNumber"], 1);
        assert_eq!(chat["message"], "gg");
        let _ = h.shutdown.send(());
    }

    #[tokio::test]
    async fn test_actions_and_restart() {
        let mut h = harness().await;
        dispatch(r#"{"type":"join","playerId":"p1","payload":{"nickname":"a"}}"#, &mut h.conn, &h.handle).await;

        dispatch(r#"{"type":"action","playerId":"p1","payload":{"playerId":"p1","action":"move_right"}}"#, &mut h.conn, &h.handle).await;
        dispatch(r#"{"type":"action","playerId":"p1","payload":{"action":"place_bomb"}}"#, &mut h.conn, &h.handle).await;
        // Malformed and unknown actions are dropped without effect
        dispatch("{oops", &mut h.conn, &h.handle).await;
        dispatch(r#"{"type":"action","playerId":"p1","payload":{"action":"fly"}}"#, &mut h.conn, &h.handle).await;

        {
            let game = h.handle.game().read().await;
            let player = game.player(&PlayerId::from("p1")).unwrap();
            assert_eq!(player.position, crate::Position::new(2, 2));
            assert_eq!(player.active_bombs, 1);
            assert!(game.reset_deadline().is_none());
        }

        dispatch(r#"{"type":"restart_game","playerId":"p1"}"#, &mut h.conn, &h.handle).await;
        assert!(h.handle.game().read().await.reset_deadline().is_some());
        let _ = h.shutdown.send(());
    }

    #[tokio::test]
    async fn test_http_routes() {
        let (server, addr, serving) = spawn_server(ServerConfig::default()).await;

        // Chunked body
        let response = exchange(
            addr,
            "POST /join HTTP/1.1\r\nHost: test\r\nContent-Type: application/json\r\n\
             Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n\
             14\r\n{\"nickname\":\"alice\"}\r\n0\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{}", response);
        assert!(response.to_ascii_lowercase().contains("access-control-allow-origin: *"));
        let body = json_body(&response);
        assert_eq!(body["status"], "joined");
        assert!(body["playerId"].as_str().is_some_and(|id| !id.is_empty()));

        let response = exchange(
            addr,
            "POST /join HTTP/1.1\r\nHost: test\r\nContent-Type: application/json\r\n\
             Content-Length: 9\r\nConnection: close\r\n\r\n{nickname",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 400 Bad Request"), "{}", response);
        assert_eq!(json_body(&response)["error"], "invalid JSON payload");

        let response = exchange(addr, "GET /status HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        let body = json_body(&response);
        assert_eq!(body["state"], 0);
        assert_eq!(body["playerCount"], 1);

        let response = exchange(addr, "GET /join HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 405"), "{}", response);

        server.shutdown();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_preflight_has_no_body() {
        let (server, addr, serving) = spawn_server(ServerConfig::default()).await;

        let response = exchange(
            addr,
            "OPTIONS /join HTTP/1.1\r\nHost: test\r\nOrigin: http://client\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 204 No Content"), "{}", response);
        let lower = response.to_ascii_lowercase();
        assert!(lower.contains("access-control-allow-methods: get, post, options"));
        assert!(!lower.contains("content-length"));
        assert!(response.ends_with("\r\n\r\n"));

        server.shutdown();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_websocket_end_to_end() {
        let (server, addr, serving) = spawn_server(ServerConfig::default()).await;

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr)).await.unwrap();
        ws.send(WsMessage::Text(
            r#"{"type":"join","playerId":"p1","payload":{"nickname":"alice"}}"#.to_string(),
        ))
        .await
        .unwrap();

        let mut acked = false;
        let mut saw_state = false;
        while !(acked && saw_state) {
            let frame = timeout(Duration::from_secs(5), ws.next()).await.unwrap().unwrap().unwrap();
            if let WsMessage::Text(text) = frame {
                for line in text.lines() {
                    let value: Value = serde_json::from_str(line).unwrap();
                    match value["type"].as_str() {
                        Some("join_ack") => acked = true,
                        Some("gameState") if acked => {
                            saw_state = value["state"]["players"][0]["id"] == "p1";
                        }
                        _ => {}
                    }
                }
            }
        }
        assert_eq!(server.connection_count(), 1);

        let response = exchange(addr, "GET /status HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
        assert_eq!(json_body(&response)["playerCount"], 1);

        server.shutdown();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_upgrade_refused_when_full() {
        let config = ServerConfig { max_connections: 0, ..Default::default() };
        let (server, addr, serving) = spawn_server(config).await;

        assert!(tokio_tungstenite::connect_async(format!("ws://{}/ws", addr)).await.is_err());
        assert_eq!(server.connection_count(), 0);

        server.shutdown();
        serving.await.unwrap().unwrap();
    }
}
